//! ESRI Shapefile codec
//!
//! A shapefile is a `.shp` geometry file with `.shx` index, `.dbf` attribute
//! table and optional `.prj` CRS sidecars. Every file holds one geometry
//! family; field names are limited to ten characters.

use chrono::{Datelike, NaiveDate};
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, Polygon};
use geoconvert_core::models::{CrsIdentifier, FieldType, FieldValue};
use geoconvert_core::{GeoconvertError, Result};
use shapefile::dbase::{self, FieldName, FieldValue as DbaseValue, Record, TableWriterBuilder};
use shapefile::{Multipoint, PolygonRing, Polyline, Shape, ShapeReader, ShapeWriter};
use std::collections::HashSet;
use std::io::Cursor;

use super::{widen, CreationOptions, EncodedFile, VectorCodec};
use crate::model::{FieldDefn, MemoryFeature, MemoryLayer};

const DRIVER: &str = "ESRI Shapefile";

const MAX_FIELD_NAME: usize = 10;

const MAX_CHARACTER_WIDTH: usize = 254;

/// `.prj` text written for WGS84 layers
const WGS84_PRJ: &str = concat!(
    r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],"#,
    r#"PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#
);

/// ESRI Shapefile codec
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapefileCodec;

impl VectorCodec for ShapefileCodec {
    fn driver(&self) -> &str {
        DRIVER
    }

    fn extensions(&self) -> &[&str] {
        &["shp"]
    }

    fn sidecar_extensions(&self) -> &[&str] {
        &["shx", "dbf", "prj"]
    }

    fn decode(&self, name: &str, bytes: &[u8]) -> Result<Vec<MemoryLayer>> {
        self.decode_with_sidecars(name, bytes, &[])
    }

    fn decode_with_sidecars(
        &self,
        name: &str,
        bytes: &[u8],
        sidecars: &[EncodedFile],
    ) -> Result<Vec<MemoryLayer>> {
        let open_failure = |reason: String| GeoconvertError::OpenFailure {
            path: name.to_string(),
            reason,
        };
        let sidecar = |extension: &str| {
            sidecars.iter().find(|f| f.extension.eq_ignore_ascii_case(extension))
        };

        let dbf = sidecar("dbf")
            .ok_or_else(|| open_failure("missing required component .dbf".to_string()))?;

        let shape_reader = ShapeReader::new(Cursor::new(bytes))
            .map_err(|e| open_failure(format!("Failed to read .shp: {}", e)))?;
        let table_reader = dbase::Reader::new(Cursor::new(dbf.bytes.as_slice()))
            .map_err(|e| open_failure(format!("Failed to read .dbf: {}", e)))?;
        let names: Vec<String> =
            table_reader.fields().iter().map(|f| f.name().to_string()).collect();

        let mut reader = shapefile::Reader::new(shape_reader, table_reader);
        let mut rows = Vec::new();
        for result in reader.iter_shapes_and_records() {
            let (shape, record) =
                result.map_err(|e| open_failure(format!("Failed to read feature: {}", e)))?;
            rows.push((to_geometry(shape).map_err(open_failure)?, record));
        }

        let fields: Vec<FieldDefn> = names
            .iter()
            .map(|field| {
                let field_type = rows
                    .iter()
                    .filter_map(|(_, record)| record.get(field).and_then(infer_value))
                    .reduce(widen)
                    .unwrap_or(FieldType::String);
                FieldDefn::new(field.clone(), field_type)
            })
            .collect();

        let features = rows
            .into_iter()
            .enumerate()
            .map(|(index, (geometry, record))| {
                let values = fields
                    .iter()
                    .map(|defn| {
                        record
                            .get(&defn.name)
                            .and_then(|value| convert_value(value, defn.field_type))
                    })
                    .collect();
                MemoryFeature::new(index as i64, geometry, values)
            })
            .collect();

        let mut layer = MemoryLayer::new(name).with_fields(fields).with_features(features);
        layer.crs = sidecar("prj")
            .and_then(|prj| std::str::from_utf8(&prj.bytes).ok())
            .and_then(crs_from_prj);
        Ok(vec![layer])
    }

    fn encode(&self, layers: &[MemoryLayer], _options: &CreationOptions) -> Result<Vec<EncodedFile>> {
        let failure = |reason: String| GeoconvertError::TranslateFailure {
            driver: DRIVER.to_string(),
            reason,
        };

        let layer = match layers {
            [layer] => layer,
            _ => {
                return Err(failure(format!(
                    "Shapefile driver writes exactly one layer, got {}",
                    layers.len()
                )))
            }
        };

        let columns = dbf_columns(layer).map_err(failure)?;
        let shapes = layer
            .features
            .iter()
            .map(|feature| {
                let geometry = feature.geometry.as_ref().ok_or_else(|| {
                    format!("Feature {} has no geometry", feature.fid)
                })?;
                to_shape(geometry)
            })
            .collect::<std::result::Result<Vec<_>, String>>()
            .map_err(failure)?;

        if let Some(first) = shapes.first() {
            if let Some(other) = shapes.iter().find(|s| s.family() != first.family()) {
                return Err(failure(format!(
                    "Attempt to write non-{} ({}) geometry to {} shapefile",
                    first.family(),
                    other.family(),
                    first.family()
                )));
            }
        }

        let mut shp = Cursor::new(Vec::new());
        let mut shx = Cursor::new(Vec::new());
        let mut dbf = Cursor::new(Vec::new());
        {
            let mut builder = TableWriterBuilder::new();
            for column in &columns {
                let name = FieldName::try_from(column.name.as_str()).map_err(|e| {
                    failure(format!("Invalid field name '{}': {:?}", column.name, e))
                })?;
                builder = match column.kind {
                    ColumnKind::Numeric { width, decimals } => {
                        builder.add_numeric_field(name, width, decimals)
                    }
                    ColumnKind::Date => builder.add_date_field(name),
                    ColumnKind::Character { width } => builder.add_character_field(name, width),
                };
            }
            let table_writer = builder.build_with_dest(&mut dbf);
            let shape_writer = ShapeWriter::with_shx(&mut shp, &mut shx);
            let mut writer = shapefile::Writer::new(shape_writer, table_writer);

            for (shape, feature) in shapes.iter().zip(&layer.features) {
                let mut record = Record::default();
                for (column, value) in columns.iter().zip(&feature.values) {
                    record.insert(column.name.clone(), column.value(value.as_ref()));
                }
                let written = match shape {
                    FamilyShape::Point(s) => writer.write_shape_and_record(s, &record),
                    FamilyShape::Multipoint(s) => writer.write_shape_and_record(s, &record),
                    FamilyShape::Polyline(s) => writer.write_shape_and_record(s, &record),
                    FamilyShape::Polygon(s) => writer.write_shape_and_record(s, &record),
                };
                written.map_err(|e| failure(format!("Failed to write feature {}: {}", feature.fid, e)))?;
            }
        }

        let mut files = vec![
            EncodedFile::new("shp", shp.into_inner()),
            EncodedFile::new("shx", shx.into_inner()),
            EncodedFile::new("dbf", dbf.into_inner()),
        ];
        if let Some(crs) = &layer.crs {
            files.push(EncodedFile::new("prj", prj_text(crs).into_bytes()));
        }
        Ok(files)
    }
}

trait Xy {
    fn xy(&self) -> Coord<f64>;
}

impl Xy for shapefile::Point {
    fn xy(&self) -> Coord<f64> {
        Coord { x: self.x, y: self.y }
    }
}

impl Xy for shapefile::PointM {
    fn xy(&self) -> Coord<f64> {
        Coord { x: self.x, y: self.y }
    }
}

impl Xy for shapefile::PointZ {
    fn xy(&self) -> Coord<f64> {
        Coord { x: self.x, y: self.y }
    }
}

fn coords<P: Xy>(points: &[P]) -> Vec<Coord<f64>> {
    points.iter().map(Xy::xy).collect()
}

fn multipoint<P: Xy>(points: &[P]) -> Geometry<f64> {
    Geometry::MultiPoint(MultiPoint::new(
        points.iter().map(|p| geo::Point::from(p.xy())).collect(),
    ))
}

fn lines<P: Xy>(parts: &[Vec<P>]) -> Geometry<f64> {
    let mut lines: Vec<LineString<f64>> =
        parts.iter().map(|part| LineString::new(coords(part))).collect();
    if lines.len() == 1 {
        Geometry::LineString(lines.remove(0))
    } else {
        Geometry::MultiLineString(MultiLineString::new(lines))
    }
}

/// Outer rings start a polygon; inner rings attach to the latest one
fn polygons<P: Xy>(rings: &[PolygonRing<P>]) -> Geometry<f64> {
    let mut parts: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    for ring in rings {
        let line = LineString::new(coords(ring.points()));
        match (ring, parts.last_mut()) {
            (PolygonRing::Inner(_), Some((_, holes))) => holes.push(line),
            _ => parts.push((line, Vec::new())),
        }
    }

    let mut polygons: Vec<Polygon<f64>> = parts
        .into_iter()
        .map(|(exterior, holes)| Polygon::new(exterior, holes))
        .collect();
    if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(geo::MultiPolygon::new(polygons))
    }
}

fn to_geometry(shape: Shape) -> std::result::Result<Option<Geometry<f64>>, String> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => Geometry::Point(p.xy().into()),
        Shape::PointM(p) => Geometry::Point(p.xy().into()),
        Shape::PointZ(p) => Geometry::Point(p.xy().into()),
        Shape::Multipoint(m) => multipoint(m.points()),
        Shape::MultipointM(m) => multipoint(m.points()),
        Shape::MultipointZ(m) => multipoint(m.points()),
        Shape::Polyline(l) => lines(l.parts()),
        Shape::PolylineM(l) => lines(l.parts()),
        Shape::PolylineZ(l) => lines(l.parts()),
        Shape::Polygon(p) => polygons(p.rings()),
        Shape::PolygonM(p) => polygons(p.rings()),
        Shape::PolygonZ(p) => polygons(p.rings()),
        Shape::Multipatch(_) => return Err("Multipatch shapes are not supported".to_string()),
    };
    Ok(Some(geometry))
}

/// A shape ready to be written, one variant per shapefile family
enum FamilyShape {
    Point(shapefile::Point),
    Multipoint(Multipoint),
    Polyline(Polyline),
    Polygon(shapefile::Polygon),
}

impl FamilyShape {
    fn family(&self) -> &'static str {
        match self {
            FamilyShape::Point(_) => "point",
            FamilyShape::Multipoint(_) => "multipoint",
            FamilyShape::Polyline(_) => "arc",
            FamilyShape::Polygon(_) => "polygon",
        }
    }
}

fn esri_point(coord: Coord<f64>) -> shapefile::Point {
    shapefile::Point::new(coord.x, coord.y)
}

fn esri_points(line: &LineString<f64>) -> std::result::Result<Vec<shapefile::Point>, String> {
    if line.0.is_empty() {
        return Err("Empty geometries cannot be written to a shapefile".to_string());
    }
    Ok(line.coords().copied().map(esri_point).collect())
}

fn esri_rings(polygon: &Polygon<f64>) -> std::result::Result<Vec<PolygonRing<shapefile::Point>>, String> {
    let mut rings = vec![PolygonRing::Outer(esri_points(polygon.exterior())?)];
    for interior in polygon.interiors() {
        rings.push(PolygonRing::Inner(esri_points(interior)?));
    }
    Ok(rings)
}

fn to_shape(geometry: &Geometry<f64>) -> std::result::Result<FamilyShape, String> {
    let shape = match geometry {
        Geometry::Point(p) => FamilyShape::Point(esri_point(p.0)),
        Geometry::MultiPoint(mp) => {
            if mp.0.is_empty() {
                return Err("Empty geometries cannot be written to a shapefile".to_string());
            }
            FamilyShape::Multipoint(Multipoint::new(mp.iter().map(|p| esri_point(p.0)).collect()))
        }
        Geometry::Line(line) => {
            FamilyShape::Polyline(Polyline::new(vec![esri_point(line.start), esri_point(line.end)]))
        }
        Geometry::LineString(line) => FamilyShape::Polyline(Polyline::new(esri_points(line)?)),
        Geometry::MultiLineString(mls) => {
            let parts = mls.iter().map(esri_points).collect::<std::result::Result<Vec<_>, _>>()?;
            if parts.is_empty() {
                return Err("Empty geometries cannot be written to a shapefile".to_string());
            }
            FamilyShape::Polyline(Polyline::with_parts(parts))
        }
        Geometry::Polygon(polygon) => FamilyShape::Polygon(shapefile::Polygon::with_rings(esri_rings(polygon)?)),
        Geometry::MultiPolygon(mp) => {
            let mut rings = Vec::new();
            for polygon in mp {
                rings.extend(esri_rings(polygon)?);
            }
            if rings.is_empty() {
                return Err("Empty geometries cannot be written to a shapefile".to_string());
            }
            FamilyShape::Polygon(shapefile::Polygon::with_rings(rings))
        }
        Geometry::Rect(rect) => {
            FamilyShape::Polygon(shapefile::Polygon::with_rings(esri_rings(&rect.to_polygon())?))
        }
        Geometry::Triangle(triangle) => {
            FamilyShape::Polygon(shapefile::Polygon::with_rings(esri_rings(&triangle.to_polygon())?))
        }
        Geometry::GeometryCollection(_) => {
            return Err("Geometry collections cannot be written to a shapefile".to_string())
        }
    };
    Ok(shape)
}

fn infer_number(value: f64) -> FieldType {
    if value.fract() != 0.0 {
        FieldType::Real
    } else if value >= i32::MIN as f64 && value <= i32::MAX as f64 {
        FieldType::Integer
    } else if value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        FieldType::Integer64
    } else {
        FieldType::Real
    }
}

/// Attribute type of a non-null dBASE value
fn infer_value(value: &DbaseValue) -> Option<FieldType> {
    match value {
        DbaseValue::Character(text) => text.as_ref().map(|_| FieldType::String),
        DbaseValue::Memo(_) => Some(FieldType::String),
        DbaseValue::Numeric(number) => number.map(infer_number),
        DbaseValue::Float(number) => number.map(|n| infer_number(n as f64)),
        DbaseValue::Double(number) | DbaseValue::Currency(number) => Some(infer_number(*number)),
        DbaseValue::Integer(_) => Some(FieldType::Integer),
        DbaseValue::Logical(flag) => flag.map(|_| FieldType::Integer),
        DbaseValue::Date(date) => date.as_ref().map(|_| FieldType::Date),
        DbaseValue::DateTime(_) => Some(FieldType::Date),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn to_naive_date(date: &dbase::Date) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year() as i32, date.month(), date.day())
}

fn typed_number(number: f64, field_type: FieldType) -> FieldValue {
    match field_type {
        FieldType::Integer => FieldValue::Integer(number as i32),
        FieldType::Integer64 => FieldValue::Integer64(number as i64),
        FieldType::Real => FieldValue::Real(number),
        _ => FieldValue::String(number.to_string()),
    }
}

/// Convert a dBASE value into the column's inferred type
fn convert_value(value: &DbaseValue, field_type: FieldType) -> Option<FieldValue> {
    let converted = match value {
        DbaseValue::Character(text) => FieldValue::String(text.clone()?),
        DbaseValue::Memo(text) => FieldValue::String(text.clone()),
        DbaseValue::Numeric(number) => typed_number((*number)?, field_type),
        DbaseValue::Float(number) => typed_number((*number)? as f64, field_type),
        DbaseValue::Double(number) | DbaseValue::Currency(number) => typed_number(*number, field_type),
        DbaseValue::Integer(number) => typed_number(*number as f64, field_type),
        DbaseValue::Logical(flag) => typed_number(if (*flag)? { 1.0 } else { 0.0 }, field_type),
        DbaseValue::Date(date) => FieldValue::Date(to_naive_date(date.as_ref()?)?),
        DbaseValue::DateTime(datetime) => FieldValue::Date(to_naive_date(&datetime.date())?),
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(converted)
}

/// CRS label of a `.prj` text: its EPSG authority, WGS84, or the text itself
fn crs_from_prj(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    const AUTHORITY: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(index) = text.rfind(AUTHORITY) {
        let code: String = text[index + AUTHORITY.len()..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        if !code.is_empty() {
            return Some(format!("EPSG:{}", code));
        }
    }

    if text.starts_with("GEOGCS") && text.contains("WGS_1984") {
        return Some("EPSG:4326".to_string());
    }
    Some(text.to_string())
}

fn prj_text(crs: &str) -> String {
    match CrsIdentifier::parse(crs).and_then(|id| id.epsg()) {
        Some(4326) => WGS84_PRJ.to_string(),
        _ => crs.to_string(),
    }
}

enum ColumnKind {
    Numeric { width: u8, decimals: u8 },
    Date,
    Character { width: u8 },
}

/// A `.dbf` column derived from a layer field
struct Column {
    name: String,
    kind: ColumnKind,
}

impl Column {
    fn value(&self, value: Option<&FieldValue>) -> DbaseValue {
        match self.kind {
            ColumnKind::Numeric { .. } => DbaseValue::Numeric(value.and_then(FieldValue::as_f64)),
            ColumnKind::Date => DbaseValue::Date(value.and_then(|v| match v {
                FieldValue::Date(date) => Some(*date),
                FieldValue::DateTime(datetime) => Some(datetime.date()),
                _ => None,
            })
            .map(|d| dbase::Date::new(d.day(), d.month(), d.year() as u32))),
            ColumnKind::Character { .. } => DbaseValue::Character(value.map(character_text)),
        }
    }
}

fn character_text(value: &FieldValue) -> String {
    value.to_string().chars().take(MAX_CHARACTER_WIDTH).collect()
}

/// Column layout for a layer: names truncated, numbers and dates typed
fn dbf_columns(layer: &MemoryLayer) -> std::result::Result<Vec<Column>, String> {
    let mut seen = HashSet::new();
    layer
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let name: String = field.name.chars().take(MAX_FIELD_NAME).collect();
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(format!(
                    "Field '{}' truncates to '{}', which is already in use",
                    field.name, name
                ));
            }

            let kind = match field.field_type {
                FieldType::Integer => ColumnKind::Numeric { width: 11, decimals: 0 },
                FieldType::Integer64 => ColumnKind::Numeric { width: 20, decimals: 0 },
                FieldType::Real => ColumnKind::Numeric { width: 24, decimals: 15 },
                FieldType::Date => ColumnKind::Date,
                _ => {
                    let width = layer
                        .features
                        .iter()
                        .filter_map(|f| f.values.get(index)?.as_ref())
                        .map(|v| character_text(v).len())
                        .max()
                        .unwrap_or(1)
                        .clamp(1, MAX_CHARACTER_WIDTH);
                    ColumnKind::Character { width: width as u8 }
                }
            };
            Ok(Column { name, kind })
        })
        .collect()
}
