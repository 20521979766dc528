//! CSV codec
//!
//! Geometry is read from a `WKT` column, or from an X/Y column pair
//! (`X`/`Y`, `lon`/`lat`, `longitude`/`latitude`). Those columns do not
//! become attribute fields. Written geometry follows the `GEOMETRY` creation
//! option: `AS_WKT` puts a `WKT` column first, `AS_XY` appends `X` and `Y`.
//! CSV layers carry no CRS.

use geo::Geometry;
use geoconvert_core::models::{CsvGeometryMode, FieldType, FieldValue};
use geoconvert_core::{GeoconvertError, Result};
use wkt::{ToWkt, TryFromWkt};

use super::{widen, CreationOptions, EncodedFile, VectorCodec};
use crate::model::{FieldDefn, MemoryFeature, MemoryLayer};

const DRIVER: &str = "CSV";

const XY_COLUMNS: &[(&str, &str)] = &[("x", "y"), ("lon", "lat"), ("longitude", "latitude")];

enum GeometryColumns {
    Wkt(usize),
    Xy(usize, usize),
    None,
}

impl GeometryColumns {
    fn detect(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));

        if let Some(index) = find("WKT") {
            return GeometryColumns::Wkt(index);
        }
        XY_COLUMNS
            .iter()
            .find_map(|&(x, y)| Some(GeometryColumns::Xy(find(x)?, find(y)?)))
            .unwrap_or(GeometryColumns::None)
    }

    fn contains(&self, index: usize) -> bool {
        match self {
            GeometryColumns::Wkt(i) => *i == index,
            GeometryColumns::Xy(x, y) => *x == index || *y == index,
            GeometryColumns::None => false,
        }
    }

    fn read(&self, record: &csv::StringRecord) -> Option<Geometry<f64>> {
        match self {
            GeometryColumns::Wkt(i) => {
                let text = record.get(*i)?.trim();
                if text.is_empty() {
                    return None;
                }
                match Geometry::try_from_wkt_str(text) {
                    Ok(geometry) => Some(geometry),
                    Err(e) => {
                        tracing::warn!("Ignoring unparsable WKT '{}': {}", text, e);
                        None
                    }
                }
            }
            GeometryColumns::Xy(x, y) => {
                let x: f64 = record.get(*x)?.trim().parse().ok()?;
                let y: f64 = record.get(*y)?.trim().parse().ok()?;
                Some(Geometry::Point(geo::Point::new(x, y)))
            }
            GeometryColumns::None => None,
        }
    }
}

/// CSV codec
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

impl VectorCodec for CsvCodec {
    fn driver(&self) -> &str {
        DRIVER
    }

    fn extensions(&self) -> &[&str] {
        &["csv"]
    }

    fn decode(&self, name: &str, bytes: &[u8]) -> Result<Vec<MemoryLayer>> {
        let open_failure = |e: csv::Error| GeoconvertError::OpenFailure {
            path: name.to_string(),
            reason: format!("Failed to read CSV: {}", e),
        };

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
        let headers = reader.headers().map_err(open_failure)?.clone();
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(open_failure)?;

        let geometry_columns = GeometryColumns::detect(&headers);
        let attribute_columns: Vec<usize> =
            (0..headers.len()).filter(|i| !geometry_columns.contains(*i)).collect();

        let fields: Vec<FieldDefn> = attribute_columns
            .iter()
            .map(|&column| {
                let field_type = records
                    .iter()
                    .filter_map(|r| r.get(column))
                    .filter(|cell| !cell.is_empty())
                    .map(infer_cell)
                    .reduce(widen)
                    .unwrap_or(FieldType::String);
                FieldDefn::new(headers.get(column).unwrap_or_default().trim(), field_type)
            })
            .collect();

        let features = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let values = attribute_columns
                    .iter()
                    .zip(&fields)
                    .map(|(&column, defn)| {
                        record
                            .get(column)
                            .filter(|cell| !cell.is_empty())
                            .and_then(|cell| parse_cell(cell, defn.field_type))
                    })
                    .collect();
                MemoryFeature::new(index as i64, geometry_columns.read(record), values)
            })
            .collect();

        let mut layer = MemoryLayer::new(name).with_fields(fields).with_features(features);
        if matches!(geometry_columns, GeometryColumns::None) {
            layer.declared_kind = Some(geoconvert_core::models::GeometryKind::None);
        }
        Ok(vec![layer])
    }

    fn encode(&self, layers: &[MemoryLayer], options: &CreationOptions) -> Result<Vec<EncodedFile>> {
        let failure = |reason: String| GeoconvertError::TranslateFailure {
            driver: DRIVER.to_string(),
            reason,
        };

        let layer = match layers {
            [layer] => layer,
            _ => {
                return Err(failure(format!(
                    "CSV driver writes exactly one layer, got {}",
                    layers.len()
                )))
            }
        };

        let mode = match options.get("GEOMETRY") {
            Some(raw) => Some(
                CsvGeometryMode::parse(raw)
                    .ok_or_else(|| failure(format!("Invalid GEOMETRY option '{}'", raw)))?,
            ),
            None => None,
        };

        let mut header: Vec<String> = Vec::new();
        if mode == Some(CsvGeometryMode::Wkt) {
            header.push("WKT".to_string());
        }
        header.extend(layer.fields.iter().map(|f| f.name.clone()));
        if mode == Some(CsvGeometryMode::Xy) {
            header.push("X".to_string());
            header.push("Y".to_string());
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&header).map_err(|e| failure(e.to_string()))?;

        for feature in &layer.features {
            let mut row: Vec<String> = Vec::with_capacity(header.len());
            if mode == Some(CsvGeometryMode::Wkt) {
                row.push(feature.geometry.as_ref().map(|g| g.wkt_string()).unwrap_or_default());
            }
            row.extend(
                feature
                    .values
                    .iter()
                    .map(|v| v.as_ref().map(ToString::to_string).unwrap_or_default()),
            );
            if mode == Some(CsvGeometryMode::Xy) {
                match &feature.geometry {
                    Some(Geometry::Point(point)) => {
                        row.push(point.x().to_string());
                        row.push(point.y().to_string());
                    }
                    _ => {
                        row.push(String::new());
                        row.push(String::new());
                    }
                }
            }
            writer.write_record(&row).map_err(|e| failure(e.to_string()))?;
        }

        let bytes = writer.into_inner().map_err(|e| failure(e.to_string()))?;
        Ok(vec![EncodedFile::new("csv", bytes)])
    }
}

fn infer_cell(cell: &str) -> FieldType {
    let cell = cell.trim();
    if cell.parse::<i32>().is_ok() {
        FieldType::Integer
    } else if cell.parse::<i64>().is_ok() {
        FieldType::Integer64
    } else if cell.parse::<f64>().is_ok() {
        FieldType::Real
    } else {
        FieldType::String
    }
}

fn parse_cell(cell: &str, field_type: FieldType) -> Option<FieldValue> {
    let trimmed = cell.trim();
    match field_type {
        FieldType::Integer => trimmed.parse().ok().map(FieldValue::Integer),
        FieldType::Integer64 => trimmed.parse().ok().map(FieldValue::Integer64),
        FieldType::Real => trimmed.parse().ok().map(FieldValue::Real),
        _ => Some(FieldValue::String(cell.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoconvert_core::models::GeometryKind;

    fn layer() -> MemoryLayer {
        MemoryLayer::new("cities")
            .with_fields(vec![
                FieldDefn::new("name", FieldType::String),
                FieldDefn::new("population", FieldType::Integer),
            ])
            .with_features(vec![MemoryFeature::new(
                0,
                Some(Geometry::Point(geo::Point::new(2.35, 48.85))),
                vec![Some(FieldValue::String("Paris".into())), Some(FieldValue::Integer(2_148_000))],
            )])
    }

    fn encode(mode: &str) -> String {
        let mut options = CreationOptions::new();
        options.set("GEOMETRY", mode);
        let files = CsvCodec.encode(&[layer()], &options).unwrap();
        String::from_utf8(files[0].bytes.clone()).unwrap()
    }

    #[test]
    fn test_encode_as_xy_appends_columns() {
        let text = encode("AS_XY");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name,population,X,Y");
        assert_eq!(lines[1], "Paris,2148000,2.35,48.85");
    }

    #[test]
    fn test_encode_as_wkt_prepends_column() {
        let text = encode("AS_WKT");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "WKT,name,population");
        assert!(lines[1].contains("2.35 48.85"));
        assert!(lines[1].ends_with(",Paris,2148000"));
    }

    #[test]
    fn test_decode_xy_columns_become_geometry() {
        let text = encode("AS_XY");
        let layers = CsvCodec.decode("cities", text.as_bytes()).unwrap();
        let decoded = &layers[0];
        assert_eq!(decoded.crs, None);
        assert_eq!(decoded.fields, layer().fields);
        assert_eq!(decoded.geometry_kind(), GeometryKind::Point);
        assert_eq!(decoded.features[0].geometry, layer().features[0].geometry);
    }

    #[test]
    fn test_decode_wkt_column() {
        let text = "WKT,id\n\"LINESTRING (0 0, 1 1)\",7\n,8\n";
        let layers = CsvCodec.decode("lines", text.as_bytes()).unwrap();
        let decoded = &layers[0];
        assert_eq!(decoded.fields, vec![FieldDefn::new("id", FieldType::Integer)]);
        assert_eq!(decoded.features.len(), 2);
        assert!(decoded.features[1].geometry.is_none());
        assert_eq!(decoded.geometry_kind(), GeometryKind::LineString);
    }

    #[test]
    fn test_decode_attribute_table() {
        let text = "code,label\n1,a\n2.5,b\n";
        let layers = CsvCodec.decode("table", text.as_bytes()).unwrap();
        assert_eq!(layers[0].geometry_kind(), GeometryKind::None);
        assert_eq!(layers[0].fields[0].field_type, FieldType::Real);
    }
}
