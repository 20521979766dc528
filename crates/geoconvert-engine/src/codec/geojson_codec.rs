//! GeoJSON codec

use chrono::{NaiveDate, NaiveDateTime};
use geo::{BoundingRect, Coord, MapCoords};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, JsonValue};
use geoconvert_core::models::{CrsIdentifier, FieldType, FieldValue};
use geoconvert_core::{GeoconvertError, Result};

use super::{widen, CreationOptions, EncodedFile, VectorCodec};
use crate::model::{FieldDefn, MemoryFeature, MemoryLayer};

/// CRS assumed when a GeoJSON document carries no `crs` member
pub const DEFAULT_CRS: &str = "EPSG:4326";

const DRIVER: &str = "GeoJSON";

/// Precision at or above which coordinates are written unrounded
const FULL_PRECISION: u32 = 15;

/// GeoJSON codec
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonCodec;

impl VectorCodec for GeoJsonCodec {
    fn driver(&self) -> &str {
        DRIVER
    }

    fn extensions(&self) -> &[&str] {
        &["geojson", "json"]
    }

    fn decode(&self, name: &str, bytes: &[u8]) -> Result<Vec<MemoryLayer>> {
        let text = std::str::from_utf8(bytes).map_err(|e| GeoconvertError::OpenFailure {
            path: name.to_string(),
            reason: format!("GeoJSON is not valid UTF-8: {}", e),
        })?;

        let geojson: GeoJson = text.parse().map_err(|e| GeoconvertError::OpenFailure {
            path: name.to_string(),
            reason: format!("Failed to parse GeoJSON: {}", e),
        })?;

        let (features, foreign) = match geojson {
            GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
            GeoJson::Feature(feature) => (vec![feature], None),
            GeoJson::Geometry(geometry) => (vec![Feature::from(geometry)], None),
        };

        let layer_name = foreign
            .as_ref()
            .and_then(|m| m.get("name"))
            .and_then(JsonValue::as_str)
            .unwrap_or(name)
            .to_string();
        let crs = foreign
            .as_ref()
            .and_then(|m| m.get("crs"))
            .and_then(crs_from_member)
            .unwrap_or_else(|| DEFAULT_CRS.to_string());

        let fields = infer_schema(&features);
        let mut decoded = Vec::with_capacity(features.len());
        for (index, feature) in features.into_iter().enumerate() {
            let fid = feature_id(&feature).unwrap_or(index as i64);
            let geometry = match feature.geometry {
                Some(geometry) => Some(geo::Geometry::<f64>::try_from(geometry).map_err(|e| {
                    GeoconvertError::OpenFailure {
                        path: name.to_string(),
                        reason: format!("Invalid geometry in feature {}: {}", index, e),
                    }
                })?),
                None => None,
            };
            let values = fields
                .iter()
                .map(|defn| {
                    feature
                        .properties
                        .as_ref()
                        .and_then(|props| props.get(&defn.name))
                        .and_then(|value| to_field_value(value, defn.field_type))
                })
                .collect();
            decoded.push(MemoryFeature::new(fid, geometry, values));
        }

        Ok(vec![MemoryLayer::new(layer_name)
            .with_crs(crs)
            .with_fields(fields)
            .with_features(decoded)])
    }

    fn encode(&self, layers: &[MemoryLayer], options: &CreationOptions) -> Result<Vec<EncodedFile>> {
        let layer = match layers {
            [layer] => layer,
            _ => {
                return Err(GeoconvertError::TranslateFailure {
                    driver: DRIVER.to_string(),
                    reason: format!(
                        "GeoJSON driver writes exactly one layer, got {}",
                        layers.len()
                    ),
                })
            }
        };

        let write_bbox = options.is_enabled("WRITE_BBOX");
        let precision = match options.get("COORDINATE_PRECISION") {
            Some(raw) => Some(raw.trim().parse::<u32>().map_err(|_| {
                GeoconvertError::TranslateFailure {
                    driver: DRIVER.to_string(),
                    reason: format!("Invalid COORDINATE_PRECISION '{}'", raw),
                }
            })?),
            None => None,
        }
        .filter(|p| *p < FULL_PRECISION);

        let mut features = Vec::with_capacity(layer.features.len());
        let mut collection_bbox: Option<geo::Rect<f64>> = None;

        for feature in &layer.features {
            let geometry = feature
                .geometry
                .as_ref()
                .map(|g| match precision {
                    Some(digits) => g.map_coords(|c| round_coord(c, digits)),
                    None => g.clone(),
                });

            let bbox = if write_bbox {
                geometry.as_ref().and_then(|g| g.bounding_rect()).map(|rect| {
                    collection_bbox = Some(match collection_bbox {
                        Some(acc) => union_rect(acc, rect),
                        None => rect,
                    });
                    rect_to_bbox(rect)
                })
            } else {
                None
            };

            let mut properties = JsonObject::new();
            for (defn, value) in layer.fields.iter().zip(&feature.values) {
                properties.insert(defn.name.clone(), to_json(value.as_ref()));
            }

            features.push(Feature {
                bbox,
                geometry: geometry.as_ref().map(|g| geojson::Geometry::new(geojson::Value::from(g))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }

        let mut foreign = JsonObject::new();
        foreign.insert("name".to_string(), JsonValue::String(layer.name.clone()));
        if let Some(member) = layer.crs.as_deref().and_then(crs_member) {
            foreign.insert("crs".to_string(), member);
        }

        let collection = FeatureCollection {
            bbox: collection_bbox.map(rect_to_bbox),
            features,
            foreign_members: Some(foreign),
        };

        let bytes = serde_json::to_vec(&collection)
            .map_err(|e| GeoconvertError::Serialization(e.to_string()))?;
        Ok(vec![EncodedFile::new("geojson", bytes)])
    }
}

fn feature_id(feature: &Feature) -> Option<i64> {
    match feature.id.as_ref()? {
        geojson::feature::Id::Number(number) => number.as_i64(),
        geojson::feature::Id::String(text) => text.parse().ok(),
    }
}

/// Read a `{"type":"name","properties":{"name":...}}` member
fn crs_from_member(member: &JsonValue) -> Option<String> {
    let name = member.get("properties")?.get("name")?.as_str()?;
    if name.to_ascii_uppercase().contains("CRS84") {
        return Some(DEFAULT_CRS.to_string());
    }
    match CrsIdentifier::parse(name)? {
        CrsIdentifier::EpsgCode(code) => Some(format!("EPSG:{}", code)),
        other => Some(other.as_engine_input()),
    }
}

/// Build the `crs` member for a non-WGS84 label
fn crs_member(label: &str) -> Option<JsonValue> {
    let name = match CrsIdentifier::parse(label)? {
        CrsIdentifier::EpsgCode(4326) => return None,
        CrsIdentifier::EpsgCode(code) => format!("urn:ogc:def:crs:EPSG::{}", code),
        other => other.as_engine_input(),
    };
    Some(serde_json::json!({ "type": "name", "properties": { "name": name } }))
}

fn round_coord(c: Coord<f64>, digits: u32) -> Coord<f64> {
    let scale = 10f64.powi(digits as i32);
    Coord { x: (c.x * scale).round() / scale, y: (c.y * scale).round() / scale }
}

fn union_rect(a: geo::Rect<f64>, b: geo::Rect<f64>) -> geo::Rect<f64> {
    geo::Rect::new(
        Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
        Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
    )
}

fn rect_to_bbox(rect: geo::Rect<f64>) -> Vec<f64> {
    vec![rect.min().x, rect.min().y, rect.max().x, rect.max().y]
}

fn infer_schema(features: &[Feature]) -> Vec<FieldDefn> {
    let mut fields: Vec<(String, Option<FieldType>)> = Vec::new();

    for properties in features.iter().filter_map(|f| f.properties.as_ref()) {
        for (key, value) in properties {
            let candidate = infer_type(value);
            match fields.iter_mut().find(|(name, _)| name == key) {
                Some((_, current)) => {
                    *current = match (*current, candidate) {
                        (Some(a), Some(b)) => Some(widen(a, b)),
                        (a, b) => a.or(b),
                    }
                }
                None => fields.push((key.clone(), candidate)),
            }
        }
    }

    fields
        .into_iter()
        .map(|(name, ty)| FieldDefn::new(name, ty.unwrap_or(FieldType::String)))
        .collect()
}

fn infer_type(value: &JsonValue) -> Option<FieldType> {
    let ty = match value {
        JsonValue::Null => return None,
        JsonValue::Bool(_) => FieldType::Integer,
        JsonValue::Number(n) => match n.as_i64() {
            Some(v) if i32::try_from(v).is_ok() => FieldType::Integer,
            Some(_) => FieldType::Integer64,
            None => FieldType::Real,
        },
        JsonValue::String(s) => {
            if parse_date(s).is_some() {
                FieldType::Date
            } else if parse_datetime(s).is_some() {
                FieldType::DateTime
            } else {
                FieldType::String
            }
        }
        JsonValue::Array(items) => {
            let item_type = items
                .iter()
                .filter_map(infer_type)
                .reduce(widen)
                .unwrap_or(FieldType::String);
            match item_type {
                FieldType::Integer => FieldType::IntegerList,
                FieldType::Integer64 => FieldType::Integer64List,
                FieldType::Real => FieldType::RealList,
                _ => FieldType::StringList,
            }
        }
        JsonValue::Object(_) => FieldType::String,
    };
    Some(ty)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim_end_matches('Z');
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

fn json_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_field_value(value: &JsonValue, field_type: FieldType) -> Option<FieldValue> {
    if value.is_null() {
        return None;
    }

    let as_i64 = |v: &JsonValue| match v {
        JsonValue::Bool(b) => Some(i64::from(*b)),
        other => other.as_i64(),
    };

    let converted = match field_type {
        FieldType::Integer => FieldValue::Integer(i32::try_from(as_i64(value)?).ok()?),
        FieldType::Integer64 => FieldValue::Integer64(as_i64(value)?),
        FieldType::Real => FieldValue::Real(value.as_f64()?),
        FieldType::Date => FieldValue::Date(parse_date(value.as_str()?)?),
        FieldType::DateTime => {
            let text = value.as_str()?;
            let parsed = parse_datetime(text)
                .or_else(|| parse_date(text).and_then(|d| d.and_hms_opt(0, 0, 0)))?;
            FieldValue::DateTime(parsed)
        }
        FieldType::IntegerList => FieldValue::IntegerList(
            value
                .as_array()?
                .iter()
                .filter_map(|v| as_i64(v).and_then(|n| i32::try_from(n).ok()))
                .collect(),
        ),
        FieldType::Integer64List => {
            FieldValue::Integer64List(value.as_array()?.iter().filter_map(as_i64).collect())
        }
        FieldType::RealList => FieldValue::RealList(
            value.as_array()?.iter().filter_map(JsonValue::as_f64).collect(),
        ),
        FieldType::StringList => match value {
            JsonValue::Array(items) => FieldValue::StringList(items.iter().map(json_text).collect()),
            other => FieldValue::StringList(vec![json_text(other)]),
        },
        FieldType::String | FieldType::Time | FieldType::Binary => {
            FieldValue::String(json_text(value))
        }
    };
    Some(converted)
}

fn to_json(value: Option<&FieldValue>) -> JsonValue {
    let Some(value) = value else {
        return JsonValue::Null;
    };

    match value {
        FieldValue::Integer(v) => JsonValue::from(*v),
        FieldValue::Integer64(v) => JsonValue::from(*v),
        FieldValue::Real(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        FieldValue::IntegerList(v) => JsonValue::from(v.clone()),
        FieldValue::Integer64List(v) => JsonValue::from(v.clone()),
        FieldValue::RealList(v) => JsonValue::Array(
            v.iter()
                .map(|x| serde_json::Number::from_f64(*x).map(JsonValue::Number).unwrap_or(JsonValue::Null))
                .collect(),
        ),
        FieldValue::StringList(v) => JsonValue::from(v.clone()),
        other => JsonValue::String(other.to_string()),
    }
}
