//! Attribute field types and the first-feature field preview.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field definition types an engine can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Integer,
    Integer64,
    Real,
    String,
    Date,
    DateTime,
    Time,
    Binary,
    IntegerList,
    Integer64List,
    RealList,
    StringList,
}

/// A concrete attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Integer(i32),
    Integer64(i64),
    Real(f64),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Binary(Vec<u8>),
    IntegerList(Vec<i32>),
    Integer64List(Vec<i64>),
    RealList(Vec<f64>),
    StringList(Vec<String>),
}

impl FieldValue {
    /// The definition type matching this value
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Integer(_) => FieldType::Integer,
            FieldValue::Integer64(_) => FieldType::Integer64,
            FieldValue::Real(_) => FieldType::Real,
            FieldValue::String(_) => FieldType::String,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::DateTime(_) => FieldType::DateTime,
            FieldValue::Time(_) => FieldType::Time,
            FieldValue::Binary(_) => FieldType::Binary,
            FieldValue::IntegerList(_) => FieldType::IntegerList,
            FieldValue::Integer64List(_) => FieldType::Integer64List,
            FieldValue::RealList(_) => FieldType::RealList,
            FieldValue::StringList(_) => FieldType::StringList,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(f64::from(*v)),
            FieldValue::Integer64(v) => Some(*v as f64),
            FieldValue::Real(v) => Some(*v),
            _ => None,
        }
    }
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Integer64(v) => write!(f, "{}", v),
            FieldValue::Real(v) => write!(f, "{}", v),
            FieldValue::String(v) => f.write_str(v),
            FieldValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            FieldValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S")),
            FieldValue::Time(v) => write!(f, "{}", v.format("%H:%M:%S")),
            FieldValue::Binary(bytes) => {
                for byte in bytes {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            FieldValue::IntegerList(v) => write!(f, "({}:{})", v.len(), join(v)),
            FieldValue::Integer64List(v) => write!(f, "({}:{})", v.len(), join(v)),
            FieldValue::RealList(v) => write!(f, "({}:{})", v.len(), join(v)),
            FieldValue::StringList(v) => write!(f, "({}:{})", v.len(), v.join(",")),
        }
    }
}

/// One field of a sampled feature, as reported by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSample {
    pub name: String,
    pub field_type: FieldType,
    /// `None` when the field is unset or null
    pub value: Option<FieldValue>,
}

impl FieldSample {
    pub fn new(name: impl Into<String>, field_type: FieldType, value: Option<FieldValue>) -> Self {
        Self { name: name.into(), field_type, value }
    }
}

/// Simplified type label shown in previews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeLabel {
    Integer,
    Float,
    String,
    Date,
}

impl From<FieldType> for TypeLabel {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Integer | FieldType::Integer64 => TypeLabel::Integer,
            FieldType::Real => TypeLabel::Float,
            FieldType::Date | FieldType::DateTime => TypeLabel::Date,
            _ => TypeLabel::String,
        }
    }
}

/// Field entry of a preview document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPreview {
    pub name: String,
    pub value: serde_json::Value,
    #[serde(rename = "type")]
    pub type_label: TypeLabel,
}

impl From<&FieldSample> for FieldPreview {
    fn from(sample: &FieldSample) -> Self {
        let type_label = TypeLabel::from(sample.field_type);
        let value = match &sample.value {
            None => serde_json::Value::Null,
            Some(FieldValue::Integer(v)) => serde_json::Value::from(*v),
            Some(FieldValue::Integer64(v)) => serde_json::Value::from(*v),
            Some(FieldValue::Real(v)) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(v.to_string())),
            Some(other) => serde_json::Value::String(other.to_string()),
        };
        Self { name: sample.name.clone(), value, type_label }
    }
}
