use geoconvert_core::models::FieldPreview;
use serde::Serialize;
use tabled::Tabled;

/// Output for convert command
#[derive(Debug, Serialize)]
pub struct ConvertOutput {
    pub input: String,
    pub output: String,
    pub input_format: String,
    pub output_format: String,
    pub driver: String,
    pub bytes: usize,
    pub warning: Option<String>,
}

/// Output for version command
#[derive(Debug, Serialize)]
pub struct VersionOutput {
    pub version: String,
    pub engine: String,
    pub config: Vec<ConfigEntry>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: String,
}

/// Table row for a previewed field
#[derive(Debug, Tabled)]
pub struct FieldRow {
    #[tabled(rename = "Field")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub type_label: String,
    #[tabled(rename = "First value")]
    pub value: String,
}

impl From<&FieldPreview> for FieldRow {
    fn from(field: &FieldPreview) -> Self {
        let value = match &field.value {
            serde_json::Value::Null => "(null)".to_string(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            name: field.name.clone(),
            type_label: format!("{:?}", field.type_label),
            value,
        }
    }
}
