//! Preview document returned by metadata extraction.

use serde::{Deserialize, Serialize};

use super::diagnostic::DiagnosticMessage;
use super::extent::ExtentBox;
use super::field::FieldPreview;

/// Structured preview of a dataset's first layer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewDocument {
    pub layers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<String>,
    /// Display label; a user-supplied CRS wins over the dataset's own
    pub crs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<ExtentBox>,
    /// Extent estimated in WGS84 (equal to `extent` when not reprojected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent_wgs84: Option<ExtentBox>,
    pub reprojected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent_trace: Option<String>,
    pub fields: Vec<FieldPreview>,
    /// Non-fatal diagnostic collected while building the preview
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Either a preview or the error that prevented it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreviewResponse {
    Document(PreviewDocument),
    Error {
        error: String,
        #[serde(skip)]
        diagnostic: Option<DiagnosticMessage>,
    },
}

impl PreviewResponse {
    pub fn error(message: impl Into<String>, diagnostic: Option<DiagnosticMessage>) -> Self {
        PreviewResponse::Error { error: message.into(), diagnostic }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PreviewResponse::Error { .. })
    }

    pub fn document(&self) -> Option<&PreviewDocument> {
        match self {
            PreviewResponse::Document(doc) => Some(doc),
            PreviewResponse::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PreviewResponse::Document(_) => None,
            PreviewResponse::Error { error, .. } => Some(error),
        }
    }

    /// JSON object form: the document itself, or `{"error": "..."}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_shape() {
        let response = PreviewResponse::error("Failed to open dataset", None);
        assert_eq!(response.to_json(), serde_json::json!({ "error": "Failed to open dataset" }));
        assert!(response.is_error());
    }

    #[test]
    fn test_document_shape() {
        let doc = PreviewDocument {
            layers: 1,
            feature_count: Some(1),
            geometry_type: Some("Point".to_string()),
            crs: "EPSG:4326".to_string(),
            ..Default::default()
        };
        let json = PreviewResponse::Document(doc).to_json();
        assert_eq!(json["layers"], 1);
        assert_eq!(json["featureCount"], 1);
        assert_eq!(json["geometryType"], "Point");
        assert!(json.get("extent").is_none());
        assert!(json.get("error").is_none());
    }
}
