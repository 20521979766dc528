//! Bounding boxes and their WGS84 estimates.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in some CRS
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtentBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ExtentBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Grow this box to cover `other`
    pub fn union(&self, other: &ExtentBox) -> ExtentBox {
        ExtentBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }
}

/// Result of estimating an extent in WGS84
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtentEstimate {
    pub extent: ExtentBox,
    /// `false` when the input was returned unchanged
    pub reprojected: bool,
    /// Human readable account of how the estimate was produced
    pub trace: String,
}

impl ExtentEstimate {
    pub fn unchanged(extent: ExtentBox, trace: impl Into<String>) -> Self {
        Self { extent, reprojected: false, trace: trace.into() }
    }
}
