//! Conversion requests and results.

use serde::{Deserialize, Serialize};

use super::crs::CrsIdentifier;
use super::diagnostic::DiagnosticMessage;
use super::directive::CsvGeometryMode;
use super::format::VectorFormat;
use super::geometry::GeometryFamily;
use crate::error::{GeoconvertError, Result};

/// Default number of decimals written by coordinate-precision aware drivers
pub const DEFAULT_COORDINATE_PRECISION: u8 = 15;

/// A single format conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub input: Vec<u8>,
    pub input_format: VectorFormat,
    pub output_format: VectorFormat,
    pub source_crs: Option<CrsIdentifier>,
    pub target_crs: Option<CrsIdentifier>,
    pub layer_name: Option<String>,
    pub geometry_family: Option<GeometryFamily>,
    pub where_clause: Option<String>,
    pub fields: Option<Vec<String>>,
    /// Simplification tolerance, 0 disables simplification
    pub simplify_tolerance: f64,
    pub explode_collections: bool,
    pub preserve_fid: bool,
    pub skip_failures: bool,
    pub make_valid: bool,
    pub keep_z: bool,
    pub coordinate_precision: u8,
    pub csv_geometry: CsvGeometryMode,
}

impl ConversionRequest {
    /// Create a request; format names are resolved here, unknown names fall
    /// back to GeoJSON.
    pub fn new(input: impl Into<Vec<u8>>, input_format: &str, output_format: &str) -> Self {
        Self {
            input: input.into(),
            input_format: VectorFormat::resolve(input_format),
            output_format: VectorFormat::resolve(output_format),
            source_crs: None,
            target_crs: None,
            layer_name: None,
            geometry_family: None,
            where_clause: None,
            fields: None,
            simplify_tolerance: 0.0,
            explode_collections: false,
            preserve_fid: false,
            skip_failures: false,
            make_valid: false,
            keep_z: false,
            coordinate_precision: DEFAULT_COORDINATE_PRECISION,
            csv_geometry: CsvGeometryMode::Wkt,
        }
    }

    /// Blank strings are treated as "not given"
    pub fn with_source_crs(mut self, crs: &str) -> Self {
        self.source_crs = CrsIdentifier::parse(crs);
        self
    }

    pub fn with_target_crs(mut self, crs: &str) -> Self {
        self.target_crs = CrsIdentifier::parse(crs);
        self
    }

    pub fn with_layer_name(mut self, name: impl Into<String>) -> Self {
        self.layer_name = Some(name.into()).filter(|n: &String| !n.trim().is_empty());
        self
    }

    pub fn with_geometry_family(mut self, family: GeometryFamily) -> Self {
        self.geometry_family = Some(family);
        self
    }

    pub fn with_where(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into()).filter(|c: &String| !c.trim().is_empty());
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.fields = if fields.is_empty() { None } else { Some(fields) };
        self
    }

    pub fn with_simplify(mut self, tolerance: f64) -> Self {
        self.simplify_tolerance = tolerance;
        self
    }

    pub fn with_explode_collections(mut self, explode: bool) -> Self {
        self.explode_collections = explode;
        self
    }

    pub fn with_preserve_fid(mut self, preserve: bool) -> Self {
        self.preserve_fid = preserve;
        self
    }

    pub fn with_skip_failures(mut self, skip: bool) -> Self {
        self.skip_failures = skip;
        self
    }

    pub fn with_make_valid(mut self, make_valid: bool) -> Self {
        self.make_valid = make_valid;
        self
    }

    pub fn with_keep_z(mut self, keep_z: bool) -> Self {
        self.keep_z = keep_z;
        self
    }

    pub fn with_coordinate_precision(mut self, precision: u8) -> Self {
        self.coordinate_precision = precision;
        self
    }

    pub fn with_csv_geometry(mut self, mode: CsvGeometryMode) -> Self {
        self.csv_geometry = mode;
        self
    }

    /// Check request invariants
    pub fn validate(&self) -> Result<()> {
        if !self.simplify_tolerance.is_finite() || self.simplify_tolerance < 0.0 {
            return Err(GeoconvertError::InvalidRequest {
                reason: format!(
                    "simplify tolerance must be a finite value >= 0, got {}",
                    self.simplify_tolerance
                ),
            });
        }
        if self.input.is_empty() {
            return Err(GeoconvertError::InvalidRequest {
                reason: "input is empty".to_string(),
            });
        }
        Ok(())
    }
}

/// How a multi-step translate reacts to a failing step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Abort on the first failed translate
    FailFast,
    /// Skip the failed step, keep partial results
    ContinueOnError,
}

impl FailurePolicy {
    /// Shapefile family splitting keeps partial results; single translates
    /// abort.
    pub fn for_output(format: VectorFormat) -> Self {
        if format.is_shapefile() {
            FailurePolicy::ContinueOnError
        } else {
            FailurePolicy::FailFast
        }
    }
}

/// Outcome of a conversion; empty output signals failure
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversionResult {
    pub output: Vec<u8>,
    pub driver: String,
    pub diagnostic: Option<DiagnosticMessage>,
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        !self.output.is_empty()
    }
}
