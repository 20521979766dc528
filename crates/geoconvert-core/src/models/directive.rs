//! Translate directives.
//!
//! The option builder produces an ordered list of these; engines interpret them
//! while translating. [`TranslateDirective::to_args`] renders the familiar
//! `ogr2ogr`-style argument form, which is what gets logged and what
//! argument-driven engines consume.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate dimensionality of the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Dimension {
    #[default]
    Xy,
    Xyz,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Xy => "XY",
            Dimension::Xyz => "XYZ",
        }
    }
}

/// How the CSV driver encodes geometries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CsvGeometryMode {
    /// A WKT column
    #[default]
    #[serde(rename = "AS_WKT")]
    Wkt,
    /// X and Y columns (points only)
    #[serde(rename = "AS_XY")]
    Xy,
}

impl CsvGeometryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CsvGeometryMode::Wkt => "AS_WKT",
            CsvGeometryMode::Xy => "AS_XY",
        }
    }

    /// Accepts `AS_WKT`/`WKT` and `AS_XY`/`XY`, case-insensitive
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_uppercase().as_str() {
            "AS_WKT" | "WKT" => Some(CsvGeometryMode::Wkt),
            "AS_XY" | "XY" => Some(CsvGeometryMode::Xy),
            _ => None,
        }
    }
}

impl fmt::Display for CsvGeometryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometry type coercion applied to output features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryCoercion {
    /// Single geometries become their multi counterpart
    PromoteToMulti,
}

/// One generic translate instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TranslateDirective {
    /// Output driver
    Format(String),
    Dimension(Dimension),
    ExplodeCollections,
    SkipFailures,
    MakeValid,
    PreserveFid,
    /// Simplification tolerance in layer units, always > 0
    Simplify(f64),
    /// Driver-specific layer creation option
    LayerCreationOption { key: String, value: String },
    /// Label output with a CRS without transforming
    AssignSrs(String),
    /// Override the source CRS used for transformation
    SourceSrs(String),
    /// Reproject to this CRS
    TargetSrs(String),
    /// Rename the output layer
    LayerName(String),
    GeometryType(GeometryCoercion),
    /// Attribute/geometry predicate; several may be present and all apply
    Where(String),
    /// Keep only these fields
    Select(Vec<String>),
    /// Restrict translation to a named source layer
    SourceLayer(String),
}

impl TranslateDirective {
    pub fn creation_option(key: impl Into<String>, value: impl Into<String>) -> Self {
        TranslateDirective::LayerCreationOption { key: key.into(), value: value.into() }
    }

    /// Render as command-line style arguments
    pub fn to_args(&self) -> Vec<String> {
        match self {
            TranslateDirective::Format(driver) => vec!["-f".into(), driver.clone()],
            TranslateDirective::Dimension(dim) => vec!["-dim".into(), dim.as_str().into()],
            TranslateDirective::ExplodeCollections => vec!["-explodecollections".into()],
            TranslateDirective::SkipFailures => vec!["-skipfailures".into()],
            TranslateDirective::MakeValid => vec!["-makevalid".into()],
            TranslateDirective::PreserveFid => vec!["-preserve_fid".into()],
            TranslateDirective::Simplify(tolerance) => {
                vec!["-simplify".into(), tolerance.to_string()]
            }
            TranslateDirective::LayerCreationOption { key, value } => {
                vec!["-lco".into(), format!("{}={}", key, value)]
            }
            TranslateDirective::AssignSrs(crs) => vec!["-a_srs".into(), crs.clone()],
            TranslateDirective::SourceSrs(crs) => vec!["-s_srs".into(), crs.clone()],
            TranslateDirective::TargetSrs(crs) => vec!["-t_srs".into(), crs.clone()],
            TranslateDirective::LayerName(name) => vec!["-nln".into(), name.clone()],
            TranslateDirective::GeometryType(GeometryCoercion::PromoteToMulti) => {
                vec!["-nlt".into(), "PROMOTE_TO_MULTI".into()]
            }
            TranslateDirective::Where(clause) => vec!["-where".into(), clause.clone()],
            TranslateDirective::Select(fields) => vec!["-select".into(), fields.join(",")],
            TranslateDirective::SourceLayer(name) => vec![name.clone()],
        }
    }

    /// Render a whole directive list
    pub fn render(directives: &[TranslateDirective]) -> Vec<String> {
        directives.iter().flat_map(|d| d.to_args()).collect()
    }
}
