//! Coordinate reference system identifiers and directives.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names accepted as well-known CRS shorthands without an authority prefix
const WELL_KNOWN_NAMES: &[&str] = &[
    "WGS84", "WGS 84", "CRS84", "OGC:CRS84", "CRS:84", "NAD83", "NAD27", "ETRS89",
];

/// A user- or dataset-supplied CRS, classified at ingestion
///
/// CRS inputs are open-ended (authority codes, names, WKT, PROJ strings), so
/// the original text is retained for anything that is not an EPSG code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsIdentifier {
    /// `EPSG:<code>`, a bare integer, or an OGC URN carrying an EPSG code
    EpsgCode(u32),
    /// A short well-known name such as `WGS84` or `CRS84`
    WellKnownName(String),
    /// Anything else: WKT, PROJ strings, ESRI names, ...
    RawDefinition(String),
}

impl CrsIdentifier {
    /// Classify a CRS string. Blank input yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(code) = parse_epsg_code(trimmed) {
            return Some(CrsIdentifier::EpsgCode(code));
        }

        if WELL_KNOWN_NAMES.iter().any(|name| name.eq_ignore_ascii_case(trimmed)) {
            return Some(CrsIdentifier::WellKnownName(trimmed.to_string()));
        }

        Some(CrsIdentifier::RawDefinition(trimmed.to_string()))
    }

    /// The string handed to the engine's spatial reference parser
    pub fn as_engine_input(&self) -> String {
        match self {
            CrsIdentifier::EpsgCode(code) => format!("EPSG:{}", code),
            CrsIdentifier::WellKnownName(name) | CrsIdentifier::RawDefinition(name) => {
                name.clone()
            }
        }
    }

    pub fn epsg(&self) -> Option<u32> {
        match self {
            CrsIdentifier::EpsgCode(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for CrsIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_engine_input())
    }
}

fn parse_epsg_code(input: &str) -> Option<u32> {
    if let Ok(code) = input.parse::<u32>() {
        return Some(code);
    }

    let upper = input.to_ascii_uppercase();
    if let Some(rest) = upper.strip_prefix("EPSG:") {
        return rest.trim().parse().ok();
    }

    // urn:ogc:def:crs:EPSG::4326 and urn:ogc:def:crs:EPSG:6.6:4326
    if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
        return upper.rsplit(':').next().and_then(|code| code.parse().ok());
    }

    None
}

/// What to do with coordinates and CRS labels during a translate
///
/// Built once by the CRS policy resolver and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CrsDirective {
    /// Pass through unchanged
    #[default]
    None,
    /// Relabel the output without touching coordinates
    AssignOnly(CrsIdentifier),
    /// Reproject from whatever the dataset claims
    TransformOnly(CrsIdentifier),
    /// Override the dataset's CRS with `source`, then reproject to `target`
    AssignThenTransform {
        source: CrsIdentifier,
        target: CrsIdentifier,
    },
}

impl CrsDirective {
    /// CRS the output is labelled with, if the directive sets one
    pub fn output_crs(&self) -> Option<&CrsIdentifier> {
        match self {
            CrsDirective::None => None,
            CrsDirective::AssignOnly(crs) | CrsDirective::TransformOnly(crs) => Some(crs),
            CrsDirective::AssignThenTransform { target, .. } => Some(target),
        }
    }

    pub fn transforms(&self) -> bool {
        matches!(
            self,
            CrsDirective::TransformOnly(_) | CrsDirective::AssignThenTransform { .. }
        )
    }
}
