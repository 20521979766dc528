//! Spatial references understood by the in-memory engine
//!
//! Definitions are resolved and transformed with PROJ. Named references
//! registered on the engine as a constant offset from WGS84 stand in for
//! local grids in tests.

use geoconvert_core::models::CrsIdentifier;
use geoconvert_core::{GeoconvertError, Result};
use proj::Proj;
use std::collections::HashMap;

/// Definition every WGS84 alias resolves to
pub const WGS84_DEFINITION: &str = "EPSG:4326";

#[derive(Debug, Clone, PartialEq)]
pub enum MemorySpatialRef {
    /// A definition PROJ resolves: authority code, PROJ string, or WKT
    Proj { definition: String },
    /// WGS84 shifted by `(dx, dy)`: `wgs84 = local + offset`
    Offset { name: String, dx: f64, dy: f64 },
}

impl MemorySpatialRef {
    pub fn wgs84() -> Self {
        MemorySpatialRef::Proj { definition: WGS84_DEFINITION.to_string() }
    }

    /// Parse a CRS string against the registered references, then PROJ
    pub fn parse(input: &str, registered: &HashMap<String, (f64, f64)>) -> Result<Self> {
        let identifier = CrsIdentifier::parse(input).ok_or_else(|| GeoconvertError::CrsResolution {
            input: input.to_string(),
            reason: "empty spatial reference".to_string(),
        })?;

        if let CrsIdentifier::RawDefinition(raw) = &identifier {
            if let Some((name, (dx, dy))) =
                registered.iter().find(|(name, _)| name.eq_ignore_ascii_case(raw))
            {
                return Ok(MemorySpatialRef::Offset { name: name.clone(), dx: *dx, dy: *dy });
            }
        }

        let definition = canonical_definition(&identifier);
        Proj::new_known_crs(&definition, WGS84_DEFINITION, None).map_err(|e| {
            GeoconvertError::CrsResolution {
                input: input.to_string(),
                reason: format!("unsupported or unrecognized spatial reference: {}", e),
            }
        })?;

        Ok(MemorySpatialRef::Proj { definition })
    }

    /// Canonical label written into dataset CRS metadata
    pub fn label(&self) -> String {
        match self {
            MemorySpatialRef::Proj { definition } => definition.clone(),
            MemorySpatialRef::Offset { name, .. } => name.clone(),
        }
    }

    /// Prepare a transformation from `self` into `target`
    pub fn transformer(&self, target: &MemorySpatialRef) -> Result<Transformer> {
        let mut steps = Vec::new();
        if self != target {
            let from = match self {
                MemorySpatialRef::Offset { dx, dy, .. } => {
                    steps.push(Step::Shift(*dx, *dy));
                    WGS84_DEFINITION
                }
                MemorySpatialRef::Proj { definition } => definition.as_str(),
            };
            let (to, last) = match target {
                MemorySpatialRef::Offset { dx, dy, .. } => (WGS84_DEFINITION, Some(Step::Shift(-dx, -dy))),
                MemorySpatialRef::Proj { definition } => (definition.as_str(), None),
            };

            if from != to {
                let proj = Proj::new_known_crs(from, to, None).map_err(|e| {
                    GeoconvertError::TransformFailure {
                        reason: format!("Failed to create projection from {} to {}: {}", from, to, e),
                    }
                })?;
                steps.push(Step::Project(proj));
            }
            steps.extend(last);
        }

        Ok(Transformer { steps, target: target.label() })
    }

    /// Transform one point from `self` into `target`
    pub fn transform_to(&self, target: &MemorySpatialRef, point: (f64, f64)) -> Result<(f64, f64)> {
        self.transformer(target)?.convert(point)
    }
}

fn canonical_definition(identifier: &CrsIdentifier) -> String {
    match identifier {
        CrsIdentifier::EpsgCode(code) => format!("EPSG:{}", code),
        CrsIdentifier::WellKnownName(name) => match name.to_ascii_uppercase().as_str() {
            "NAD83" => "EPSG:4269".to_string(),
            "NAD27" => "EPSG:4267".to_string(),
            "ETRS89" => "EPSG:4258".to_string(),
            // WGS84 and the CRS84 spellings share lon/lat axis order once normalized
            _ => WGS84_DEFINITION.to_string(),
        },
        CrsIdentifier::RawDefinition(raw) => {
            let compact = raw.to_ascii_lowercase().replace(' ', "");
            if (compact.contains("+proj=longlat") && compact.contains("+datum=wgs84"))
                || compact.contains("urn:ogc:def:crs:ogc:1.3:crs84")
            {
                WGS84_DEFINITION.to_string()
            } else {
                raw.clone()
            }
        }
    }
}

enum Step {
    Shift(f64, f64),
    Project(Proj),
}

/// A prepared point transformation in traditional GIS axis order
pub struct Transformer {
    steps: Vec<Step>,
    target: String,
}

impl Transformer {
    pub fn convert(&self, point: (f64, f64)) -> Result<(f64, f64)> {
        let mut current = point;
        for step in &self.steps {
            current = match step {
                Step::Shift(dx, dy) => (current.0 + dx, current.1 + dy),
                Step::Project(proj) => proj.convert(current).map_err(|e| {
                    GeoconvertError::TransformFailure {
                        reason: format!(
                            "Projection of ({}, {}) to {} failed: {}",
                            point.0, point.1, self.target, e
                        ),
                    }
                })?,
            };
        }

        if !current.0.is_finite() || !current.1.is_finite() {
            return Err(GeoconvertError::TransformFailure {
                reason: format!(
                    "point ({}, {}) is outside the domain of {}",
                    point.0, point.1, self.target
                ),
            });
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<MemorySpatialRef> {
        MemorySpatialRef::parse(input, &HashMap::new())
    }

    fn proj(definition: &str) -> MemorySpatialRef {
        MemorySpatialRef::Proj { definition: definition.to_string() }
    }

    #[test]
    fn test_parse_canonicalizes_wgs84_aliases() {
        assert_eq!(parse("EPSG:4326").unwrap(), MemorySpatialRef::wgs84());
        assert_eq!(parse("4326").unwrap(), MemorySpatialRef::wgs84());
        assert_eq!(parse("CRS84").unwrap(), MemorySpatialRef::wgs84());
        assert_eq!(parse("wgs84").unwrap(), MemorySpatialRef::wgs84());
        assert_eq!(
            parse("+proj=longlat +datum=WGS84 +no_defs").unwrap(),
            MemorySpatialRef::wgs84()
        );
        assert_eq!(parse("urn:ogc:def:crs:EPSG::3857").unwrap(), proj("EPSG:3857"));
    }

    #[test]
    fn test_parse_accepts_projected_codes() {
        assert_eq!(parse("EPSG:32633").unwrap(), proj("EPSG:32633"));
        assert_eq!(parse("EPSG:2193").unwrap().label(), "EPSG:2193");
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(matches!(parse("EPSG:999999"), Err(GeoconvertError::CrsResolution { .. })));
        assert!(parse("not a crs").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn test_parse_registered_offset() {
        let mut registered = HashMap::new();
        registered.insert("LOCAL:GRID".to_string(), (100.0, -5.0));
        let parsed = MemorySpatialRef::parse("local:grid", &registered).unwrap();
        assert_eq!(
            parsed,
            MemorySpatialRef::Offset { name: "LOCAL:GRID".to_string(), dx: 100.0, dy: -5.0 }
        );
        assert_eq!(
            parsed.transform_to(&MemorySpatialRef::wgs84(), (1.0, 2.0)).unwrap(),
            (101.0, -3.0)
        );
    }

    #[test]
    fn test_web_mercator_round_trip() {
        let merc = proj("EPSG:3857");
        let wgs = MemorySpatialRef::wgs84();

        let (x, y) = wgs.transform_to(&merc, (180.0, 0.0)).unwrap();
        assert!((x - 20_037_508.342_789_244).abs() < 1e-3);
        assert!(y.abs() < 1e-3);

        let projected = wgs.transform_to(&merc, (2.35, 48.85)).unwrap();
        let (lon, lat) = merc.transform_to(&wgs, projected).unwrap();
        assert!((lon - 2.35).abs() < 1e-9);
        assert!((lat - 48.85).abs() < 1e-9);
    }

    #[test]
    fn test_utm_uses_lon_lat_order() {
        let utm = proj("EPSG:32633");
        let (lon, lat) = utm
            .transform_to(&MemorySpatialRef::wgs84(), (500_000.0, 0.0))
            .unwrap();
        assert!((lon - 15.0).abs() < 1e-9);
        assert!(lat.abs() < 1e-9);
    }

    #[test]
    fn test_offset_to_projected_goes_through_wgs84() {
        let local = MemorySpatialRef::Offset { name: "LOCAL".to_string(), dx: 15.0, dy: 0.0 };
        let (x, y) = local.transform_to(&proj("EPSG:32633"), (0.0, 0.0)).unwrap();
        assert!((x - 500_000.0).abs() < 1e-3);
        assert!(y.abs() < 1e-3);
    }

    #[test]
    fn test_pole_is_outside_mercator() {
        let result = MemorySpatialRef::wgs84().transform_to(&proj("EPSG:3857"), (0.0, 90.0));
        assert!(matches!(result, Err(GeoconvertError::TransformFailure { .. })));
    }
}
