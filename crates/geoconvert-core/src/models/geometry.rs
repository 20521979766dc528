//! Geometry kinds, shapefile geometry families, and layer summaries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared geometry type of a layer or a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GeometryKind {
    #[default]
    Unknown,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    /// Layer without geometry (attribute table)
    None,
}

impl GeometryKind {
    /// Display name in the form vector engines conventionally report
    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Unknown => "Unknown (any)",
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "Line String",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPoint => "Multi Point",
            GeometryKind::MultiLineString => "Multi Line String",
            GeometryKind::MultiPolygon => "Multi Polygon",
            GeometryKind::GeometryCollection => "Geometry Collection",
            GeometryKind::None => "None",
        }
    }

    /// Upper-case token used in geometry-type predicates
    pub fn predicate_token(&self) -> &'static str {
        match self {
            GeometryKind::Unknown => "GEOMETRY",
            GeometryKind::Point => "POINT",
            GeometryKind::LineString => "LINESTRING",
            GeometryKind::Polygon => "POLYGON",
            GeometryKind::MultiPoint => "MULTIPOINT",
            GeometryKind::MultiLineString => "MULTILINESTRING",
            GeometryKind::MultiPolygon => "MULTIPOLYGON",
            GeometryKind::GeometryCollection => "GEOMETRYCOLLECTION",
            GeometryKind::None => "NONE",
        }
    }

    pub fn from_predicate_token(token: &str) -> Option<Self> {
        let kind = match token.trim().to_ascii_uppercase().as_str() {
            "POINT" => GeometryKind::Point,
            "LINESTRING" => GeometryKind::LineString,
            "POLYGON" => GeometryKind::Polygon,
            "MULTIPOINT" => GeometryKind::MultiPoint,
            "MULTILINESTRING" => GeometryKind::MultiLineString,
            "MULTIPOLYGON" => GeometryKind::MultiPolygon,
            "GEOMETRYCOLLECTION" => GeometryKind::GeometryCollection,
            "GEOMETRY" => GeometryKind::Unknown,
            "NONE" => GeometryKind::None,
            _ => return None,
        };
        Some(kind)
    }

    /// Multi counterpart, or `self` when there is none
    pub fn to_multi(&self) -> Self {
        match self {
            GeometryKind::Point => GeometryKind::MultiPoint,
            GeometryKind::LineString => GeometryKind::MultiLineString,
            GeometryKind::Polygon => GeometryKind::MultiPolygon,
            other => *other,
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Geometry families a shapefile can hold, one family per file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryFamily {
    Point,
    MultiPoint,
    Line,
    Polygon,
}

impl GeometryFamily {
    /// Processing order of the splitter
    pub const ALL: [GeometryFamily; 4] = [
        GeometryFamily::Point,
        GeometryFamily::MultiPoint,
        GeometryFamily::Line,
        GeometryFamily::Polygon,
    ];

    /// Attribute-filter predicate selecting this family
    pub fn predicate(&self) -> &'static str {
        match self {
            GeometryFamily::Point => "OGR_GEOMETRY='POINT'",
            GeometryFamily::MultiPoint => "OGR_GEOMETRY='MULTIPOINT'",
            GeometryFamily::Line => {
                "OGR_GEOMETRY='LINESTRING' OR OGR_GEOMETRY='MULTILINESTRING'"
            }
            GeometryFamily::Polygon => "OGR_GEOMETRY='POLYGON' OR OGR_GEOMETRY='MULTIPOLYGON'",
        }
    }

    /// Suffix appended to the layer name of the per-family output
    pub fn suffix(&self) -> &'static str {
        match self {
            GeometryFamily::Point => "points",
            GeometryFamily::MultiPoint => "multipoints",
            GeometryFamily::Line => "lines",
            GeometryFamily::Polygon => "polygons",
        }
    }

    /// Lines and polygons are written as their multi type so that single and
    /// multi features share one file. Points and multipoints stay distinct.
    pub fn promotes_to_multi(&self) -> bool {
        matches!(self, GeometryFamily::Line | GeometryFamily::Polygon)
    }

    pub fn contains(&self, kind: GeometryKind) -> bool {
        match self {
            GeometryFamily::Point => kind == GeometryKind::Point,
            GeometryFamily::MultiPoint => kind == GeometryKind::MultiPoint,
            GeometryFamily::Line => {
                matches!(kind, GeometryKind::LineString | GeometryKind::MultiLineString)
            }
            GeometryFamily::Polygon => {
                matches!(kind, GeometryKind::Polygon | GeometryKind::MultiPolygon)
            }
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "point" | "points" => Some(GeometryFamily::Point),
            "multipoint" | "multipoints" => Some(GeometryFamily::MultiPoint),
            "line" | "lines" | "linestring" => Some(GeometryFamily::Line),
            "polygon" | "polygons" => Some(GeometryFamily::Polygon),
            _ => None,
        }
    }
}

impl fmt::Display for GeometryFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Summary of a layer as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub name: String,
    pub geometry_kind: GeometryKind,
    /// Display label of the layer's CRS, `None` if the layer has no CRS
    pub crs_label: Option<String>,
}

impl LayerInfo {
    pub fn has_crs(&self) -> bool {
        self.crs_label.is_some()
    }
}
