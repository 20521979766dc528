//! Format registry.
//!
//! Supported output and input formats form a closed set. Free-form format names
//! coming from callers are resolved once, at the boundary, into a
//! [`VectorFormat`]; everything past that point works with the enum and its
//! static [`FormatDescriptor`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Static description of how a logical format maps onto an engine driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Canonical logical name (lower-case), e.g. `"shapefile"`
    pub logical_name: &'static str,
    /// Engine driver identifier, e.g. `"ESRI Shapefile"`
    pub driver_id: &'static str,
    /// File extension without the leading dot
    pub file_extension: &'static str,
    /// Whether a single dataset is written as several sibling files
    pub is_multi_file: bool,
}

/// Closed set of supported vector formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VectorFormat {
    #[default]
    GeoJson,
    GeoJsonSeq,
    TopoJson,
    Shapefile,
    GeoPackage,
    Kml,
    Gml,
    Gpx,
    Csv,
    FlatGeobuf,
    MapInfo,
    Dxf,
    Sqlite,
}

const GEOJSON: FormatDescriptor = FormatDescriptor {
    logical_name: "geojson",
    driver_id: "GeoJSON",
    file_extension: "geojson",
    is_multi_file: false,
};

impl VectorFormat {
    pub const ALL: [VectorFormat; 13] = [
        VectorFormat::GeoJson,
        VectorFormat::GeoJsonSeq,
        VectorFormat::TopoJson,
        VectorFormat::Shapefile,
        VectorFormat::GeoPackage,
        VectorFormat::Kml,
        VectorFormat::Gml,
        VectorFormat::Gpx,
        VectorFormat::Csv,
        VectorFormat::FlatGeobuf,
        VectorFormat::MapInfo,
        VectorFormat::Dxf,
        VectorFormat::Sqlite,
    ];

    /// Resolve a logical format name.
    ///
    /// Matching is case-insensitive and accepts common aliases. Unknown names
    /// fall back to GeoJSON instead of failing.
    pub fn resolve(name: &str) -> Self {
        Self::lookup(name).unwrap_or_default()
    }

    /// Strict variant of [`VectorFormat::resolve`], `None` for unknown names
    pub fn lookup(name: &str) -> Option<Self> {
        let format = match name.trim().to_lowercase().as_str() {
            "geojson" | "json" => VectorFormat::GeoJson,
            "geojsonseq" | "geojsonl" | "ndgeojson" => VectorFormat::GeoJsonSeq,
            "topojson" => VectorFormat::TopoJson,
            "shapefile" | "shp" | "esri shapefile" => VectorFormat::Shapefile,
            "gpkg" | "geopackage" => VectorFormat::GeoPackage,
            "kml" => VectorFormat::Kml,
            "gml" => VectorFormat::Gml,
            "gpx" => VectorFormat::Gpx,
            "csv" => VectorFormat::Csv,
            "flatgeobuf" | "fgb" => VectorFormat::FlatGeobuf,
            "mapinfo" | "tab" | "mapinfo file" => VectorFormat::MapInfo,
            "dxf" => VectorFormat::Dxf,
            "sqlite" => VectorFormat::Sqlite,
            _ => return None,
        };
        Some(format)
    }

    /// Find the format whose file extension matches `ext` (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.');
        match ext.to_lowercase().as_str() {
            "json" => Some(VectorFormat::GeoJson),
            "zip" => Some(VectorFormat::Shapefile),
            other => Self::ALL
                .into_iter()
                .find(|f| f.descriptor().file_extension == other),
        }
    }

    pub fn descriptor(&self) -> FormatDescriptor {
        match self {
            VectorFormat::GeoJson => GEOJSON,
            VectorFormat::GeoJsonSeq => FormatDescriptor {
                logical_name: "geojsonseq",
                driver_id: "GeoJSONSeq",
                file_extension: "geojsonl",
                is_multi_file: false,
            },
            VectorFormat::TopoJson => FormatDescriptor {
                logical_name: "topojson",
                driver_id: "TopoJSON",
                file_extension: "topojson",
                is_multi_file: false,
            },
            VectorFormat::Shapefile => FormatDescriptor {
                logical_name: "shapefile",
                driver_id: "ESRI Shapefile",
                file_extension: "shp",
                is_multi_file: true,
            },
            VectorFormat::GeoPackage => FormatDescriptor {
                logical_name: "gpkg",
                driver_id: "GPKG",
                file_extension: "gpkg",
                is_multi_file: false,
            },
            VectorFormat::Kml => FormatDescriptor {
                logical_name: "kml",
                driver_id: "KML",
                file_extension: "kml",
                is_multi_file: false,
            },
            VectorFormat::Gml => FormatDescriptor {
                logical_name: "gml",
                driver_id: "GML",
                file_extension: "gml",
                is_multi_file: false,
            },
            VectorFormat::Gpx => FormatDescriptor {
                logical_name: "gpx",
                driver_id: "GPX",
                file_extension: "gpx",
                is_multi_file: false,
            },
            VectorFormat::Csv => FormatDescriptor {
                logical_name: "csv",
                driver_id: "CSV",
                file_extension: "csv",
                is_multi_file: false,
            },
            VectorFormat::FlatGeobuf => FormatDescriptor {
                logical_name: "flatgeobuf",
                driver_id: "FlatGeobuf",
                file_extension: "fgb",
                is_multi_file: false,
            },
            VectorFormat::MapInfo => FormatDescriptor {
                logical_name: "mapinfo",
                driver_id: "MapInfo File",
                file_extension: "tab",
                is_multi_file: true,
            },
            VectorFormat::Dxf => FormatDescriptor {
                logical_name: "dxf",
                driver_id: "DXF",
                file_extension: "dxf",
                is_multi_file: false,
            },
            VectorFormat::Sqlite => FormatDescriptor {
                logical_name: "sqlite",
                driver_id: "SQLite",
                file_extension: "sqlite",
                is_multi_file: false,
            },
        }
    }

    pub fn driver_id(&self) -> &'static str {
        self.descriptor().driver_id
    }

    pub fn file_extension(&self) -> &'static str {
        self.descriptor().file_extension
    }

    pub fn is_multi_file(&self) -> bool {
        self.descriptor().is_multi_file
    }

    /// Shapefile output cannot mix geometry families in one file and input is
    /// delivered as an archive.
    pub fn is_shapefile(&self) -> bool {
        matches!(self, VectorFormat::Shapefile)
    }
}

impl fmt::Display for VectorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor().logical_name)
    }
}
