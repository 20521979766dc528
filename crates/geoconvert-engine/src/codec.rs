//! Format codecs plugged into the in-memory engine
//!
//! A codec decodes a file's bytes into layers and encodes layers back into
//! one or more files. Multi-file formats return their sidecar files as extra
//! entries.

mod csv_codec;
mod geojson_codec;
mod shapefile_codec;

pub use csv_codec::CsvCodec;
pub use geojson_codec::GeoJsonCodec;
pub use shapefile_codec::ShapefileCodec;

use crate::model::MemoryLayer;
use geoconvert_core::models::FieldType;
use geoconvert_core::Result;

/// One encoded output file
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFile {
    /// Extension without the dot; ignored for the first (primary) file,
    /// which is written to the destination path as given
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl EncodedFile {
    pub fn new(extension: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { extension: extension.into(), bytes }
    }
}

/// Layer creation options, keys case-insensitive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreationOptions {
    entries: Vec<(String, String)>,
}

impl CreationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, replacing an earlier value for the same key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// `YES`, `TRUE`, `ON` and `1` count as enabled
    pub fn is_enabled(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| {
            matches!(v.trim().to_ascii_uppercase().as_str(), "YES" | "TRUE" | "ON" | "1")
        })
    }
}

/// A format codec
pub trait VectorCodec: Send + Sync {
    /// Driver identifier, e.g. `GeoJSON`
    fn driver(&self) -> &str;

    /// File extensions (lowercase, no dot) this codec opens
    fn extensions(&self) -> &[&str];

    /// Decode a file; `name` is the default layer name (the file stem)
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<Vec<MemoryLayer>>;

    /// Extensions of companion files read next to the primary file
    fn sidecar_extensions(&self) -> &[&str] {
        &[]
    }

    /// Decode a file with whichever of its sidecars were found
    fn decode_with_sidecars(
        &self,
        name: &str,
        bytes: &[u8],
        _sidecars: &[EncodedFile],
    ) -> Result<Vec<MemoryLayer>> {
        self.decode(name, bytes)
    }

    /// Encode layers; the first returned file is the primary one
    fn encode(&self, layers: &[MemoryLayer], options: &CreationOptions) -> Result<Vec<EncodedFile>>;
}

/// Widen two inferred field types to one that holds both
pub(crate) fn widen(a: FieldType, b: FieldType) -> FieldType {
    use FieldType::*;

    match (a, b) {
        (a, b) if a == b => a,
        (Integer, Integer64) | (Integer64, Integer) => Integer64,
        (Integer | Integer64 | Real, Integer | Integer64 | Real) => Real,
        (Date, DateTime) | (DateTime, Date) => DateTime,
        (IntegerList, Integer64List) | (Integer64List, IntegerList) => Integer64List,
        (
            IntegerList | Integer64List | RealList,
            IntegerList | Integer64List | RealList,
        ) => RealList,
        _ => String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_options_case_insensitive() {
        let mut options = CreationOptions::new();
        options.set("WRITE_BBOX", "YES");
        options.set("write_bbox", "no");
        assert_eq!(options.get("Write_Bbox"), Some("no"));
        assert!(!options.is_enabled("WRITE_BBOX"));
        assert!(options.get("GEOMETRY").is_none());
    }

    #[test]
    fn test_widen() {
        assert_eq!(widen(FieldType::Integer, FieldType::Integer), FieldType::Integer);
        assert_eq!(widen(FieldType::Integer, FieldType::Integer64), FieldType::Integer64);
        assert_eq!(widen(FieldType::Integer64, FieldType::Real), FieldType::Real);
        assert_eq!(widen(FieldType::Date, FieldType::DateTime), FieldType::DateTime);
        assert_eq!(widen(FieldType::Real, FieldType::String), FieldType::String);
        assert_eq!(widen(FieldType::IntegerList, FieldType::RealList), FieldType::RealList);
    }
}
