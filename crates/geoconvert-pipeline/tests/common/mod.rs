//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use geoconvert_core::error::{GeoconvertError, Result};
use geoconvert_core::models::GeometryKind;
use geoconvert_core::ports::{join_path, ScratchStore, VectorEngine};
use geoconvert_engine::{
    CreationOptions, EncodedFile, GeoJsonCodec, MemoryEngine, MemoryLayer, ShapefileCodec, VectorCodec,
};
use geoconvert_pipeline::scratch::package_directory;

/// MapInfo-like codec double. The `.tab` file holds GeoJSON; the `.id`
/// sidecar carries the field names and `.dat` the CRS label.
pub struct MapInfoCodec;

impl VectorCodec for MapInfoCodec {
    fn driver(&self) -> &str {
        "MapInfo File"
    }

    fn extensions(&self) -> &[&str] {
        &["tab"]
    }

    fn decode(&self, name: &str, bytes: &[u8]) -> Result<Vec<MemoryLayer>> {
        GeoJsonCodec.decode(name, bytes)
    }

    fn encode(&self, layers: &[MemoryLayer], options: &CreationOptions) -> Result<Vec<EncodedFile>> {
        let [layer] = layers else {
            return Err(GeoconvertError::Engine(format!(
                "MapInfo File writes one layer per file, got {}",
                layers.len()
            )));
        };

        let mut files = GeoJsonCodec.encode(layers, options)?;
        let fields: Vec<&str> = layer.fields.iter().map(|f| f.name.as_str()).collect();
        files.push(EncodedFile::new("map", Vec::new()));
        files.push(EncodedFile::new("id", fields.join(",").into_bytes()));
        files.push(EncodedFile::new("dat", layer.crs.clone().unwrap_or_default().into_bytes()));
        Ok(files)
    }
}

/// The real Shapefile codec, failing for layers of one geometry kind
pub struct RejectingShapefile(pub GeometryKind);

impl VectorCodec for RejectingShapefile {
    fn driver(&self) -> &str {
        "ESRI Shapefile"
    }

    fn extensions(&self) -> &[&str] {
        &["shp"]
    }

    fn sidecar_extensions(&self) -> &[&str] {
        &["shx", "dbf", "prj"]
    }

    fn decode(&self, name: &str, bytes: &[u8]) -> Result<Vec<MemoryLayer>> {
        ShapefileCodec.decode(name, bytes)
    }

    fn decode_with_sidecars(
        &self,
        name: &str,
        bytes: &[u8],
        sidecars: &[EncodedFile],
    ) -> Result<Vec<MemoryLayer>> {
        ShapefileCodec.decode_with_sidecars(name, bytes, sidecars)
    }

    fn encode(&self, layers: &[MemoryLayer], options: &CreationOptions) -> Result<Vec<EncodedFile>> {
        if let Some(layer) = layers.iter().find(|l| l.geometry_kind() == self.0) {
            return Err(GeoconvertError::Engine(format!(
                "{:?} geometries are not supported (layer '{}')",
                self.0, layer.name
            )));
        }
        ShapefileCodec.encode(layers, options)
    }
}

/// Engine with the MapInfo double registered next to the bundled codecs
pub fn engine() -> MemoryEngine {
    let engine = MemoryEngine::new();
    engine.register_codec(MapInfoCodec);
    engine
}

/// Zip a GeoJSON document as the components of `<stem>.shp`
pub fn shapefile_archive(engine: &MemoryEngine, stem: &str, geojson: &str) -> Vec<u8> {
    let layers = GeoJsonCodec.decode(stem, geojson.as_bytes()).unwrap();
    let files = ShapefileCodec.encode(&layers, &CreationOptions::new()).unwrap();
    let names: Vec<String> = files.iter().map(|f| format!("{}.{}", stem, f.extension)).collect();
    let entries: Vec<(&str, &[u8])> = names
        .iter()
        .zip(&files)
        .map(|(name, file)| (name.as_str(), file.bytes.as_slice()))
        .collect();
    zip_entries(engine, &entries)
}

/// Open one `.shp` member of a zip archive through the engine
pub fn shapefile_member(engine: &MemoryEngine, archive: &[u8], member: &str) -> MemoryLayer {
    let path = "/vsimem/inspect/shapes.zip";
    engine.write_bytes(path, archive).unwrap();
    let dataset = engine.open_dataset(&engine.archive_path(path, Some(member))).unwrap();
    engine.remove("/vsimem/inspect").unwrap();
    dataset.layers.into_iter().next().unwrap()
}

pub const CITY: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","geometry":{"type":"Point","coordinates":[2.35,48.85]},"properties":{"name":"city","population":1000}}
]}"#;

/// 3 points, no multipoint, 5 lines (two of them multi), 2 polygons
pub const MIXED: &str = r#"{"type":"FeatureCollection","name":"mixed","features":[
    {"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]},"properties":{"id":1}},
    {"type":"Feature","geometry":{"type":"Point","coordinates":[1,0]},"properties":{"id":2}},
    {"type":"Feature","geometry":{"type":"Point","coordinates":[2,0]},"properties":{"id":3}},
    {"type":"Feature","geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]},"properties":{"id":4}},
    {"type":"Feature","geometry":{"type":"LineString","coordinates":[[1,1],[2,2]]},"properties":{"id":5}},
    {"type":"Feature","geometry":{"type":"LineString","coordinates":[[2,2],[3,3]]},"properties":{"id":6}},
    {"type":"Feature","geometry":{"type":"MultiLineString","coordinates":[[[0,1],[1,2]],[[2,3],[3,4]]]},"properties":{"id":7}},
    {"type":"Feature","geometry":{"type":"MultiLineString","coordinates":[[[5,5],[6,6]]]},"properties":{"id":8}},
    {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]},"properties":{"id":9}},
    {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[2,2],[3,2],[3,3],[2,2]]]},"properties":{"id":10}}
]}"#;

/// Zip the given `(name, bytes)` entries using the engine's scratch store
pub fn zip_entries(engine: &MemoryEngine, entries: &[(&str, &[u8])]) -> Vec<u8> {
    let dir = "/vsimem/fixture";
    for (name, bytes) in entries {
        engine.write_bytes(&join_path(dir, name), bytes).unwrap();
    }
    let archive = package_directory(engine, dir).unwrap();
    engine.remove(dir).unwrap();
    archive
}

/// Names of the members of a zip archive, in archive order
pub fn zip_members(engine: &MemoryEngine, archive: &[u8]) -> Vec<String> {
    let path = "/vsimem/inspect/out.zip";
    engine.write_bytes(path, archive).unwrap();
    let members = engine.list_entries(&engine.archive_path(path, None)).unwrap();
    engine.remove("/vsimem/inspect").unwrap();
    members
}

/// Read one member of a zip archive
pub fn zip_member(engine: &MemoryEngine, archive: &[u8], member: &str) -> Vec<u8> {
    let path = "/vsimem/inspect/out.zip";
    engine.write_bytes(path, archive).unwrap();
    let bytes = engine.read_bytes(&engine.archive_path(path, Some(member))).unwrap();
    engine.remove("/vsimem/inspect").unwrap();
    bytes
}
