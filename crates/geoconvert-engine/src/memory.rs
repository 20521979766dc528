//! In-memory engine for development and testing.
//!
//! Files live in a path-keyed map; `/vsizip/<archive>/<member>` paths read
//! members of zip archives stored in that map. Locks recover from poisoning
//! since every write replaces whole entries.

mod translate;

use geoconvert_core::error::{GeoconvertError, Result};
use geoconvert_core::models::{ExtentBox, FieldSample, LayerInfo, Severity, TranslateDirective};
use geoconvert_core::ports::{
    MessageHandler, ScratchStore, SpatialReferenceEngine, VectorEngine, ARCHIVE_PREFIX,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::io::{Cursor, Read};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::codec::{CsvCodec, EncodedFile, GeoJsonCodec, ShapefileCodec, VectorCodec};
use crate::model::{MemoryDataset, MemoryLayer};
use crate::predicate::Predicate;
use crate::spatial_ref::MemorySpatialRef;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory implementation of the engine ports
#[derive(Clone)]
pub struct MemoryEngine {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    codecs: Arc<RwLock<Vec<Arc<dyn VectorCodec>>>>,
    references: Arc<RwLock<HashMap<String, (f64, f64)>>>,
    handler: Arc<RwLock<Option<MessageHandler>>>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("files", &read(&self.files).keys().collect::<Vec<_>>())
            .field("drivers", &self.drivers())
            .finish()
    }
}

impl MemoryEngine {
    /// Create an engine with the GeoJSON, CSV and Shapefile codecs
    pub fn new() -> Self {
        let engine = Self::empty();
        engine.register_codec(GeoJsonCodec);
        engine.register_codec(CsvCodec);
        engine.register_codec(ShapefileCodec);
        engine
    }

    /// Create an engine without any codec
    pub fn empty() -> Self {
        Self {
            files: Arc::new(RwLock::new(BTreeMap::new())),
            codecs: Arc::new(RwLock::new(Vec::new())),
            references: Arc::new(RwLock::new(HashMap::new())),
            handler: Arc::new(RwLock::new(None)),
        }
    }

    /// Add a codec; a later codec for the same driver takes precedence
    pub fn register_codec<C: VectorCodec + 'static>(&self, codec: C) {
        let mut codecs = write(&self.codecs);
        codecs.retain(|c| !c.driver().eq_ignore_ascii_case(codec.driver()));
        codecs.push(Arc::new(codec));
    }

    /// Register a named spatial reference offset from WGS84 by `(dx, dy)`
    pub fn register_spatial_reference(&self, name: impl Into<String>, dx: f64, dy: f64) {
        write(&self.references).insert(name.into(), (dx, dy));
    }

    /// Driver identifiers of the registered codecs
    pub fn drivers(&self) -> Vec<String> {
        read(&self.codecs).iter().map(|c| c.driver().to_string()).collect()
    }

    /// Every stored path, sorted
    pub fn paths(&self) -> Vec<String> {
        read(&self.files).keys().cloned().collect()
    }

    fn codec_for_driver(&self, driver: &str) -> Option<Arc<dyn VectorCodec>> {
        read(&self.codecs)
            .iter()
            .find(|c| c.driver().eq_ignore_ascii_case(driver))
            .cloned()
    }

    fn codec_for_path(&self, path: &str) -> Option<Arc<dyn VectorCodec>> {
        let (_, extension) = split_extension(file_name(path));
        let extension = extension?.to_ascii_lowercase();
        read(&self.codecs)
            .iter()
            .find(|c| c.extensions().iter().any(|e| *e == extension))
            .cloned()
    }

    /// Forward a message to the installed handler
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Failure => tracing::debug!("engine failure: {}", message),
        }
        if let Some(handler) = read(&self.handler).as_ref() {
            handler(severity, message);
        }
    }

    /// Emit a failure for an error and hand the error back
    fn fail(&self, error: GeoconvertError) -> GeoconvertError {
        self.emit(Severity::Failure, &error.to_string());
        error
    }

    fn layer<'a>(&self, dataset: &'a MemoryDataset, index: usize) -> Result<&'a MemoryLayer> {
        dataset.layer(index).ok_or_else(|| {
            GeoconvertError::Engine(format!(
                "Layer index {} out of range for '{}' ({} layers)",
                index,
                dataset.path,
                dataset.layers.len()
            ))
        })
    }

    fn read_archive_member(&self, archive: &str, member: &str) -> Result<Vec<u8>> {
        let bytes = self.read_plain(archive)?;
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| GeoconvertError::Archive(format!("{}: {}", archive, e)))?;
        let mut entry = zip
            .by_name(member)
            .map_err(|_| GeoconvertError::ScratchNotFound {
                path: format!("{}{}/{}", ARCHIVE_PREFIX, archive.trim_start_matches('/'), member),
            })?;
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        Ok(content)
    }

    /// Sidecars found next to `path`, lower-case extension first
    fn read_sidecars(&self, path: &str, codec: &dyn VectorCodec) -> Vec<EncodedFile> {
        codec
            .sidecar_extensions()
            .iter()
            .filter_map(|extension| {
                let bytes = self
                    .read_bytes(&sidecar_path(path, extension))
                    .or_else(|_| self.read_bytes(&sidecar_path(path, &extension.to_ascii_uppercase())))
                    .ok()?;
                Some(EncodedFile::new(*extension, bytes))
            })
            .collect()
    }

    fn read_plain(&self, path: &str) -> Result<Vec<u8>> {
        read(&self.files)
            .get(path)
            .cloned()
            .ok_or_else(|| GeoconvertError::ScratchNotFound { path: path.to_string() })
    }
}

impl ScratchStore for MemoryEngine {
    fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()> {
        if path.starts_with(ARCHIVE_PREFIX) {
            return Err(GeoconvertError::Archive(format!(
                "archive members are read-only: {}",
                path
            )));
        }
        write(&self.files).insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        match split_archive_path(path) {
            Some((archive, Some(member))) => self.read_archive_member(&archive, member),
            Some((archive, None)) => self.read_plain(&archive),
            None => self.read_plain(path),
        }
    }

    fn remove(&self, path: &str) -> Result<()> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        write(&self.files).retain(|key, _| key != path && !key.starts_with(&prefix));
        Ok(())
    }

    fn list_entries(&self, dir: &str) -> Result<Vec<String>> {
        if let Some((archive, _)) = split_archive_path(dir) {
            let bytes = self.read_plain(&archive)?;
            let mut zip = zip::ZipArchive::new(Cursor::new(bytes))
                .map_err(|e| GeoconvertError::Archive(format!("{}: {}", archive, e)))?;
            let mut names = Vec::with_capacity(zip.len());
            for index in 0..zip.len() {
                let entry = zip
                    .by_index(index)
                    .map_err(|e| GeoconvertError::Archive(e.to_string()))?;
                if !entry.is_dir() {
                    names.push(entry.name().to_string());
                }
            }
            return Ok(names);
        }

        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let entries: BTreeSet<String> = read(&self.files)
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        Ok(entries.into_iter().collect())
    }
}

impl SpatialReferenceEngine for MemoryEngine {
    type SpatialRef = MemorySpatialRef;

    fn parse_spatial_reference(&self, input: &str) -> Result<MemorySpatialRef> {
        MemorySpatialRef::parse(input, &read(&self.references))
    }

    fn wgs84(&self) -> Result<MemorySpatialRef> {
        Ok(MemorySpatialRef::wgs84())
    }

    fn same_spatial_reference(&self, a: &MemorySpatialRef, b: &MemorySpatialRef) -> bool {
        a == b
    }

    fn transform_points(
        &self,
        points: &[(f64, f64)],
        from: &MemorySpatialRef,
        to: &MemorySpatialRef,
    ) -> Result<Vec<(f64, f64)>> {
        let transformer = from.transformer(to)?;
        points.iter().map(|p| transformer.convert(*p)).collect()
    }
}

impl VectorEngine for MemoryEngine {
    type Dataset = MemoryDataset;

    fn version_info(&self) -> String {
        format!(
            "geoconvert memory engine {} (drivers: {})",
            env!("CARGO_PKG_VERSION"),
            self.drivers().join(", ")
        )
    }

    fn has_driver(&self, driver: &str) -> bool {
        self.codec_for_driver(driver).is_some()
    }

    fn set_message_handler(&self, handler: Option<MessageHandler>) {
        *write(&self.handler) = handler;
    }

    fn open_dataset(&self, path: &str) -> Result<MemoryDataset> {
        let codec = self.codec_for_path(path).ok_or_else(|| {
            self.fail(GeoconvertError::OpenFailure {
                path: path.to_string(),
                reason: "not recognized as a supported file format".to_string(),
            })
        })?;

        let bytes = self.read_bytes(path).map_err(|e| {
            self.fail(GeoconvertError::OpenFailure {
                path: path.to_string(),
                reason: e.to_string(),
            })
        })?;

        let (stem, _) = split_extension(file_name(path));
        let sidecars = self.read_sidecars(path, codec.as_ref());
        let layers = codec
            .decode_with_sidecars(stem, &bytes, &sidecars)
            .map_err(|e| self.fail(e))?;
        tracing::debug!("Opened {} with {} ({} layers)", path, codec.driver(), layers.len());

        Ok(MemoryDataset { path: path.to_string(), driver: codec.driver().to_string(), layers })
    }

    fn layers(&self, dataset: &MemoryDataset) -> Result<Vec<LayerInfo>> {
        Ok(dataset.layers.iter().map(MemoryLayer::info).collect())
    }

    fn count_features(
        &self,
        dataset: &MemoryDataset,
        layer: usize,
        predicate: Option<&str>,
    ) -> Result<u64> {
        let layer = self.layer(dataset, layer)?;
        let count = match predicate {
            Some(clause) => {
                let predicate = Predicate::parse(clause).map_err(|e| self.fail(e))?;
                predicate.validate(layer).map_err(|e| self.fail(e))?;
                layer.features.iter().filter(|f| predicate.matches(layer, f)).count()
            }
            None => layer.features.len(),
        };
        Ok(count as u64)
    }

    fn layer_extent(&self, dataset: &MemoryDataset, layer: usize) -> Result<Option<ExtentBox>> {
        Ok(self.layer(dataset, layer)?.extent())
    }

    fn first_feature(
        &self,
        dataset: &MemoryDataset,
        layer: usize,
    ) -> Result<Option<Vec<FieldSample>>> {
        let layer = self.layer(dataset, layer)?;
        Ok(layer.features.first().map(|f| layer.samples(f)))
    }

    fn translate(
        &self,
        source: &MemoryDataset,
        destination: &str,
        directives: &[TranslateDirective],
    ) -> Result<()> {
        translate::run(self, source, destination, directives).map_err(|e| self.fail(e))
    }
}

/// Split `/vsizip/<archive>.zip[/<member>]` into the archive path and member
fn split_archive_path(path: &str) -> Option<(String, Option<&str>)> {
    let rest = path.strip_prefix(ARCHIVE_PREFIX)?;
    let lower = rest.to_ascii_lowercase();

    let (archive, member) = match lower.find(".zip/") {
        Some(index) => (&rest[..index + 4], Some(&rest[index + 5..])),
        None => (rest.trim_end_matches('/'), None),
    };
    Some((format!("/{}", archive), member.filter(|m| !m.is_empty())))
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Split a file name into stem and extension
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(index) if index > 0 => (&name[..index], Some(&name[index + 1..])),
        _ => (name, None),
    }
}

/// Path of a sidecar file: `destination` with its extension replaced
fn sidecar_path(destination: &str, extension: &str) -> String {
    let name = file_name(destination);
    let dir = &destination[..destination.len() - name.len()];
    let (stem, _) = split_extension(name);
    format!("{}{}.{}", dir, stem, extension)
}
