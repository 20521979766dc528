//! Per-call scratch arena
//!
//! Every public operation stages its payloads under a unique prefix in the
//! engine's scratch store. The arena records what it allocates and removes
//! all of it when dropped, whichever way the operation exits.

use geoconvert_core::error::{GeoconvertError, Result};
use geoconvert_core::models::VectorFormat;
use geoconvert_core::ports::{join_path, ScratchStore};
use std::io::{Cursor, Write};
use uuid::Uuid;

/// Scoped allocation of scratch-store paths
pub struct ScratchArena<'a, S: ScratchStore + ?Sized> {
    store: &'a S,
    prefix: String,
    allocated: Vec<String>,
}

impl<'a, S: ScratchStore + ?Sized> ScratchArena<'a, S> {
    /// Open an arena under `<root>/<uuid>`
    pub fn new(store: &'a S, root: &str) -> Self {
        let prefix = join_path(root, &Uuid::new_v4().to_string());
        tracing::debug!(prefix = %prefix, "Opened scratch arena");
        Self { store, prefix, allocated: Vec::new() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Reserve a path (file or directory) inside the arena
    pub fn path(&mut self, name: &str) -> String {
        let path = join_path(&self.prefix, name);
        if !self.allocated.contains(&path) {
            self.allocated.push(path.clone());
        }
        path
    }

    /// Write `bytes` to a fresh arena path and return it
    pub fn write(&mut self, name: &str, bytes: &[u8]) -> Result<String> {
        let path = self.path(name);
        self.store.write_bytes(&path, bytes).map_err(|e| {
            GeoconvertError::InputMaterialization {
                reason: format!("could not stage {}: {}", path, e),
            }
        })?;
        Ok(path)
    }

    /// Stage an input payload and return the path the engine should open.
    ///
    /// Shapefile input is a zip archive; the path addresses the first `.shp`
    /// member inside it. Other formats are written under a name carrying the
    /// format's extension.
    pub fn materialize(&mut self, format: VectorFormat, bytes: &[u8]) -> Result<String> {
        if bytes.is_empty() {
            return Err(GeoconvertError::InputMaterialization {
                reason: "input is empty".to_string(),
            });
        }

        if !format.is_shapefile() {
            return self.write(&format!("input.{}", format.file_extension()), bytes);
        }

        let archive = self.write("input.zip", bytes)?;
        let members = self
            .store
            .list_entries(&self.store.archive_path(&archive, None))
            .map_err(|e| GeoconvertError::InputMaterialization {
                reason: format!("input is not a readable archive: {}", e),
            })?;

        let member = members
            .iter()
            .find(|name| name.to_ascii_lowercase().ends_with(".shp"))
            .ok_or_else(|| GeoconvertError::InputMaterialization {
                reason: format!(
                    "no .shp member found in archive ({} entries)",
                    members.len()
                ),
            })?;

        tracing::debug!(member = %member, "Located shapefile inside archive");
        Ok(self.store.archive_path(&archive, Some(member)))
    }

    /// Remove one allocated path and everything below it
    fn release(&self, path: &str) {
        if let Ok(entries) = self.store.list_entries(path) {
            for entry in entries {
                self.release(&join_path(path, &entry));
            }
        }
        if let Err(e) = self.store.remove(path) {
            tracing::warn!(path = %path, error = %e, "Failed to remove scratch entry");
        }
    }
}

impl<S: ScratchStore + ?Sized> Drop for ScratchArena<'_, S> {
    fn drop(&mut self) {
        for path in self.allocated.iter().rev() {
            self.release(path);
        }
        self.release(&self.prefix);
        tracing::debug!(prefix = %self.prefix, "Released scratch arena");
    }
}

/// Package every entry directly under `dir` into one zip archive.
///
/// Entries are added in name order with a fixed timestamp, so identical
/// inputs give identical bytes.
pub fn package_directory<S: ScratchStore + ?Sized>(store: &S, dir: &str) -> Result<Vec<u8>> {
    let mut names = store.list_entries(dir)?;
    if names.is_empty() {
        return Ok(Vec::new());
    }
    names.sort();

    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let archive_error = |e: zip::result::ZipError| GeoconvertError::Archive(e.to_string());
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for name in &names {
        let bytes = store.read_bytes(&join_path(dir, name))?;
        writer.start_file(name.as_str(), options).map_err(archive_error)?;
        writer.write_all(&bytes)?;
    }

    Ok(writer.finish().map_err(archive_error)?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoconvert_engine::MemoryEngine;
    use std::io::Read;

    #[test]
    fn test_arena_cleans_up_on_drop() {
        let engine = MemoryEngine::new();
        engine.write_bytes("/vsimem/keep/me.txt", b"x").unwrap();
        {
            let mut arena = ScratchArena::new(&engine, "/vsimem/geoconvert");
            arena.write("input.geojson", b"{}").unwrap();
            let out = arena.path("out");
            engine.write_bytes(&join_path(&out, "a.shp"), b"a").unwrap();
            engine.write_bytes(&join_path(&out, "a.dbf"), b"b").unwrap();
            assert_eq!(engine.paths().len(), 4);
        }
        assert_eq!(engine.paths(), vec!["/vsimem/keep/me.txt"]);
    }

    #[test]
    fn test_arenas_have_distinct_prefixes() {
        let engine = MemoryEngine::new();
        let a = ScratchArena::new(&engine, "/vsimem/geoconvert");
        let b = ScratchArena::new(&engine, "/vsimem/geoconvert");
        assert_ne!(a.prefix(), b.prefix());
        assert!(a.prefix().starts_with("/vsimem/geoconvert/"));
    }

    #[test]
    fn test_materialize_plain_format() {
        let engine = MemoryEngine::new();
        let mut arena = ScratchArena::new(&engine, "/vsimem/geoconvert");
        let path = arena.materialize(VectorFormat::Csv, b"a,b\n1,2\n").unwrap();
        assert!(path.ends_with("/input.csv"));
        assert!(matches!(
            arena.materialize(VectorFormat::Csv, b""),
            Err(GeoconvertError::InputMaterialization { .. })
        ));
    }

    #[test]
    fn test_materialize_rejects_archive_without_shp() {
        let engine = MemoryEngine::new();
        engine.write_bytes("/vsimem/src/a.txt", b"hello").unwrap();
        let archive = package_directory(&engine, "/vsimem/src").unwrap();

        let mut arena = ScratchArena::new(&engine, "/vsimem/geoconvert");
        let err = arena.materialize(VectorFormat::Shapefile, &archive).unwrap_err();
        assert!(matches!(err, GeoconvertError::InputMaterialization { .. }));
        assert!(err.to_string().contains(".shp"));

        let err = arena.materialize(VectorFormat::Shapefile, b"not a zip").unwrap_err();
        assert!(matches!(err, GeoconvertError::InputMaterialization { .. }));
    }

    #[test]
    fn test_package_directory_is_deterministic() {
        let engine = MemoryEngine::new();
        engine.write_bytes("/vsimem/out/b.dbf", b"dbf").unwrap();
        engine.write_bytes("/vsimem/out/a.shp", b"shp").unwrap();

        let first = package_directory(&engine, "/vsimem/out").unwrap();
        let second = package_directory(&engine, "/vsimem/out").unwrap();
        assert_eq!(first, second);

        let mut archive = zip::ZipArchive::new(Cursor::new(first)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive.by_name("a.shp").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "shp");
        assert!(package_directory(&engine, "/vsimem/empty").unwrap().is_empty());
    }
}
