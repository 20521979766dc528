//! Byte-addressable scratch store port

use crate::error::Result;

/// Path prefix addressing the inside of a zip-like archive
pub const ARCHIVE_PREFIX: &str = "/vsizip/";

/// Temporary namespace used to stage payloads for the engine
///
/// Paths are plain strings with `/` separators. The store is shared by every
/// operation on an engine; callers are responsible for choosing disjoint
/// prefixes.
pub trait ScratchStore: Send + Sync {
    /// Create or replace the entry at `path`
    fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read an entry; archive member paths are accepted
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    /// Remove an entry. Removing a missing entry is not an error.
    fn remove(&self, path: &str) -> Result<()>;

    /// Names of the entries directly under `dir`. For an archive path
    /// (see [`ScratchStore::archive_path`]) every member name is returned.
    fn list_entries(&self, dir: &str) -> Result<Vec<String>>;

    /// Address an archive, or a member inside it
    fn archive_path(&self, archive: &str, member: Option<&str>) -> String {
        let archive = archive.trim_start_matches('/');
        match member {
            Some(member) => format!("{}{}/{}", ARCHIVE_PREFIX, archive, member),
            None => format!("{}{}", ARCHIVE_PREFIX, archive),
        }
    }
}

/// Join a directory and an entry name with a single `/`
pub fn join_path(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
}
