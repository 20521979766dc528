//! CRS label helpers

use geoconvert_core::models::CrsIdentifier;

/// Substrings that mark a CRS label as WGS84 without asking the engine
const WGS84_MARKERS: &[&str] = &["epsg:4326", "wgs84", "wgs 84"];

/// Cheap lexical WGS84 check on a free-form label (case-insensitive)
pub fn is_wgs84_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    WGS84_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Check if two classified CRS identifiers name the same CRS.
///
/// EPSG codes compare numerically; other forms compare case-insensitively on
/// their trimmed text.
pub fn crs_match(a: &CrsIdentifier, b: &CrsIdentifier) -> bool {
    match (a, b) {
        (CrsIdentifier::EpsgCode(x), CrsIdentifier::EpsgCode(y)) => x == y,
        _ => a.as_engine_input().trim().eq_ignore_ascii_case(b.as_engine_input().trim()),
    }
}
