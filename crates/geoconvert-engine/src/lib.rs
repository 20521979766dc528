//! geoconvert Engine - Engine adapters
//!
//! This crate provides an in-memory implementation of the engine ports for
//! development and testing: a scratch store with zip-archive addressing,
//! GeoJSON, CSV and Shapefile codecs, attribute predicates, and PROJ-backed
//! spatial references.

pub mod codec;
pub mod memory;
pub mod model;
pub mod predicate;
pub mod spatial_ref;

pub use codec::{CreationOptions, CsvCodec, EncodedFile, GeoJsonCodec, ShapefileCodec, VectorCodec};
pub use memory::MemoryEngine;
pub use model::{FieldDefn, MemoryDataset, MemoryFeature, MemoryLayer};
pub use spatial_ref::MemorySpatialRef;
