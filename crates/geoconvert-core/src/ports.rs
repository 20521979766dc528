//! Port trait definitions
//!
//! These traits define the surface of the vector I/O engine that adapters
//! must implement.

pub mod engine;
pub mod scratch;

pub use engine::{MessageHandler, SpatialReferenceEngine, VectorEngine};
pub use scratch::{join_path, ScratchStore, ARCHIVE_PREFIX};
