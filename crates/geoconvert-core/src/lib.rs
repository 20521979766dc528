//! geoconvert Core - Domain models, configuration, and engine ports
//!
//! This crate contains the core domain types and port definitions shared by the
//! conversion pipeline and the engine adapters.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{GeoconvertError, Result};
