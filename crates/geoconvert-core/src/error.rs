//! Error types for geoconvert

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoconvertError {
    // Input staging errors
    #[error("Failed to materialize input: {reason}")]
    InputMaterialization { reason: String },

    #[error("Failed to open dataset {path}: {reason}")]
    OpenFailure { path: String, reason: String },

    // Driver errors
    #[error("Driver '{driver}' is not available in this engine build")]
    DriverUnavailable { driver: String },

    #[error("Translate to driver '{driver}' failed: {reason}")]
    TranslateFailure { driver: String, reason: String },

    #[error("Conversion to driver '{driver}' produced no output")]
    EmptyOutput { driver: String },

    #[error("Geometry family '{family}' of layer '{layer}' could not be written: {reason}")]
    PartialFamilyFailure {
        layer: String,
        family: String,
        reason: String,
    },

    // CRS errors
    #[error("Could not resolve CRS '{input}': {reason}")]
    CrsResolution { input: String, reason: String },

    #[error("Coordinate transformation failed: {reason}")]
    TransformFailure { reason: String },

    // Request errors
    #[error("Invalid conversion request: {reason}")]
    InvalidRequest { reason: String },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Engine and scratch store errors
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Scratch entry not found: {path}")]
    ScratchNotFound { path: String },

    #[error("Archive error: {0}")]
    Archive(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, GeoconvertError>;
