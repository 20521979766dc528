use crate::error::{GeoconvertError, Result};
use crate::models::request::DEFAULT_COORDINATE_PRECISION;
use crate::models::{ConversionRequest, CsvGeometryMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Default scratch namespace root
pub const DEFAULT_SCRATCH_ROOT: &str = "/vsimem/geoconvert";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for geoconvert
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub scratch_root: ConfigValue<String>,
    pub coordinate_precision: ConfigValue<u8>,
    pub csv_geometry: ConfigValue<CsvGeometryMode>,
    pub keep_z: ConfigValue<bool>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            scratch_root: ConfigValue::new(DEFAULT_SCRATCH_ROOT.to_string(), ConfigSource::Default),
            coordinate_precision: ConfigValue::new(
                DEFAULT_COORDINATE_PRECISION,
                ConfigSource::Default,
            ),
            csv_geometry: ConfigValue::new(CsvGeometryMode::Wkt, ConfigSource::Default),
            keep_z: ConfigValue::new(false, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| GeoconvertError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeoconvertError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(scratch_root) = file_config.scratch_root {
            self.scratch_root.update(validate_scratch_root(&scratch_root)?, ConfigSource::File);
        }

        if let Some(precision) = file_config.coordinate_precision {
            self.coordinate_precision.update(precision, ConfigSource::File);
        }

        if let Some(csv_geometry) = file_config.csv_geometry {
            self.csv_geometry.update(parse_csv_geometry(&csv_geometry)?, ConfigSource::File);
        }

        if let Some(keep_z) = file_config.keep_z {
            self.keep_z.update(keep_z, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // GEOCONVERT_SCRATCH_ROOT
        if let Ok(root) = env::var("GEOCONVERT_SCRATCH_ROOT") {
            match validate_scratch_root(&root) {
                Ok(root) => self.scratch_root.update(root, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOCONVERT_SCRATCH_ROOT value '{}': expected an absolute path",
                    root
                ),
            }
        }

        // GEOCONVERT_COORDINATE_PRECISION
        if let Ok(precision_str) = env::var("GEOCONVERT_COORDINATE_PRECISION") {
            match precision_str.trim().parse::<u8>() {
                Ok(precision) => {
                    self.coordinate_precision.update(precision, ConfigSource::Environment)
                }
                Err(_) => tracing::warn!(
                    "Invalid GEOCONVERT_COORDINATE_PRECISION value '{}': expected an integer 0-255",
                    precision_str
                ),
            }
        }

        // GEOCONVERT_CSV_GEOMETRY
        if let Ok(mode_str) = env::var("GEOCONVERT_CSV_GEOMETRY") {
            match parse_csv_geometry(&mode_str) {
                Ok(mode) => self.csv_geometry.update(mode, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOCONVERT_CSV_GEOMETRY value '{}': expected AS_WKT or AS_XY",
                    mode_str
                ),
            }
        }

        // GEOCONVERT_KEEP_Z
        if let Ok(keep_z_str) = env::var("GEOCONVERT_KEEP_Z") {
            match parse_bool(&keep_z_str) {
                Ok(keep_z) => self.keep_z.update(keep_z, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOCONVERT_KEEP_Z value '{}': expected true or false",
                    keep_z_str
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(scratch_root) = overrides.scratch_root {
            self.scratch_root.update(scratch_root, ConfigSource::Cli);
        }

        if let Some(precision) = overrides.coordinate_precision {
            self.coordinate_precision.update(precision, ConfigSource::Cli);
        }

        if let Some(csv_geometry) = overrides.csv_geometry {
            self.csv_geometry.update(csv_geometry, ConfigSource::Cli);
        }

        if let Some(keep_z) = overrides.keep_z {
            self.keep_z.update(keep_z, ConfigSource::Cli);
        }
    }

    /// Copy request-level defaults into a conversion request
    pub fn apply_to_request(&self, request: ConversionRequest) -> ConversionRequest {
        request
            .with_coordinate_precision(self.coordinate_precision.value)
            .with_csv_geometry(self.csv_geometry.value)
            .with_keep_z(self.keep_z.value)
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "scratch_root".to_string(),
            (self.scratch_root.value.clone(), self.scratch_root.source),
        );

        map.insert(
            "coordinate_precision".to_string(),
            (self.coordinate_precision.value.to_string(), self.coordinate_precision.source),
        );

        map.insert(
            "csv_geometry".to_string(),
            (self.csv_geometry.value.to_string(), self.csv_geometry.source),
        );

        map.insert("keep_z".to_string(), (self.keep_z.value.to_string(), self.keep_z.source));

        map
    }
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    scratch_root: Option<String>,
    coordinate_precision: Option<u8>,
    csv_geometry: Option<String>,
    keep_z: Option<bool>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub scratch_root: Option<String>,
    pub coordinate_precision: Option<u8>,
    pub csv_geometry: Option<CsvGeometryMode>,
    pub keep_z: Option<bool>,
}

/// Parse CSV geometry mode from string
pub fn parse_csv_geometry(s: &str) -> Result<CsvGeometryMode> {
    CsvGeometryMode::parse(s).ok_or_else(|| GeoconvertError::ConfigInvalid {
        key: "csv_geometry".to_string(),
        reason: format!("Invalid CSV geometry mode: {}. Use AS_WKT or AS_XY", s),
    })
}

/// Parse a boolean flag from string
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(GeoconvertError::ConfigInvalid {
            key: "keep_z".to_string(),
            reason: format!("Invalid boolean: {}. Use true or false", s),
        }),
    }
}

fn validate_scratch_root(s: &str) -> Result<String> {
    let trimmed = s.trim().trim_end_matches('/');
    if !trimmed.starts_with('/') || trimmed.len() < 2 {
        return Err(GeoconvertError::ConfigInvalid {
            key: "scratch_root".to_string(),
            reason: format!("Scratch root must be an absolute path, got '{}'", s),
        });
    }
    Ok(trimmed.to_string())
}
