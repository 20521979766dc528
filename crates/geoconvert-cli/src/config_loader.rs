//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use geoconvert_core::config::{CliConfigOverrides, LayeredConfig};
use std::path::{Path, PathBuf};

/// File picked up from the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "geoconvert.toml";

/// Load layered configuration: defaults, file, environment, then CLI
pub fn load_config(explicit: Option<&Path>, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    if let Some(path) = config_path(explicit) {
        config = config
            .load_from_file(&path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
    }

    let mut config = config.load_from_env();
    config.update_from_cli(overrides);
    Ok(config)
}

fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        }
    }
}
