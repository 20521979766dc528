//! Command implementations

mod convert;
mod info;
mod version;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::{bail, Result};
use geoconvert_core::config::CliConfigOverrides;
use geoconvert_core::models::VectorFormat;
use geoconvert_engine::MemoryEngine;
use geoconvert_pipeline::Converter;
use std::path::Path;

/// Execute a CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let overrides = match &cli.command {
        Commands::Convert(args) => convert::overrides(args)?,
        _ => CliConfigOverrides::default(),
    };
    let overrides = CliConfigOverrides { scratch_root: cli.scratch_root.clone(), ..overrides };
    let config = load_config(cli.config.as_deref(), overrides)?;

    match cli.command {
        Commands::Convert(args) => convert::execute(args, &config, &output),
        Commands::Info(args) => info::execute(args, &config, &output),
        Commands::Version => version::execute(&config, &output),
    }
}

/// Converter over the bundled in-memory engine
fn converter(config: &geoconvert_core::config::LayeredConfig) -> Converter<MemoryEngine> {
    Converter::with_config(MemoryEngine::new(), config)
}

/// Resolve a format from an explicit name or, failing that, a file extension
fn resolve_format(explicit: Option<&str>, path: &Path) -> Result<VectorFormat> {
    if let Some(name) = explicit {
        return match VectorFormat::lookup(name) {
            Some(format) => Ok(format),
            None => bail!("Unknown format '{}'", name),
        };
    }

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match VectorFormat::from_extension(extension) {
        Some(format) => Ok(format),
        None => bail!(
            "Cannot infer the format of {} from its extension; use --from/--to",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_resolve_format() {
        assert_eq!(
            resolve_format(None, &PathBuf::from("roads.GeoJSON")).unwrap(),
            VectorFormat::GeoJson
        );
        assert_eq!(
            resolve_format(None, &PathBuf::from("roads.zip")).unwrap(),
            VectorFormat::Shapefile
        );
        assert_eq!(
            resolve_format(Some("CSV"), &PathBuf::from("roads.txt")).unwrap(),
            VectorFormat::Csv
        );
        assert!(resolve_format(None, &PathBuf::from("roads.txt")).is_err());
        assert!(resolve_format(Some("nope"), &PathBuf::from("roads.csv")).is_err());
    }
}
