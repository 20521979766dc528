//! Version command implementation

use super::converter;
use crate::output::OutputWriter;
use crate::output_types::{ConfigEntry, VersionOutput};
use anyhow::Result;
use geoconvert_core::config::LayeredConfig;

pub fn execute(config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let engine = converter(config).engine_version_info();

    let mut entries: Vec<ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry {
            key,
            value,
            source: format!("{:?}", source),
        })
        .collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    if output.is_json() {
        return output.result(VersionOutput {
            version: env!("CARGO_PKG_VERSION").to_string(),
            engine,
            config: entries,
        });
    }

    output.kv("geoconvert", env!("CARGO_PKG_VERSION"));
    output.kv("Engine", engine);

    output.section("Configuration");
    for entry in entries {
        output.kv(entry.key, format!("{} ({})", entry.value, entry.source));
    }

    Ok(())
}
