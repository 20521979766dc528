//! Info command implementation

use super::{converter, resolve_format};
use crate::cli::InfoArgs;
use crate::output::OutputWriter;
use crate::output_types::FieldRow;
use anyhow::{bail, Context, Result};
use geoconvert_core::config::LayeredConfig;
use geoconvert_core::models::{ExtentBox, PreviewResponse};
use std::fs;

fn format_extent(extent: &ExtentBox) -> String {
    format!(
        "({:.6}, {:.6}) - ({:.6}, {:.6})",
        extent.min_x, extent.min_y, extent.max_x, extent.max_y
    )
}

pub fn execute(args: InfoArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let format = resolve_format(args.from.as_deref(), &args.input)?;
    let bytes = fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let converter = converter(config);
    let response = converter.preview(&bytes, format.descriptor().logical_name, args.s_srs.as_deref());
    let doc = match response {
        PreviewResponse::Document(doc) => doc,
        PreviewResponse::Error { error, .. } => bail!("Preview failed: {}", error),
    };

    if output.is_json() {
        return output.result(&doc);
    }

    output.section(format!("Dataset: {}", args.input.display()));
    output.kv("Format", format);
    output.kv("Layers", doc.layers);
    if doc.layers == 0 {
        output.info("Dataset has no layers");
        return Ok(());
    }
    if let Some(name) = &doc.layer_name {
        output.kv("Layer", name);
    }
    if let Some(count) = doc.feature_count {
        output.kv("Features", count);
    }
    if let Some(geometry_type) = &doc.geometry_type {
        output.kv("Geometry", geometry_type);
    }
    output.kv("CRS", if doc.crs.is_empty() { "(none)" } else { doc.crs.as_str() });

    if let Some(extent) = &doc.extent {
        output.kv("Extent", format_extent(extent));
    }
    if doc.reprojected {
        if let Some(extent) = &doc.extent_wgs84 {
            output.kv("Extent (WGS84, approx.)", format_extent(extent));
        }
    }
    if let Some(trace) = &doc.extent_trace {
        tracing::debug!("Extent estimate: {}", trace);
    }

    output.section("Fields");
    output.table(doc.fields.iter().map(FieldRow::from).collect());

    if let Some(warning) = &doc.warning {
        output.warning(warning);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_extent() {
        let extent = ExtentBox::new(-1.5, 2.0, 3.25, 4.0);
        assert_eq!(
            format_extent(&extent),
            "(-1.500000, 2.000000) - (3.250000, 4.000000)"
        );
    }
}
