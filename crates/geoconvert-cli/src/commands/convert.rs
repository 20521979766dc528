//! Convert command implementation

use super::{converter, resolve_format};
use crate::cli::ConvertArgs;
use crate::output::OutputWriter;
use crate::output_types::ConvertOutput;
use anyhow::{bail, Context, Result};
use geoconvert_core::config::{parse_csv_geometry, CliConfigOverrides, LayeredConfig};
use geoconvert_core::models::{ConversionRequest, ConversionResult, GeometryFamily};
use std::fs;

/// Configuration values the convert flags override
pub fn overrides(args: &ConvertArgs) -> Result<CliConfigOverrides> {
    let csv_geometry = args
        .csv_geometry
        .as_deref()
        .map(parse_csv_geometry)
        .transpose()
        .context("Invalid --csv-geometry")?;

    Ok(CliConfigOverrides {
        coordinate_precision: args.precision,
        csv_geometry,
        keep_z: args.keep_z.then_some(true),
        ..Default::default()
    })
}

/// Message worth showing next to a written output. A failure recorded on a
/// successful result is a partial failure, e.g. a skipped shapefile family.
fn success_notice(result: &ConversionResult) -> Option<String> {
    result.diagnostic.as_ref().map(|d| d.text.clone())
}

pub fn execute(args: ConvertArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let input_format = resolve_format(args.from.as_deref(), &args.input)?;
    let output_format = resolve_format(args.to.as_deref(), &args.output)?;

    if args.output.exists() && !args.force {
        bail!("{} already exists. Use --force to overwrite.", args.output.display());
    }

    let bytes = fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let mut request = ConversionRequest::new(
        bytes,
        input_format.descriptor().logical_name,
        output_format.descriptor().logical_name,
    );
    request = config
        .apply_to_request(request)
        .with_simplify(args.simplify)
        .with_explode_collections(args.explode)
        .with_skip_failures(args.skip_failures)
        .with_fields(args.select.iter().filter(|f| !f.trim().is_empty()).cloned());

    if let Some(crs) = &args.s_srs {
        request = request.with_source_crs(crs);
    }
    if let Some(crs) = &args.t_srs {
        request = request.with_target_crs(crs);
    }
    if let Some(clause) = &args.where_clause {
        request = request.with_where(clause.clone());
    }
    if let Some(name) = &args.layer_name {
        request = request.with_layer_name(name.clone());
    }
    if let Some(family) = &args.family {
        let Some(family) = GeometryFamily::parse(family) else {
            bail!("Unknown geometry family '{}'. Use point, multipoint, line or polygon", family);
        };
        request = request.with_geometry_family(family);
    }

    let converter = converter(config);
    let result = converter.convert(&request);
    if !result.is_success() {
        bail!("Conversion failed: {}", converter.last_error());
    }

    fs::write(&args.output, &result.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let warning = success_notice(&result);

    if output.is_json() {
        output.result(ConvertOutput {
            input: args.input.display().to_string(),
            output: args.output.display().to_string(),
            input_format: input_format.to_string(),
            output_format: output_format.to_string(),
            driver: result.driver,
            bytes: result.output.len(),
            warning,
        })?;
    } else {
        if let Some(warning) = &warning {
            output.warning(warning);
        }
        output.success(format!(
            "Converted {} ({}) to {} ({}, {} bytes)",
            args.input.display(),
            input_format,
            args.output.display(),
            result.driver,
            result.output.len()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoconvert_core::models::DiagnosticMessage;

    fn result(diagnostic: Option<DiagnosticMessage>) -> ConversionResult {
        ConversionResult { output: b"PK".to_vec(), driver: "ESRI Shapefile".to_string(), diagnostic }
    }

    #[test]
    fn test_partial_failure_is_shown_with_output() {
        let partial = DiagnosticMessage::failure("layer 'mixed', family 'polygons' failed");
        assert_eq!(
            success_notice(&result(Some(partial))).as_deref(),
            Some("layer 'mixed', family 'polygons' failed")
        );
        assert_eq!(
            success_notice(&result(Some(DiagnosticMessage::warning("CRS not found")))).as_deref(),
            Some("CRS not found")
        );
        assert_eq!(success_notice(&result(None)), None);
    }
}
