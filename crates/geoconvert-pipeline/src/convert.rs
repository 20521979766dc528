//! Conversion orchestration
//!
//! Stage input, open it, resolve the CRS policy, build directives, then
//! dispatch: Shapefile output goes through the family splitter, other
//! multi-file formats are packaged after a single translate, and everything
//! else is a single translate read back as bytes.

use geoconvert_core::error::{GeoconvertError, Result};
use geoconvert_core::models::{
    ConversionRequest, CrsIdentifier, FailurePolicy, LayerInfo, TranslateDirective, VectorFormat,
};
use geoconvert_core::ports::{join_path, VectorEngine};
use geoconvert_geo::policy;

use crate::diagnostics::DiagnosticChannel;
use crate::options;
use crate::scratch::{package_directory, ScratchArena};
use crate::splitter::FamilySplitter;

/// Run one conversion and return the output bytes.
///
/// An `Ok` result is never empty. Every scratch path used is released before
/// returning.
pub fn run<E: VectorEngine>(
    engine: &E,
    channel: &DiagnosticChannel,
    scratch_root: &str,
    request: &ConversionRequest,
) -> Result<Vec<u8>> {
    request.validate()?;

    let format = request.output_format;
    let driver = format.driver_id();
    if !engine.has_driver(driver) {
        return Err(GeoconvertError::DriverUnavailable { driver: driver.to_string() });
    }

    let mut arena = ScratchArena::new(engine, scratch_root);
    let input_path = arena.materialize(request.input_format, &request.input)?;
    let dataset = engine.open_dataset(&input_path)?;
    let layers = engine.layers(&dataset)?;
    let Some(first) = layers.first() else {
        return Err(GeoconvertError::OpenFailure {
            path: input_path,
            reason: "dataset has no layers".to_string(),
        });
    };

    check_user_crs(engine, channel, request.source_crs.as_ref());
    check_user_crs(engine, channel, request.target_crs.as_ref());

    let crs = policy::resolve(
        request.source_crs.as_ref(),
        request.target_crs.as_ref(),
        first.has_crs(),
    );
    tracing::debug!(directive = ?crs, embedded = first.has_crs(), "Resolved CRS policy");
    let directives = options::build(format, request, &crs);

    let output = if format.is_shapefile() {
        split_shapefile(engine, channel, &mut arena, request, &dataset, &layers, &directives)?
    } else if format.is_multi_file() {
        let out_dir = arena.path("out");
        let name = output_name(request, first);
        let destination = join_path(&out_dir, &format!("{}.{}", name, format.file_extension()));
        engine.translate(&dataset, &destination, &directives)?;
        package_directory(engine, &out_dir)?
    } else {
        let name = output_name(request, first);
        let destination = arena.path(&format!("{}.{}", name, format.file_extension()));
        engine.translate(&dataset, &destination, &directives)?;
        engine.read_bytes(&destination)?
    };

    if output.is_empty() {
        return Err(GeoconvertError::EmptyOutput { driver: driver.to_string() });
    }
    Ok(output)
}

fn split_shapefile<E: VectorEngine>(
    engine: &E,
    channel: &DiagnosticChannel,
    arena: &mut ScratchArena<'_, E>,
    request: &ConversionRequest,
    dataset: &E::Dataset,
    layers: &[LayerInfo],
    directives: &[TranslateDirective],
) -> Result<Vec<u8>> {
    let out_dir = arena.path("out");
    let outputs = FamilySplitter::new(engine, channel, FailurePolicy::for_output(VectorFormat::Shapefile))
        .only(request.geometry_family)
        .split(dataset, layers, &out_dir, directives, request.layer_name.as_deref())?;

    if outputs.is_empty() {
        return Ok(Vec::new());
    }
    package_directory(engine, &out_dir)
}

fn output_name<'a>(request: &'a ConversionRequest, layer: &'a LayerInfo) -> &'a str {
    request.layer_name.as_deref().unwrap_or(&layer.name)
}

/// Record a warning for a user CRS the engine cannot parse; conversion goes on
fn check_user_crs<E: VectorEngine>(
    engine: &E,
    channel: &DiagnosticChannel,
    crs: Option<&CrsIdentifier>,
) {
    let Some(crs) = crs else { return };
    if let Err(e) = engine.parse_spatial_reference(&crs.as_engine_input()) {
        tracing::warn!(crs = %crs, error = %e, "User CRS could not be resolved");
        channel.record_warning(e.to_string());
    }
}
