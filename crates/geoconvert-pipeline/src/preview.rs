//! Metadata extraction for previews

use geoconvert_core::error::Result;
use geoconvert_core::models::{FieldPreview, PreviewDocument, VectorFormat};
use geoconvert_core::ports::VectorEngine;
use geoconvert_geo::extent;

use crate::diagnostics::DiagnosticChannel;
use crate::scratch::ScratchArena;

/// Describe the first layer of `input`.
///
/// A user CRS label is shown in place of the dataset's own label, and is used
/// for the WGS84 extent estimate even if the engine cannot parse it.
pub fn extract<E: VectorEngine>(
    engine: &E,
    channel: &DiagnosticChannel,
    scratch_root: &str,
    input: &[u8],
    input_format: VectorFormat,
    source_crs: Option<&str>,
) -> Result<PreviewDocument> {
    let mut arena = ScratchArena::new(engine, scratch_root);
    let path = arena.materialize(input_format, input)?;
    let dataset = engine.open_dataset(&path)?;
    let layers = engine.layers(&dataset)?;

    let user_label = source_crs.map(str::trim).filter(|label| !label.is_empty());
    if let Some(label) = user_label {
        if let Err(e) = engine.parse_spatial_reference(label) {
            tracing::warn!(crs = %label, error = %e, "Preview CRS could not be resolved");
            channel.record_warning(e.to_string());
        }
    }

    let mut doc = PreviewDocument { layers: layers.len(), ..Default::default() };
    let Some(layer) = layers.first() else {
        doc.crs = user_label.unwrap_or_default().to_string();
        doc.warning = channel.last().map(|m| m.text);
        return Ok(doc);
    };

    doc.layer_name = Some(layer.name.clone());
    doc.feature_count = Some(engine.count_features(&dataset, 0, None)?);
    doc.geometry_type = Some(layer.geometry_kind.name().to_string());
    doc.crs = user_label
        .map(str::to_string)
        .or_else(|| layer.crs_label.clone())
        .unwrap_or_default();

    if let Some(bounds) = engine.layer_extent(&dataset, 0)? {
        let estimate = extent::estimate(engine, &bounds, &doc.crs);
        doc.extent = Some(bounds);
        doc.extent_wgs84 = Some(estimate.extent);
        doc.reprojected = estimate.reprojected;
        doc.extent_trace = Some(estimate.trace);
    }

    doc.fields = engine
        .first_feature(&dataset, 0)?
        .map(|samples| samples.iter().map(FieldPreview::from).collect())
        .unwrap_or_default();
    doc.warning = channel.last().map(|m| m.text);

    tracing::debug!(
        layer = %layer.name,
        features = ?doc.feature_count,
        fields = doc.fields.len(),
        "Extracted preview"
    );
    Ok(doc)
}
