//! Geometry-family splitter for Shapefile output
//!
//! A shapefile holds a single geometry type, so every source layer is split
//! into one output per non-empty geometry family, named
//! `<layer>_<family suffix>`. Lines and polygons are promoted to their multi
//! type so single and multi features share a file. A layer name override
//! replaces `<layer>`; with several source layers it becomes
//! `<override>_<layer>`.

use geoconvert_core::error::{GeoconvertError, Result};
use geoconvert_core::models::{
    FailurePolicy, GeometryCoercion, GeometryFamily, LayerInfo, TranslateDirective,
};
use geoconvert_core::ports::{join_path, VectorEngine};
use std::collections::HashSet;

use crate::diagnostics::DiagnosticChannel;

/// One per-family output written by the splitter
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyOutput {
    pub layer: String,
    pub family: GeometryFamily,
    pub path: String,
    pub features: u64,
}

/// Splits layers by geometry family
pub struct FamilySplitter<'a, E: VectorEngine> {
    engine: &'a E,
    channel: &'a DiagnosticChannel,
    policy: FailurePolicy,
    families: Vec<GeometryFamily>,
}

impl<'a, E: VectorEngine> FamilySplitter<'a, E> {
    pub fn new(engine: &'a E, channel: &'a DiagnosticChannel, policy: FailurePolicy) -> Self {
        Self { engine, channel, policy, families: GeometryFamily::ALL.to_vec() }
    }

    /// Restrict splitting to one family
    pub fn only(mut self, family: Option<GeometryFamily>) -> Self {
        if let Some(family) = family {
            self.families = vec![family];
        }
        self
    }

    /// Split every layer of `dataset` into `out_dir`.
    ///
    /// `base` holds the request-wide directives (format, creation options,
    /// CRS, user filters); each family adds its own source layer, name,
    /// predicate and geometry coercion.
    pub fn split(
        &self,
        dataset: &E::Dataset,
        layers: &[LayerInfo],
        out_dir: &str,
        base: &[TranslateDirective],
        layer_name: Option<&str>,
    ) -> Result<Vec<FamilyOutput>> {
        let mut outputs = Vec::new();
        let mut written = HashSet::new();

        for (index, layer) in layers.iter().enumerate() {
            let base_name = match layer_name {
                Some(name) if layers.len() > 1 => format!("{}_{}", name, layer.name),
                Some(name) => name.to_string(),
                None => layer.name.clone(),
            };

            for family in &self.families {
                let result = self.split_family(
                    dataset,
                    index,
                    layer,
                    *family,
                    &base_name,
                    out_dir,
                    base,
                    &mut written,
                );
                match result {
                    Ok(Some(output)) => outputs.push(output),
                    Ok(None) => {}
                    Err(e) => self.on_failure(layer, *family, e)?,
                }
            }
        }

        tracing::info!(
            outputs = outputs.len(),
            layers = layers.len(),
            "Split layers by geometry family"
        );
        Ok(outputs)
    }

    #[allow(clippy::too_many_arguments)]
    fn split_family(
        &self,
        dataset: &E::Dataset,
        index: usize,
        layer: &LayerInfo,
        family: GeometryFamily,
        base_name: &str,
        out_dir: &str,
        base: &[TranslateDirective],
        written: &mut HashSet<String>,
    ) -> Result<Option<FamilyOutput>> {
        let count = self.engine.count_features(dataset, index, Some(family.predicate()))?;
        if count == 0 {
            tracing::debug!(layer = %layer.name, family = ?family, "No features; family skipped");
            return Ok(None);
        }

        let name = format!("{}_{}", base_name, family.suffix());
        let path = join_path(out_dir, &format!("{}.shp", name));
        if !written.insert(path.to_ascii_lowercase()) {
            return Err(GeoconvertError::Engine(format!(
                "{} was already written by another layer",
                path
            )));
        }

        let mut directives = base.to_vec();
        directives.push(TranslateDirective::SourceLayer(layer.name.clone()));
        directives.push(TranslateDirective::LayerName(name));
        directives.push(TranslateDirective::Where(family.predicate().to_string()));
        if family.promotes_to_multi() {
            directives.push(TranslateDirective::GeometryType(GeometryCoercion::PromoteToMulti));
        }

        self.engine.translate(dataset, &path, &directives)?;
        tracing::debug!(path = %path, features = count, "Wrote family output");

        Ok(Some(FamilyOutput { layer: layer.name.clone(), family, path, features: count }))
    }

    fn on_failure(&self, layer: &LayerInfo, family: GeometryFamily, error: GeoconvertError) -> Result<()> {
        let partial = GeoconvertError::PartialFamilyFailure {
            layer: layer.name.clone(),
            family: family.suffix().to_string(),
            reason: error.to_string(),
        };

        match self.policy {
            FailurePolicy::ContinueOnError => {
                tracing::warn!("{}", partial);
                self.channel.record_warning(partial.to_string());
                Ok(())
            }
            FailurePolicy::FailFast => Err(partial),
        }
    }
}
