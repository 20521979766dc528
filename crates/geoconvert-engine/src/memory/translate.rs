//! Directive interpretation for [`MemoryEngine::translate`]

use geo::{
    Coord, Geometry, LineString, MapCoords, MultiLineString, MultiPoint, MultiPolygon, Simplify,
};
use geoconvert_core::error::{GeoconvertError, Result};
use geoconvert_core::models::{GeometryCoercion, Severity, TranslateDirective};
use geoconvert_core::ports::{ScratchStore, SpatialReferenceEngine};

use super::{sidecar_path, MemoryEngine};
use crate::codec::CreationOptions;
use crate::model::{MemoryDataset, MemoryFeature, MemoryLayer};
use crate::predicate::{matches_all, Predicate};
use crate::spatial_ref::Transformer;

/// Directives folded into one plan
#[derive(Debug, Default)]
struct TranslatePlan {
    driver: Option<String>,
    explode: bool,
    skip_failures: bool,
    preserve_fid: bool,
    simplify: Option<f64>,
    creation_options: CreationOptions,
    assign_srs: Option<String>,
    source_srs: Option<String>,
    target_srs: Option<String>,
    layer_name: Option<String>,
    promote_to_multi: bool,
    predicates: Vec<String>,
    select: Option<Vec<String>>,
    source_layers: Vec<String>,
}

impl TranslatePlan {
    fn from_directives(directives: &[TranslateDirective]) -> Self {
        let mut plan = TranslatePlan::default();
        for directive in directives {
            match directive {
                TranslateDirective::Format(driver) => plan.driver = Some(driver.clone()),
                // 2D storage: both dimensions write XY
                TranslateDirective::Dimension(_) => {}
                TranslateDirective::ExplodeCollections => plan.explode = true,
                TranslateDirective::SkipFailures => plan.skip_failures = true,
                // Geometries are stored as parsed; nothing to repair
                TranslateDirective::MakeValid => {}
                TranslateDirective::PreserveFid => plan.preserve_fid = true,
                TranslateDirective::Simplify(tolerance) => plan.simplify = Some(*tolerance),
                TranslateDirective::LayerCreationOption { key, value } => {
                    plan.creation_options.set(key.clone(), value.clone())
                }
                TranslateDirective::AssignSrs(crs) => plan.assign_srs = Some(crs.clone()),
                TranslateDirective::SourceSrs(crs) => plan.source_srs = Some(crs.clone()),
                TranslateDirective::TargetSrs(crs) => plan.target_srs = Some(crs.clone()),
                TranslateDirective::LayerName(name) => plan.layer_name = Some(name.clone()),
                TranslateDirective::GeometryType(GeometryCoercion::PromoteToMulti) => {
                    plan.promote_to_multi = true
                }
                TranslateDirective::Where(clause) => plan.predicates.push(clause.clone()),
                TranslateDirective::Select(fields) => plan.select = Some(fields.clone()),
                TranslateDirective::SourceLayer(name) => plan.source_layers.push(name.clone()),
            }
        }
        plan
    }
}

/// Per-layer coordinate handling
enum Reprojection {
    None,
    Transform(Transformer),
}

pub(super) fn run(
    engine: &MemoryEngine,
    source: &MemoryDataset,
    destination: &str,
    directives: &[TranslateDirective],
) -> Result<()> {
    let plan = TranslatePlan::from_directives(directives);

    let driver = plan.driver.clone().ok_or_else(|| GeoconvertError::TranslateFailure {
        driver: String::new(),
        reason: "no output driver requested".to_string(),
    })?;
    let codec = engine
        .codec_for_driver(&driver)
        .ok_or_else(|| GeoconvertError::DriverUnavailable { driver: driver.clone() })?;

    let layers: Vec<&MemoryLayer> = if plan.source_layers.is_empty() {
        source.layers.iter().collect()
    } else {
        plan.source_layers
            .iter()
            .map(|name| {
                source.layers.iter().find(|l| &l.name == name).ok_or_else(|| {
                    GeoconvertError::TranslateFailure {
                        driver: driver.clone(),
                        reason: format!("Couldn't fetch requested layer '{}'", name),
                    }
                })
            })
            .collect::<Result<_>>()?
    };

    let predicates = plan
        .predicates
        .iter()
        .map(|clause| Predicate::parse(clause))
        .collect::<Result<Vec<_>>>()?;

    let parse = |input: &Option<String>| {
        input.as_deref().map(|crs| engine.parse_spatial_reference(crs)).transpose()
    };
    let target = parse(&plan.target_srs)?;
    let source_override = parse(&plan.source_srs)?;
    let assigned = parse(&plan.assign_srs)?;

    let mut outputs = Vec::with_capacity(layers.len());
    for layer in layers {
        for predicate in &predicates {
            predicate.validate(layer)?;
        }

        let reprojection = match &target {
            Some(to) => {
                let from = match (&source_override, &layer.crs) {
                    (Some(from), _) => from.clone(),
                    (None, Some(label)) => engine.parse_spatial_reference(label)?,
                    (None, None) => {
                        return Err(GeoconvertError::TransformFailure {
                            reason: format!(
                                "Can't transform coordinates, source layer '{}' has no coordinate system. \
                                 Use a source CRS to set one.",
                                layer.name
                            ),
                        })
                    }
                };
                Reprojection::Transform(from.transformer(to)?)
            }
            None => Reprojection::None,
        };

        let output_crs = match (&target, &assigned) {
            (Some(to), _) => Some(to.label()),
            (None, Some(assigned)) => Some(assigned.label()),
            (None, None) => layer.crs.clone(),
        };

        outputs.push(translate_layer(
            engine,
            &plan,
            layer,
            &predicates,
            &reprojection,
            output_crs,
        )?);
    }

    let files = codec.encode(&outputs, &plan.creation_options)?;
    for (index, file) in files.iter().enumerate() {
        let path = if index == 0 {
            destination.to_string()
        } else {
            sidecar_path(destination, &file.extension)
        };
        engine.write_bytes(&path, &file.bytes)?;
    }

    tracing::debug!(
        "Translated {} layer(s) to {} at {} ({} file(s))",
        outputs.len(),
        driver,
        destination,
        files.len()
    );
    Ok(())
}

fn translate_layer(
    engine: &MemoryEngine,
    plan: &TranslatePlan,
    layer: &MemoryLayer,
    predicates: &[Predicate],
    reprojection: &Reprojection,
    crs: Option<String>,
) -> Result<MemoryLayer> {
    let columns: Vec<usize> = match &plan.select {
        Some(names) => names
            .iter()
            .map(|name| {
                layer.field_index(name).ok_or_else(|| {
                    GeoconvertError::Engine(format!(
                        "Field '{}' not found in source layer '{}'",
                        name, layer.name
                    ))
                })
            })
            .collect::<Result<_>>()?,
        None => (0..layer.fields.len()).collect(),
    };

    let mut features = Vec::new();
    let mut next_fid = 0i64;

    for feature in layer.features.iter().filter(|f| matches_all(predicates, layer, f)) {
        let geometries = match process_geometry(plan, reprojection, feature.geometry.as_ref()) {
            Ok(geometries) => geometries,
            Err(e) if plan.skip_failures => {
                engine.emit(
                    Severity::Warning,
                    &format!("Skipping feature {} of layer '{}': {}", feature.fid, layer.name, e),
                );
                continue;
            }
            Err(e) => return Err(e),
        };

        let values: Vec<_> = columns
            .iter()
            .map(|&i| feature.values.get(i).cloned().flatten())
            .collect();

        for geometry in geometries {
            let fid = if plan.preserve_fid { feature.fid } else { next_fid };
            next_fid += 1;
            features.push(MemoryFeature::new(fid, geometry, values.clone()));
        }
    }

    let declared_kind = match (plan.promote_to_multi, layer.geometry_kind()) {
        (true, kind) => Some(kind.to_multi()),
        (false, _) => None,
    }
    .filter(|_| features.is_empty());

    Ok(MemoryLayer {
        name: plan.layer_name.clone().unwrap_or_else(|| layer.name.clone()),
        crs,
        fields: columns.iter().map(|&i| layer.fields[i].clone()).collect(),
        features,
        declared_kind,
    })
}

/// Reproject, simplify, explode, and coerce one geometry. Exploding can
/// yield several output geometries; a feature without geometry yields one
/// `None`.
fn process_geometry(
    plan: &TranslatePlan,
    reprojection: &Reprojection,
    geometry: Option<&Geometry<f64>>,
) -> Result<Vec<Option<Geometry<f64>>>> {
    let Some(geometry) = geometry else {
        return Ok(vec![None]);
    };

    let mut geometry = match reprojection {
        Reprojection::None => geometry.clone(),
        Reprojection::Transform(transformer) => geometry.try_map_coords(|c: Coord<f64>| {
            transformer.convert((c.x, c.y)).map(|(x, y)| Coord { x, y })
        })?,
    };

    if let Some(tolerance) = plan.simplify {
        geometry = simplify(geometry, tolerance);
    }

    let parts = if plan.explode { explode(geometry) } else { vec![geometry] };

    Ok(parts
        .into_iter()
        .map(|g| if plan.promote_to_multi { promote(g) } else { g })
        .map(Some)
        .collect())
}

fn simplify(geometry: Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    match geometry {
        Geometry::LineString(g) => Geometry::LineString(g.simplify(tolerance)),
        Geometry::MultiLineString(g) => Geometry::MultiLineString(g.simplify(tolerance)),
        Geometry::Polygon(g) => Geometry::Polygon(g.simplify(tolerance)),
        Geometry::MultiPolygon(g) => Geometry::MultiPolygon(g.simplify(tolerance)),
        Geometry::GeometryCollection(g) => Geometry::GeometryCollection(
            g.into_iter().map(|member| simplify(member, tolerance)).collect(),
        ),
        other => other,
    }
}

fn explode(geometry: Geometry<f64>) -> Vec<Geometry<f64>> {
    match geometry {
        Geometry::MultiPoint(g) => g.into_iter().map(Geometry::Point).collect(),
        Geometry::MultiLineString(g) => g.into_iter().map(Geometry::LineString).collect(),
        Geometry::MultiPolygon(g) => g.into_iter().map(Geometry::Polygon).collect(),
        Geometry::GeometryCollection(g) => g.into_iter().flat_map(explode).collect(),
        other => vec![other],
    }
}

fn promote(geometry: Geometry<f64>) -> Geometry<f64> {
    match geometry {
        Geometry::Point(p) => Geometry::MultiPoint(MultiPoint::new(vec![p])),
        Geometry::Line(l) => Geometry::MultiLineString(MultiLineString::new(vec![LineString::from(
            vec![l.start, l.end],
        )])),
        Geometry::LineString(l) => Geometry::MultiLineString(MultiLineString::new(vec![l])),
        Geometry::Polygon(p) => Geometry::MultiPolygon(MultiPolygon::new(vec![p])),
        Geometry::Rect(r) => Geometry::MultiPolygon(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Geometry::MultiPolygon(MultiPolygon::new(vec![t.to_polygon()])),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon};

    #[test]
    fn test_plan_collects_directives() {
        let plan = TranslatePlan::from_directives(&[
            TranslateDirective::Format("CSV".to_string()),
            TranslateDirective::creation_option("GEOMETRY", "AS_XY"),
            TranslateDirective::Where("a = 1".to_string()),
            TranslateDirective::Where("b = 2".to_string()),
            TranslateDirective::GeometryType(GeometryCoercion::PromoteToMulti),
        ]);
        assert_eq!(plan.driver.as_deref(), Some("CSV"));
        assert_eq!(plan.creation_options.get("geometry"), Some("AS_XY"));
        assert_eq!(plan.predicates.len(), 2);
        assert!(plan.promote_to_multi);
    }

    #[test]
    fn test_explode_flattens_collections() {
        let multi = Geometry::MultiPoint(MultiPoint::new(vec![
            point!(x: 0.0, y: 0.0),
            point!(x: 1.0, y: 1.0),
        ]));
        let collection = Geometry::GeometryCollection(geo::GeometryCollection::new_from(vec![
            multi,
            line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 2.0)].into(),
        ]));
        let parts = explode(collection);
        assert_eq!(parts.len(), 3);
        assert!(matches!(parts[2], Geometry::LineString(_)));
    }

    #[test]
    fn test_promote_single_types() {
        let polygon: Geometry<f64> =
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)].into();
        assert!(matches!(promote(polygon), Geometry::MultiPolygon(ref m) if m.0.len() == 1));
        let line: Geometry<f64> = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into();
        assert!(matches!(promote(line), Geometry::MultiLineString(_)));
        let multi = Geometry::MultiPoint(MultiPoint::new(vec![point!(x: 0.0, y: 0.0)]));
        assert_eq!(promote(multi.clone()), multi);
    }

    #[test]
    fn test_simplify_drops_collinear_vertices() {
        let line: Geometry<f64> =
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.001), (x: 2.0, y: 0.0)].into();
        match simplify(line, 0.01) {
            Geometry::LineString(simplified) => assert_eq!(simplified.0.len(), 2),
            other => panic!("unexpected geometry {:?}", other),
        }
    }
}
