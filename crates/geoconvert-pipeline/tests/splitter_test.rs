//! Shapefile output split by geometry family

mod common;

use common::{engine, shapefile_member, zip_member, zip_members, RejectingShapefile, MIXED};
use geoconvert_core::models::{
    ConversionRequest, FailurePolicy, GeometryFamily, GeometryKind, Severity, TranslateDirective,
};
use geoconvert_core::ports::{ScratchStore, VectorEngine};
use geoconvert_core::GeoconvertError;
use geoconvert_engine::{GeoJsonCodec, MemoryDataset, MemoryEngine, VectorCodec};
use geoconvert_pipeline::{Converter, DiagnosticChannel, FamilySplitter};

fn shp_members(members: &[String]) -> Vec<&str> {
    members.iter().map(String::as_str).filter(|m| m.ends_with(".shp")).collect()
}

/// Shape type code from a `.shp` header: 1 point, 3 polyline, 5 polygon
fn shape_type(engine: &MemoryEngine, archive: &[u8], member: &str) -> i32 {
    let bytes = zip_member(engine, archive, member);
    i32::from_le_bytes([bytes[32], bytes[33], bytes[34], bytes[35]])
}

/// MIXED decoded once per name, as layers of one dataset
fn multi_layer_dataset(names: &[&str]) -> MemoryDataset {
    let layers = names
        .iter()
        .map(|name| {
            let mut layer = GeoJsonCodec.decode(name, MIXED.as_bytes()).unwrap().remove(0);
            layer.name = name.to_string();
            layer
        })
        .collect();
    MemoryDataset { path: "/vsimem/src/multi.geojson".to_string(), driver: "GeoJSON".to_string(), layers }
}

#[test]
fn test_split_skips_empty_families_and_promotes() {
    let engine = engine();
    let converter = Converter::new(engine.clone());

    let result = converter.convert(&ConversionRequest::new(MIXED, "geojson", "shapefile"));
    assert!(result.is_success(), "conversion failed: {}", converter.last_error());
    assert_eq!(result.driver, "ESRI Shapefile");

    let members = zip_members(&engine, &result.output);
    assert_eq!(
        shp_members(&members),
        vec!["mixed_lines.shp", "mixed_points.shp", "mixed_polygons.shp"]
    );
    assert!(!members.iter().any(|m| m.contains("multipoint")));
    assert!(members.contains(&"mixed_points.prj".to_string()));

    assert_eq!(shape_type(&engine, &result.output, "mixed_points.shp"), 1);
    assert_eq!(shape_type(&engine, &result.output, "mixed_lines.shp"), 3);
    assert_eq!(shape_type(&engine, &result.output, "mixed_polygons.shp"), 5);
    assert!(engine.paths().is_empty());

    let points = shapefile_member(&engine, &result.output, "mixed_points.shp");
    assert_eq!(points.features.len(), 3);
    assert_eq!(points.crs.as_deref(), Some("EPSG:4326"));
    let lines = shapefile_member(&engine, &result.output, "mixed_lines.shp");
    assert_eq!(lines.features.len(), 5);
    assert_eq!(lines.fields[0].name, "id");
    let multi = lines.features.iter().filter(|f| f.geometry_kind() == GeometryKind::MultiLineString);
    assert_eq!(multi.count(), 1);
    let polygons = shapefile_member(&engine, &result.output, "mixed_polygons.shp");
    assert_eq!(polygons.features.len(), 2);
}

#[test]
fn test_split_uses_layer_name_override_and_family_filter() {
    let engine = engine();
    let converter = Converter::new(engine.clone());
    let request = ConversionRequest::new(MIXED, "geojson", "shapefile")
        .with_layer_name("roads")
        .with_geometry_family(GeometryFamily::Line);

    let result = converter.convert(&request);
    assert!(result.is_success(), "conversion failed: {}", converter.last_error());
    assert_eq!(
        zip_members(&engine, &result.output),
        vec!["roads_lines.dbf", "roads_lines.prj", "roads_lines.shp", "roads_lines.shx"]
    );
}

#[test]
fn test_split_with_only_empty_families_is_empty_output() {
    let engine = engine();
    let converter = Converter::new(engine);
    let request = ConversionRequest::new(MIXED, "geojson", "shapefile")
        .with_geometry_family(GeometryFamily::MultiPoint);

    let result = converter.convert(&request);
    assert!(!result.is_success());
    assert!(converter.last_error().contains("produced no output"));
    assert!(converter.last_error().contains("ESRI Shapefile"));
}

#[test]
fn test_continue_on_error_keeps_other_families() {
    let engine = MemoryEngine::new();
    engine.register_codec(RejectingShapefile(GeometryKind::MultiPolygon));
    let converter = Converter::new(engine.clone());

    let result = converter.convert(&ConversionRequest::new(MIXED, "geojson", "shapefile"));
    assert!(result.is_success(), "conversion failed: {}", converter.last_error());

    let members = zip_members(&engine, &result.output);
    assert_eq!(shp_members(&members), vec!["mixed_lines.shp", "mixed_points.shp"]);
    assert!(converter.last_error().contains("MultiPolygon"));
    let diagnostic = result.diagnostic.expect("partial failure is reported with the output");
    assert!(diagnostic.text.contains("MultiPolygon"));
}

#[test]
fn test_fail_fast_aborts_on_first_family_failure() {
    let engine = MemoryEngine::new();
    engine.register_codec(RejectingShapefile(GeometryKind::MultiLineString));
    engine.write_bytes("/vsimem/src/mixed.geojson", MIXED.as_bytes()).unwrap();
    let dataset = engine.open_dataset("/vsimem/src/mixed.geojson").unwrap();
    let layers = engine.layers(&dataset).unwrap();
    let base = [TranslateDirective::Format("ESRI Shapefile".to_string())];

    let channel = DiagnosticChannel::new();
    let err = FamilySplitter::new(&engine, &channel, FailurePolicy::FailFast)
        .split(&dataset, &layers, "/vsimem/out", &base, None)
        .unwrap_err();
    assert!(matches!(
        err,
        GeoconvertError::PartialFamilyFailure { ref family, .. } if family == "lines"
    ));
    assert!(engine.read_bytes("/vsimem/out/mixed_polygons.shp").is_err());

    let outputs = FamilySplitter::new(&engine, &channel, FailurePolicy::ContinueOnError)
        .split(&dataset, &layers, "/vsimem/out2", &base, None)
        .unwrap();
    let families: Vec<GeometryFamily> = outputs.iter().map(|o| o.family).collect();
    assert_eq!(families, vec![GeometryFamily::Point, GeometryFamily::Polygon]);
    assert_eq!(outputs[1].features, 2);
    assert_eq!(channel.last().map(|m| m.severity), Some(Severity::Warning));
}

#[test]
fn test_layer_name_override_is_qualified_per_layer() {
    let engine = MemoryEngine::new();
    let dataset = multi_layer_dataset(&["roads", "rivers"]);
    let layers = engine.layers(&dataset).unwrap();
    let base = [TranslateDirective::Format("ESRI Shapefile".to_string())];

    let channel = DiagnosticChannel::new();
    let outputs = FamilySplitter::new(&engine, &channel, FailurePolicy::FailFast)
        .only(Some(GeometryFamily::Point))
        .split(&dataset, &layers, "/vsimem/out", &base, Some("water"))
        .unwrap();
    let paths: Vec<&str> = outputs.iter().map(|o| o.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["/vsimem/out/water_roads_points.shp", "/vsimem/out/water_rivers_points.shp"]
    );
    assert!(channel.last().is_none());
}

#[test]
fn test_layers_writing_the_same_output_do_not_overwrite() {
    let engine = MemoryEngine::new();
    let dataset = multi_layer_dataset(&["mixed", "MIXED"]);
    let layers = engine.layers(&dataset).unwrap();
    let base = [TranslateDirective::Format("ESRI Shapefile".to_string())];

    let channel = DiagnosticChannel::new();
    let outputs = FamilySplitter::new(&engine, &channel, FailurePolicy::ContinueOnError)
        .only(Some(GeometryFamily::Point))
        .split(&dataset, &layers, "/vsimem/out", &base, None)
        .unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].layer, "mixed");

    let warning = channel.last().unwrap();
    assert_eq!(warning.severity, Severity::Warning);
    assert!(warning.text.contains("already written"));
}
