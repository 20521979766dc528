//! End-to-end conversions through the `Converter` facade

mod common;

use common::{engine, shapefile_archive, zip_entries, zip_member, zip_members, CITY, MIXED};
use geoconvert_core::config::LayeredConfig;
use geoconvert_core::models::{ConversionRequest, CsvGeometryMode, Severity};
use geoconvert_engine::MemoryEngine;
use geoconvert_pipeline::Converter;
use serde_json::Value;

fn converter() -> (MemoryEngine, Converter<MemoryEngine>) {
    let engine = engine();
    (engine.clone(), Converter::new(engine))
}

#[test]
fn test_geojson_to_csv_as_xy() {
    let (engine, converter) = converter();
    let request = ConversionRequest::new(CITY, "geojson", "csv").with_csv_geometry(CsvGeometryMode::Xy);

    let result = converter.convert(&request);
    assert!(result.is_success(), "conversion failed: {}", converter.last_error());
    assert_eq!(result.driver, "CSV");
    assert!(result.diagnostic.is_none());

    let text = String::from_utf8(result.output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["name,population,X,Y", "city,1000,2.35,48.85"]);
    assert!(engine.paths().is_empty());
}

#[test]
fn test_unavailable_driver_reports_driver_name() {
    let (_, converter) = converter();
    let result = converter.convert(&ConversionRequest::new(CITY, "geojson", "gpkg"));

    assert!(!result.is_success());
    assert!(result.output.is_empty());
    assert!(converter.last_error().contains("GPKG"));
    let diagnostic = result.diagnostic.unwrap();
    assert_eq!(diagnostic.severity, Severity::Failure);
    assert!(diagnostic.text.contains("source CRS: none"));
}

#[test]
fn test_archive_without_shp_fails_cleanly() {
    let (engine, converter) = converter();
    let archive = zip_entries(&engine, &[("readme.txt", b"no shapes here".as_slice())]);

    let result = converter.convert(&ConversionRequest::new(archive.clone(), "shapefile", "geojson"));
    assert!(!result.is_success());
    assert!(converter.last_error().contains(".shp"));

    let preview = converter.preview(&archive, "shapefile", None);
    assert!(preview.is_error());
    assert!(preview.error_message().unwrap().contains(".shp"));
    assert!(engine.paths().is_empty());
}

#[test]
fn test_shapefile_input_is_read_from_archive() {
    let (engine, converter) = converter();
    let archive = shapefile_archive(&engine, "cities", CITY);

    let result = converter.convert(&ConversionRequest::new(archive, "shapefile", "geojson"));
    assert!(result.is_success(), "conversion failed: {}", converter.last_error());

    let json: Value = serde_json::from_slice(&result.output).unwrap();
    assert_eq!(json["name"], "cities");
    assert_eq!(json["features"][0]["properties"]["name"], "city");
    assert_eq!(json["features"][0]["properties"]["population"], 1000);
    assert_eq!(json["features"][0]["geometry"]["coordinates"][0], 2.35);
}

#[test]
fn test_shapefile_without_dbf_is_rejected() {
    let (engine, converter) = converter();
    let archive = shapefile_archive(&engine, "cities", CITY);
    let shp = zip_member(&engine, &archive, "cities.shp");
    let shp_only = zip_entries(&engine, &[("cities.shp", shp.as_slice())]);

    let result = converter.convert(&ConversionRequest::new(shp_only, "shapefile", "geojson"));
    assert!(!result.is_success());
    assert!(converter.last_error().contains(".dbf"));
}

#[test]
fn test_conversion_is_idempotent() {
    let (_, converter) = converter();
    for output in ["geojson", "csv", "shapefile"] {
        let request = ConversionRequest::new(MIXED, "geojson", output);
        let first = converter.convert(&request);
        let second = converter.convert(&request);
        assert!(first.is_success(), "{} failed: {}", output, converter.last_error());
        assert_eq!(first.output, second.output, "{} output differs between runs", output);
    }
}

#[test]
fn test_round_trip_preserves_count_and_fields() {
    let (_, converter) = converter();
    let csv = converter.convert(&ConversionRequest::new(MIXED, "geojson", "csv"));
    assert!(csv.is_success(), "to csv failed: {}", converter.last_error());

    let back = converter.convert(&ConversionRequest::new(csv.output, "csv", "geojson"));
    assert!(back.is_success(), "from csv failed: {}", converter.last_error());

    let json: Value = serde_json::from_slice(&back.output).unwrap();
    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 10);
    let keys: Vec<&String> = features[0]["properties"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["id"]);
    assert_eq!(features[3]["geometry"]["type"], "LineString");
}

#[test]
fn test_reprojection_with_target_crs() {
    let (_, converter) = converter();
    let request = ConversionRequest::new(CITY, "geojson", "geojson").with_target_crs("EPSG:3857");

    let result = converter.convert(&request);
    assert!(result.is_success(), "conversion failed: {}", converter.last_error());

    let json: Value = serde_json::from_slice(&result.output).unwrap();
    assert_eq!(json["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::3857");
    let x = json["features"][0]["geometry"]["coordinates"][0].as_f64().unwrap();
    assert!((x - 261_600.80).abs() < 0.1, "unexpected x {}", x);
}

#[test]
fn test_unresolvable_user_crs_is_a_warning_then_a_failure() {
    let (engine, converter) = converter();
    let request = ConversionRequest::new(CITY, "geojson", "geojson").with_source_crs("LOCAL:NOWHERE");

    let result = converter.convert(&request);
    assert!(!result.is_success());
    assert_eq!(result.diagnostic.unwrap().severity, Severity::Failure);

    engine.register_spatial_reference("LOCAL:NOWHERE", 0.0, 0.0);
    let result = converter.convert(&request);
    assert!(result.is_success(), "conversion failed: {}", converter.last_error());
    let json: Value = serde_json::from_slice(&result.output).unwrap();
    assert_eq!(json["crs"]["properties"]["name"], "LOCAL:NOWHERE");
}

#[test]
fn test_where_and_select_and_layer_name() {
    let (_, converter) = converter();
    let request = ConversionRequest::new(MIXED, "geojson", "geojson")
        .with_where("id > 8")
        .with_fields(["id"])
        .with_layer_name("big_ids");

    let result = converter.convert(&request);
    assert!(result.is_success(), "conversion failed: {}", converter.last_error());
    let json: Value = serde_json::from_slice(&result.output).unwrap();
    assert_eq!(json["name"], "big_ids");
    assert_eq!(json["features"].as_array().unwrap().len(), 2);
}

#[test]
fn test_family_filter_and_where_combine() {
    let (_, converter) = converter();
    let request = ConversionRequest::new(MIXED, "geojson", "geojson")
        .with_geometry_family(geoconvert_core::models::GeometryFamily::Line)
        .with_where("id < 6");

    let result = converter.convert(&request);
    assert!(result.is_success(), "conversion failed: {}", converter.last_error());
    let json: Value = serde_json::from_slice(&result.output).unwrap();
    let ids: Vec<i64> = json["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["properties"]["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![4, 5]);
}

#[test]
fn test_mapinfo_output_is_packaged() {
    let (engine, converter) = converter();
    let result = converter.convert(&ConversionRequest::new(CITY, "geojson", "mapinfo"));
    assert!(result.is_success(), "conversion failed: {}", converter.last_error());

    let members = zip_members(&engine, &result.output);
    assert_eq!(members, vec!["input.dat", "input.id", "input.map", "input.tab"]);
    assert_eq!(zip_member(&engine, &result.output, "input.id"), b"name,population");
    assert_eq!(zip_member(&engine, &result.output, "input.dat"), b"EPSG:4326");
}

#[test]
fn test_invalid_request_reports_reason() {
    let (_, converter) = converter();
    let result = converter.convert(&ConversionRequest::new(CITY, "geojson", "csv").with_simplify(-2.0));
    assert!(!result.is_success());
    assert!(converter.last_error().contains("simplify tolerance"));
}

#[test]
fn test_config_sets_scratch_root_and_request_defaults() {
    let engine = engine();
    let config = LayeredConfig::with_defaults();
    let converter = Converter::with_config(engine.clone(), &config);
    assert_eq!(converter.scratch_root(), "/vsimem/geoconvert");

    let request = config.apply_to_request(ConversionRequest::new(CITY, "geojson", "csv"));
    let result = converter.convert(&request);
    let text = String::from_utf8(result.output).unwrap();
    assert!(text.starts_with("WKT,name,population"));
}

#[test]
fn test_engine_version_info_passthrough() {
    let (_, converter) = converter();
    let info = converter.engine_version_info();
    assert!(info.contains("memory engine"));
    assert!(info.contains("ESRI Shapefile"));
    assert_eq!(converter.last_error(), "");
}
