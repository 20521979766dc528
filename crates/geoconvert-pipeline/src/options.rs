//! Driver option builder
//!
//! Turns a conversion request into the ordered translate directive list for
//! its output driver. Pure data transformation.

use geoconvert_core::models::{
    ConversionRequest, CrsDirective, Dimension, TranslateDirective, VectorFormat,
};
use geoconvert_geo::policy;

/// Driver-specific layer creation options
pub fn creation_options(format: VectorFormat, request: &ConversionRequest) -> Vec<TranslateDirective> {
    match format {
        VectorFormat::Shapefile => vec![TranslateDirective::creation_option("ENCODING", "UTF-8")],
        VectorFormat::GeoJson | VectorFormat::TopoJson => vec![
            TranslateDirective::creation_option("WRITE_BBOX", "YES"),
            TranslateDirective::creation_option(
                "COORDINATE_PRECISION",
                request.coordinate_precision.to_string(),
            ),
        ],
        VectorFormat::GeoPackage => {
            vec![TranslateDirective::creation_option("SPATIAL_INDEX", "YES")]
        }
        VectorFormat::Csv => vec![TranslateDirective::creation_option(
            "GEOMETRY",
            request.csv_geometry.as_str(),
        )],
        _ => Vec::new(),
    }
}

/// Build the directive list, in stable order.
///
/// Layer renaming and the geometry-family filter are left out for Shapefile
/// output: the family splitter names and filters each per-family output
/// itself.
pub fn build(
    format: VectorFormat,
    request: &ConversionRequest,
    crs: &CrsDirective,
) -> Vec<TranslateDirective> {
    let mut directives = vec![TranslateDirective::Format(format.driver_id().to_string())];

    directives.push(TranslateDirective::Dimension(if request.keep_z {
        Dimension::Xyz
    } else {
        Dimension::Xy
    }));

    if request.explode_collections {
        directives.push(TranslateDirective::ExplodeCollections);
    }
    if request.skip_failures {
        directives.push(TranslateDirective::SkipFailures);
    }
    if request.make_valid {
        directives.push(TranslateDirective::MakeValid);
    }
    if request.preserve_fid {
        directives.push(TranslateDirective::PreserveFid);
    }
    if request.simplify_tolerance > 0.0 {
        directives.push(TranslateDirective::Simplify(request.simplify_tolerance));
    }

    directives.extend(creation_options(format, request));
    directives.extend(policy::to_directives(crs));

    if !format.is_shapefile() {
        if let Some(name) = &request.layer_name {
            directives.push(TranslateDirective::LayerName(name.clone()));
        }
        if let Some(family) = request.geometry_family {
            directives.push(TranslateDirective::Where(family.predicate().to_string()));
        }
    }

    if let Some(clause) = &request.where_clause {
        directives.push(TranslateDirective::Where(clause.clone()));
    }
    if let Some(fields) = &request.fields {
        directives.push(TranslateDirective::Select(fields.clone()));
    }

    tracing::debug!(
        driver = format.driver_id(),
        args = ?TranslateDirective::render(&directives),
        "Built translate directives"
    );
    directives
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoconvert_core::models::{CrsIdentifier, CsvGeometryMode, GeometryFamily};

    fn request(output: &str) -> ConversionRequest {
        ConversionRequest::new(b"{}".to_vec(), "geojson", output)
    }

    #[test]
    fn test_minimal_directives() {
        let req = request("csv");
        let directives = build(req.output_format, &req, &CrsDirective::None);
        assert_eq!(
            TranslateDirective::render(&directives),
            vec!["-f", "CSV", "-dim", "XY", "-lco", "GEOMETRY=AS_WKT"]
        );
    }

    #[test]
    fn test_full_ordering() {
        let req = request("geojson")
            .with_explode_collections(true)
            .with_skip_failures(true)
            .with_make_valid(true)
            .with_preserve_fid(true)
            .with_simplify(0.5)
            .with_keep_z(true)
            .with_coordinate_precision(6)
            .with_layer_name("roads")
            .with_geometry_family(GeometryFamily::Line)
            .with_where("lanes > 2")
            .with_fields(["name", "lanes"]);
        let crs = CrsDirective::TransformOnly(CrsIdentifier::EpsgCode(3857));

        let args = TranslateDirective::render(&build(req.output_format, &req, &crs));
        assert_eq!(
            args,
            vec![
                "-f",
                "GeoJSON",
                "-dim",
                "XYZ",
                "-explodecollections",
                "-skipfailures",
                "-makevalid",
                "-preserve_fid",
                "-simplify",
                "0.5",
                "-lco",
                "WRITE_BBOX=YES",
                "-lco",
                "COORDINATE_PRECISION=6",
                "-t_srs",
                "EPSG:3857",
                "-nln",
                "roads",
                "-where",
                "OGR_GEOMETRY='LINESTRING' OR OGR_GEOMETRY='MULTILINESTRING'",
                "-where",
                "lanes > 2",
                "-select",
                "name,lanes",
            ]
        );
    }

    #[test]
    fn test_zero_tolerance_means_no_simplify() {
        let req = request("geojson").with_simplify(0.0);
        let directives = build(req.output_format, &req, &CrsDirective::None);
        assert!(!directives.iter().any(|d| matches!(d, TranslateDirective::Simplify(_))));
    }

    #[test]
    fn test_driver_specific_creation_options() {
        let shp = request("shapefile");
        assert_eq!(
            creation_options(VectorFormat::Shapefile, &shp),
            vec![TranslateDirective::creation_option("ENCODING", "UTF-8")]
        );
        assert_eq!(
            creation_options(VectorFormat::GeoPackage, &shp),
            vec![TranslateDirective::creation_option("SPATIAL_INDEX", "YES")]
        );
        let csv = request("csv").with_csv_geometry(CsvGeometryMode::Xy);
        assert_eq!(
            creation_options(VectorFormat::Csv, &csv),
            vec![TranslateDirective::creation_option("GEOMETRY", "AS_XY")]
        );
        assert!(creation_options(VectorFormat::Kml, &csv).is_empty());
    }

    #[test]
    fn test_shapefile_leaves_naming_and_family_to_splitter() {
        let req = request("shapefile")
            .with_layer_name("roads")
            .with_geometry_family(GeometryFamily::Polygon)
            .with_where("kind = 'a'");
        let directives = build(req.output_format, &req, &CrsDirective::None);
        assert!(!directives.iter().any(|d| matches!(d, TranslateDirective::LayerName(_))));
        assert_eq!(
            directives.iter().filter(|d| matches!(d, TranslateDirective::Where(_))).count(),
            1
        );
    }

    #[test]
    fn test_assign_then_transform_directives() {
        let req = request("geojson");
        let crs = CrsDirective::AssignThenTransform {
            source: CrsIdentifier::EpsgCode(4326),
            target: CrsIdentifier::EpsgCode(3857),
        };
        let args = TranslateDirective::render(&build(req.output_format, &req, &crs));
        let s_srs = args.iter().position(|a| a == "-s_srs").unwrap();
        assert_eq!(args[s_srs + 1], "EPSG:4326");
        assert_eq!(args[s_srs + 2], "-t_srs");
    }
}
