//! Boundary-sampling extent estimation
//!
//! A projected rectangle is generally not a rectangle in WGS84: its sides bow.
//! Transforming only the four corners can under-estimate the reprojected
//! bounds, so each edge is sampled and the bounding box of all transformed
//! samples is taken instead. The result is an approximation.

use geo::{BoundingRect, Coord, MultiPoint, Point, Rect};
use geoconvert_core::models::{ExtentBox, ExtentEstimate};
use geoconvert_core::ports::SpatialReferenceEngine;

use crate::crs::is_wgs84_label;

/// Points sampled per rectangle edge, endpoints included
pub const SAMPLES_PER_EDGE: usize = 9;

/// Evenly spaced samples along the four edges of `extent`.
///
/// Corners appear once per adjoining edge, giving `4 * SAMPLES_PER_EDGE`
/// points.
pub fn boundary_samples(extent: &ExtentBox) -> Vec<(f64, f64)> {
    let rect = Rect::new(
        Coord { x: extent.min_x, y: extent.min_y },
        Coord { x: extent.max_x, y: extent.max_y },
    );
    let step = 1.0 / (SAMPLES_PER_EDGE - 1) as f64;

    rect.to_lines()
        .iter()
        .flat_map(|edge| {
            (0..SAMPLES_PER_EDGE).map(move |i| {
                let c = edge.start + edge.delta() * (i as f64 * step);
                (c.x, c.y)
            })
        })
        .collect()
}

/// Estimate `extent`, expressed in the CRS labelled `source_label`, in WGS84.
///
/// Returns the input unchanged (with `reprojected == false`) when the label is
/// empty, names WGS84, parses to WGS84, or when parsing or transforming fails.
/// The trace records which path was taken.
pub fn estimate<R>(engine: &R, extent: &ExtentBox, source_label: &str) -> ExtentEstimate
where
    R: SpatialReferenceEngine + ?Sized,
{
    let label = source_label.trim();
    if label.is_empty() {
        return ExtentEstimate::unchanged(*extent, "no source CRS; extent returned as-is");
    }
    if is_wgs84_label(label) {
        return ExtentEstimate::unchanged(*extent, format!("'{}' is WGS84; no reprojection", label));
    }

    let source = match engine.parse_spatial_reference(label) {
        Ok(sr) => sr,
        Err(e) => {
            tracing::debug!(crs = %label, error = %e, "Extent estimate skipped: CRS not parsed");
            return ExtentEstimate::unchanged(
                *extent,
                format!("failed to parse source CRS '{}': {}", label, e),
            );
        }
    };
    let wgs84 = match engine.wgs84() {
        Ok(sr) => sr,
        Err(e) => {
            return ExtentEstimate::unchanged(
                *extent,
                format!("failed to build WGS84 reference: {}", e),
            );
        }
    };
    if engine.same_spatial_reference(&source, &wgs84) {
        return ExtentEstimate::unchanged(
            *extent,
            format!("'{}' is equivalent to WGS84; no reprojection", label),
        );
    }

    let samples = boundary_samples(extent);
    let transformed = match engine.transform_points(&samples, &source, &wgs84) {
        Ok(points) => points,
        Err(e) => {
            return ExtentEstimate::unchanged(
                *extent,
                format!("transform from '{}' to WGS84 failed: {}", label, e),
            );
        }
    };

    if transformed.len() != samples.len()
        || transformed.iter().any(|(x, y)| !x.is_finite() || !y.is_finite())
    {
        return ExtentEstimate::unchanged(
            *extent,
            format!(
                "transform from '{}' to WGS84 returned {} of {} finite points",
                label,
                transformed.iter().filter(|(x, y)| x.is_finite() && y.is_finite()).count(),
                samples.len()
            ),
        );
    }

    let points: MultiPoint<f64> = transformed.iter().map(|&(x, y)| Point::new(x, y)).collect();
    let Some(bounds) = points.bounding_rect() else {
        return ExtentEstimate::unchanged(*extent, "no transformed samples");
    };

    let estimated = ExtentBox::new(bounds.min().x, bounds.min().y, bounds.max().x, bounds.max().y);
    ExtentEstimate {
        extent: estimated,
        reprojected: true,
        trace: format!(
            "approximated from {} boundary samples ({} per edge) transformed from '{}' to WGS84",
            samples.len(),
            SAMPLES_PER_EDGE,
            label
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoconvert_core::error::{GeoconvertError, Result};

    /// Test engine knowing WGS84 and references shifted from it by a constant
    struct ShiftEngine;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Shift(f64, f64);

    impl SpatialReferenceEngine for ShiftEngine {
        type SpatialRef = Shift;

        fn parse_spatial_reference(&self, input: &str) -> Result<Shift> {
            match input {
                "SHIFT:10,20" => Ok(Shift(10.0, 20.0)),
                "ALIAS:WGS" => Ok(Shift(0.0, 0.0)),
                "BROKEN" => Ok(Shift(f64::NAN, 0.0)),
                _ => Err(GeoconvertError::CrsResolution {
                    input: input.to_string(),
                    reason: "unknown".to_string(),
                }),
            }
        }

        fn wgs84(&self) -> Result<Shift> {
            Ok(Shift(0.0, 0.0))
        }

        fn same_spatial_reference(&self, a: &Shift, b: &Shift) -> bool {
            a == b
        }

        fn transform_points(
            &self,
            points: &[(f64, f64)],
            from: &Shift,
            to: &Shift,
        ) -> Result<Vec<(f64, f64)>> {
            Ok(points.iter().map(|(x, y)| (x + from.0 - to.0, y + from.1 - to.1)).collect())
        }
    }

    fn extent() -> ExtentBox {
        ExtentBox::new(-5.0, 40.0, 10.0, 50.0)
    }

    #[test]
    fn test_boundary_samples_cover_edges() {
        let samples = boundary_samples(&extent());
        assert_eq!(samples.len(), 36);
        for corner in [(-5.0, 40.0), (10.0, 40.0), (10.0, 50.0), (-5.0, 50.0)] {
            assert!(samples.contains(&corner), "missing corner {:?}", corner);
        }
        assert!(samples.iter().all(|(x, y)| (-5.0..=10.0).contains(x) && (40.0..=50.0).contains(y)));
    }

    #[test]
    fn test_wgs84_short_circuit() {
        for label in ["EPSG:4326", "wgs84", "WGS 84", ""] {
            let estimate = estimate(&ShiftEngine, &extent(), label);
            assert!(!estimate.reprojected);
            assert_eq!(estimate.extent, extent());
        }
    }

    #[test]
    fn test_equivalent_reference_is_not_reprojected() {
        let estimate = estimate(&ShiftEngine, &extent(), "ALIAS:WGS");
        assert!(!estimate.reprojected);
        assert!(estimate.trace.contains("equivalent"));
    }

    #[test]
    fn test_shifted_reference() {
        let estimate = estimate(&ShiftEngine, &extent(), "SHIFT:10,20");
        assert!(estimate.reprojected);
        assert_eq!(estimate.extent, ExtentBox::new(5.0, 60.0, 20.0, 70.0));
    }

    #[test]
    fn test_parse_failure_returns_original() {
        let estimate = estimate(&ShiftEngine, &extent(), "EPSG:999999");
        assert!(!estimate.reprojected);
        assert_eq!(estimate.extent, extent());
        assert!(estimate.trace.contains("failed to parse"));
    }

    #[test]
    fn test_non_finite_transform_returns_original() {
        let estimate = estimate(&ShiftEngine, &extent(), "BROKEN");
        assert!(!estimate.reprojected);
        assert_eq!(estimate.extent, extent());
    }
}
