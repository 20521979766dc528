//! Decoded datasets held by the in-memory engine

use geo::{BoundingRect, Geometry};
use geoconvert_core::models::{ExtentBox, FieldSample, FieldType, FieldValue, GeometryKind, LayerInfo};

/// Attribute field definition
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefn {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDefn {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self { name: name.into(), field_type }
    }
}

/// A feature: optional geometry plus one value slot per layer field
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryFeature {
    pub fid: i64,
    pub geometry: Option<Geometry<f64>>,
    pub values: Vec<Option<FieldValue>>,
}

impl MemoryFeature {
    pub fn new(fid: i64, geometry: Option<Geometry<f64>>, values: Vec<Option<FieldValue>>) -> Self {
        Self { fid, geometry, values }
    }

    pub fn geometry_kind(&self) -> GeometryKind {
        self.geometry.as_ref().map(kind_of).unwrap_or(GeometryKind::None)
    }
}

/// A named layer with a fixed schema
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryLayer {
    pub name: String,
    /// Label of the layer CRS, `None` when the layer has no CRS
    pub crs: Option<String>,
    pub fields: Vec<FieldDefn>,
    pub features: Vec<MemoryFeature>,
    /// Declared geometry type; recomputed from the features when `None`
    pub declared_kind: Option<GeometryKind>,
}

impl MemoryLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            crs: None,
            fields: Vec::new(),
            features: Vec::new(),
            declared_kind: None,
        }
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldDefn>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_features(mut self, features: Vec<MemoryFeature>) -> Self {
        self.features = features;
        self
    }

    /// Index of a field by name, case-insensitive
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Geometry type shared by every feature, `Unknown` when mixed
    pub fn geometry_kind(&self) -> GeometryKind {
        if let Some(kind) = self.declared_kind {
            return kind;
        }

        let mut kinds = self
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .map(kind_of);

        match kinds.next() {
            Some(first) if kinds.all(|k| k == first) => first,
            Some(_) => GeometryKind::Unknown,
            None if self.features.is_empty() => GeometryKind::Unknown,
            None => GeometryKind::None,
        }
    }

    pub fn info(&self) -> LayerInfo {
        LayerInfo {
            name: self.name.clone(),
            geometry_kind: self.geometry_kind(),
            crs_label: self.crs.clone(),
        }
    }

    pub fn extent(&self) -> Option<ExtentBox> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .filter_map(|g| g.bounding_rect())
            .map(|r| ExtentBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
            .reduce(|a, b| a.union(&b))
    }

    /// Field samples of one feature, in schema order
    pub fn samples(&self, feature: &MemoryFeature) -> Vec<FieldSample> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, defn)| {
                FieldSample::new(
                    defn.name.clone(),
                    defn.field_type,
                    feature.values.get(i).cloned().flatten(),
                )
            })
            .collect()
    }
}

/// An opened dataset: a read-only snapshot of the decoded layers
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    pub path: String,
    pub driver: String,
    pub layers: Vec<MemoryLayer>,
}

impl MemoryDataset {
    pub fn layer(&self, index: usize) -> Option<&MemoryLayer> {
        self.layers.get(index)
    }
}

/// Geometry kind of a concrete geometry
pub fn kind_of(geometry: &Geometry<f64>) -> GeometryKind {
    match geometry {
        Geometry::Point(_) => GeometryKind::Point,
        Geometry::Line(_) | Geometry::LineString(_) => GeometryKind::LineString,
        Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => GeometryKind::Polygon,
        Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
        Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
        Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
        Geometry::GeometryCollection(_) => GeometryKind::GeometryCollection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point};

    fn feature(geometry: Geometry<f64>) -> MemoryFeature {
        MemoryFeature::new(0, Some(geometry), Vec::new())
    }

    #[test]
    fn test_uniform_layer_reports_kind() {
        let layer = MemoryLayer::new("pts").with_features(vec![
            feature(point!(x: 1.0, y: 2.0).into()),
            feature(point!(x: 3.0, y: 4.0).into()),
        ]);
        assert_eq!(layer.geometry_kind(), GeometryKind::Point);
    }

    #[test]
    fn test_mixed_layer_is_unknown() {
        let layer = MemoryLayer::new("mixed").with_features(vec![
            feature(point!(x: 1.0, y: 2.0).into()),
            feature(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into()),
        ]);
        assert_eq!(layer.geometry_kind(), GeometryKind::Unknown);
    }

    #[test]
    fn test_attribute_only_layer() {
        let layer = MemoryLayer::new("table")
            .with_features(vec![MemoryFeature::new(0, None, Vec::new())]);
        assert_eq!(layer.geometry_kind(), GeometryKind::None);
        assert!(layer.extent().is_none());
    }

    #[test]
    fn test_extent_unions_features() {
        let layer = MemoryLayer::new("pts").with_features(vec![
            feature(point!(x: -1.0, y: 2.0).into()),
            feature(point!(x: 3.0, y: -4.0).into()),
        ]);
        let extent = layer.extent().unwrap();
        assert_eq!(extent, ExtentBox::new(-1.0, -4.0, 3.0, 2.0));
    }

    #[test]
    fn test_samples_follow_schema() {
        let layer = MemoryLayer::new("t").with_fields(vec![
            FieldDefn::new("name", FieldType::String),
            FieldDefn::new("pop", FieldType::Integer),
        ]);
        let f = MemoryFeature::new(0, None, vec![Some(FieldValue::String("Paris".into()))]);
        let samples = layer.samples(&f);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, Some(FieldValue::String("Paris".into())));
        assert_eq!(samples[1].value, None);
    }
}
