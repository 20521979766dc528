//! Vector I/O engine ports
//!
//! The conversion pipeline delegates format codecs, attribute filtering, and
//! coordinate math to an engine implementing these traits.

use crate::error::Result;
use crate::models::{
    ExtentBox, FieldSample, LayerInfo, Severity, TranslateDirective,
};
use crate::ports::scratch::ScratchStore;

/// Callback receiving every warning or failure message the engine emits
pub type MessageHandler = Box<dyn Fn(Severity, &str) + Send + Sync>;

/// Port for spatial reference parsing and point transformation
pub trait SpatialReferenceEngine: Send + Sync {
    type SpatialRef;

    /// Parse user input (authority code, name, WKT, PROJ string)
    fn parse_spatial_reference(&self, input: &str) -> Result<Self::SpatialRef>;

    /// The WGS84 geographic reference
    fn wgs84(&self) -> Result<Self::SpatialRef>;

    fn same_spatial_reference(&self, a: &Self::SpatialRef, b: &Self::SpatialRef) -> bool;

    /// Transform points between references. Both ends use traditional GIS
    /// axis order (x = easting/longitude, y = northing/latitude).
    fn transform_points(
        &self,
        points: &[(f64, f64)],
        from: &Self::SpatialRef,
        to: &Self::SpatialRef,
    ) -> Result<Vec<(f64, f64)>>;
}

/// Port for the vector dataset engine
pub trait VectorEngine: ScratchStore + SpatialReferenceEngine {
    /// Handle of an opened, read-only dataset
    type Dataset;

    /// Identification of the engine build
    fn version_info(&self) -> String;

    /// Whether the driver with this identifier is available
    fn has_driver(&self, driver: &str) -> bool;

    /// Install (or clear) the message callback
    fn set_message_handler(&self, handler: Option<MessageHandler>);

    /// Open a dataset read-only
    fn open_dataset(&self, path: &str) -> Result<Self::Dataset>;

    fn layers(&self, dataset: &Self::Dataset) -> Result<Vec<LayerInfo>>;

    /// Count features of a layer, optionally restricted by an attribute
    /// predicate
    fn count_features(
        &self,
        dataset: &Self::Dataset,
        layer: usize,
        predicate: Option<&str>,
    ) -> Result<u64>;

    /// Extent of a layer in its own CRS, `None` for layers without geometry
    fn layer_extent(&self, dataset: &Self::Dataset, layer: usize) -> Result<Option<ExtentBox>>;

    /// Fields of the first feature of a layer, `None` for an empty layer
    fn first_feature(
        &self,
        dataset: &Self::Dataset,
        layer: usize,
    ) -> Result<Option<Vec<FieldSample>>>;

    /// Translate `source` into a new dataset at `destination`
    fn translate(
        &self,
        source: &Self::Dataset,
        destination: &str,
        directives: &[TranslateDirective],
    ) -> Result<()>;
}
