pub mod crs;
pub mod diagnostic;
pub mod directive;
pub mod extent;
pub mod field;
pub mod format;
pub mod geometry;
pub mod preview;
pub mod request;

pub use crs::{CrsDirective, CrsIdentifier};
pub use diagnostic::{DiagnosticMessage, Severity};
pub use directive::{CsvGeometryMode, Dimension, GeometryCoercion, TranslateDirective};
pub use extent::{ExtentBox, ExtentEstimate};
pub use field::{FieldPreview, FieldSample, FieldType, FieldValue, TypeLabel};
pub use format::{FormatDescriptor, VectorFormat};
pub use geometry::{GeometryFamily, GeometryKind, LayerInfo};
pub use preview::{PreviewDocument, PreviewResponse};
pub use request::{ConversionRequest, ConversionResult, FailurePolicy};
