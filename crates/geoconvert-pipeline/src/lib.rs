//! geoconvert Pipeline - Conversion and preview over a vector engine
//!
//! This crate owns the conversion policy: driver options, CRS decisions,
//! Shapefile family splitting, scratch management, and diagnostics. Format
//! codecs and coordinate math are delegated to a [`VectorEngine`].

pub mod convert;
pub mod diagnostics;
pub mod options;
pub mod preview;
pub mod scratch;
pub mod splitter;

pub use diagnostics::DiagnosticChannel;
pub use splitter::{FamilyOutput, FamilySplitter};

use geoconvert_core::config::{LayeredConfig, DEFAULT_SCRATCH_ROOT};
use geoconvert_core::models::{ConversionRequest, ConversionResult, PreviewResponse, VectorFormat};
use geoconvert_core::ports::VectorEngine;

use crate::diagnostics::fallback_message;

/// Public entry point: converts and previews vector datasets
pub struct Converter<E: VectorEngine> {
    engine: E,
    scratch_root: String,
    channel: DiagnosticChannel,
}

impl<E: VectorEngine> Converter<E> {
    /// Create a converter using the default scratch root
    pub fn new(engine: E) -> Self {
        Self::with_scratch_root(engine, DEFAULT_SCRATCH_ROOT)
    }

    /// Create a converter configured from layered configuration
    pub fn with_config(engine: E, config: &LayeredConfig) -> Self {
        Self::with_scratch_root(engine, &config.scratch_root.value)
    }

    fn with_scratch_root(engine: E, scratch_root: &str) -> Self {
        let channel = DiagnosticChannel::new();
        engine.set_message_handler(Some(channel.handler()));
        Self { engine, scratch_root: scratch_root.to_string(), channel }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn scratch_root(&self) -> &str {
        &self.scratch_root
    }

    /// Convert a dataset. Failure is signalled by empty output; the
    /// diagnostic explains it.
    pub fn convert(&self, request: &ConversionRequest) -> ConversionResult {
        self.channel.reset();
        let driver = request.output_format.driver_id().to_string();
        tracing::info!(
            from = %request.input_format,
            to = %request.output_format,
            bytes = request.input.len(),
            "Converting dataset"
        );

        match convert::run(&self.engine, &self.channel, &self.scratch_root, request) {
            Ok(output) => {
                tracing::info!(bytes = output.len(), driver = %driver, "Conversion complete");
                ConversionResult { output, driver, diagnostic: self.channel.last() }
            }
            Err(e) => {
                if !self.channel.has_failure() {
                    self.channel.record_failure(fallback_message(
                        &e.to_string(),
                        &driver,
                        request.source_crs.as_ref(),
                        request.target_crs.as_ref(),
                    ));
                }
                tracing::info!(driver = %driver, error = %e, "Conversion failed");
                ConversionResult { output: Vec::new(), driver, diagnostic: self.channel.last() }
            }
        }
    }

    /// Preview a dataset's first layer. Errors are returned in the response.
    pub fn preview(&self, input: &[u8], input_format: &str, source_crs: Option<&str>) -> PreviewResponse {
        self.channel.reset();
        let format = VectorFormat::resolve(input_format);
        tracing::info!(format = %format, bytes = input.len(), "Previewing dataset");

        match preview::extract(&self.engine, &self.channel, &self.scratch_root, input, format, source_crs) {
            Ok(doc) => PreviewResponse::Document(doc),
            Err(e) => {
                if !self.channel.has_failure() {
                    self.channel.record_failure(e.to_string());
                }
                tracing::info!(format = %format, error = %e, "Preview failed");
                PreviewResponse::error(e.to_string(), self.channel.last())
            }
        }
    }

    /// Diagnostic of the most recent operation, empty if there was none
    pub fn last_error(&self) -> String {
        self.channel.last_error()
    }

    pub fn engine_version_info(&self) -> String {
        self.engine.version_info()
    }
}

impl<E: VectorEngine> Drop for Converter<E> {
    fn drop(&mut self) {
        self.engine.set_message_handler(None);
    }
}
