//! Diagnostic messages reported by the engine and the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity classes kept by the diagnostic channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    pub text: String,
    pub severity: Severity,
}

impl DiagnosticMessage {
    pub fn warning(text: impl Into<String>) -> Self {
        Self { text: text.into(), severity: Severity::Warning }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self { text: text.into(), severity: Severity::Failure }
    }
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
