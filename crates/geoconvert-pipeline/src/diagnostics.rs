//! Diagnostic channel
//!
//! Collects engine and pipeline messages for the duration of one public
//! operation. The first failure wins; without a failure the latest warning is
//! reported.

use geoconvert_core::models::{CrsIdentifier, DiagnosticMessage, Severity};
use geoconvert_core::ports::MessageHandler;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct ChannelState {
    failure: Option<DiagnosticMessage>,
    warning: Option<DiagnosticMessage>,
}

/// Explicit diagnostic context shared between a converter and its engine's
/// message handler
#[derive(Debug, Clone, Default)]
pub struct DiagnosticChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl DiagnosticChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forget everything recorded so far
    pub fn reset(&self) {
        *self.state() = ChannelState::default();
    }

    /// Record a failure unless an earlier one is already held
    pub fn record_failure(&self, text: impl Into<String>) {
        let mut state = self.state();
        if state.failure.is_none() {
            state.failure = Some(DiagnosticMessage::failure(text));
        }
    }

    /// Record a warning, replacing any earlier warning
    pub fn record_warning(&self, text: impl Into<String>) {
        self.state().warning = Some(DiagnosticMessage::warning(text));
    }

    pub fn record(&self, severity: Severity, text: impl Into<String>) {
        match severity {
            Severity::Failure => self.record_failure(text),
            Severity::Warning => self.record_warning(text),
        }
    }

    /// The message to report: the first failure, else the latest warning
    pub fn last(&self) -> Option<DiagnosticMessage> {
        let state = self.state();
        state.failure.clone().or_else(|| state.warning.clone())
    }

    pub fn has_failure(&self) -> bool {
        self.state().failure.is_some()
    }

    /// Text of [`DiagnosticChannel::last`], empty when nothing was recorded
    pub fn last_error(&self) -> String {
        self.last().map(|m| m.text).unwrap_or_default()
    }

    /// Engine message handler feeding this channel
    pub fn handler(&self) -> MessageHandler {
        let channel = self.clone();
        Box::new(move |severity, message| channel.record(severity, message))
    }
}

/// Explanation for an empty result when nothing more specific was recorded
pub fn fallback_message(
    reason: &str,
    driver: &str,
    source: Option<&CrsIdentifier>,
    target: Option<&CrsIdentifier>,
) -> String {
    let describe = |crs: Option<&CrsIdentifier>| {
        crs.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string())
    };
    format!(
        "{} (driver: {}, source CRS: {}, target CRS: {})",
        reason,
        driver,
        describe(source),
        describe(target)
    )
}
