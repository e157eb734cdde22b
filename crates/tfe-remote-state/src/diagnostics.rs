//! Structured diagnostics returned to the host.
//!
//! A [`DiagnosticSink`] is passed into every read so that reporting is tied
//! to the request rather than to a process-wide output handle.

use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A severity-tagged message for the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Short one-line summary.
    pub summary: String,
    /// Longer explanation, usually including the underlying error.
    pub detail: String,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Receiver for diagnostics raised while serving one request.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Sink that forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        match diagnostic.severity {
            Severity::Error => {
                tracing::error!(summary = %diagnostic.summary, detail = %diagnostic.detail, "data source diagnostic")
            }
            Severity::Warning => {
                tracing::warn!(summary = %diagnostic.summary, detail = %diagnostic.detail, "data source diagnostic")
            }
        }
    }
}

/// Sink that keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything collected so far.
    pub fn drain(&self) -> Vec<Diagnostic> {
        match self.diagnostics.lock() {
            Ok(mut guard) => guard.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        match self.diagnostics.lock() {
            Ok(mut guard) => guard.push(diagnostic.clone()),
            Err(poisoned) => poisoned.into_inner().push(diagnostic.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_severity() {
        assert!(Diagnostic::error("s", "d").is_error());
        assert!(!Diagnostic::warning("s", "d").is_error());
    }

    #[test]
    fn collecting_sink_drains_in_order() {
        let sink = CollectingSink::new();
        sink.emit(&Diagnostic::warning("first", ""));
        sink.emit(&Diagnostic::error("second", ""));

        let drained = sink.drain();
        let summaries: Vec<&str> = drained.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["first", "second"]);
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn tracing_sink_accepts_both_severities() {
        let sink: &dyn DiagnosticSink = &TracingSink;
        sink.emit(&Diagnostic::error("s", "d"));
        sink.emit(&Diagnostic::warning("s", "d"));
    }

    #[test]
    fn severity_serializes_snake_case() {
        let json = serde_json::to_value(Diagnostic::warning("s", "d")).expect("serializes");
        assert_eq!(json["severity"], "warning");
    }
}
