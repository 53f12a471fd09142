//! Diagnostics reported while synthesizing extrusion values
//!
//! Anomalies in the input never abort a pass. Each one is recorded as a
//! [`Diagnostic`] and mirrored to the `tracing` log at the matching level.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Degraded but expected output (e.g. missing flow rate)
    Info,
    /// A recovered anomaly in the input
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single recovered anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Input line index (0-based), when the anomaly belongs to a line
    pub line: Option<usize>,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Create a warning
    pub fn warning(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            line,
            message: message.into(),
        }
    }

    /// Create an informational notice
    pub fn info(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {}): {}", self.severity, line + 1, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Ordered collection of diagnostics for one pass
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it
    pub fn warn(&mut self, line: Option<usize>, message: impl Into<String>) {
        let diagnostic = Diagnostic::warning(line, message);
        tracing::warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    /// Record a notice and log it
    pub fn info(&mut self, line: Option<usize>, message: impl Into<String>) {
        let diagnostic = Diagnostic::info(line, message);
        tracing::info!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    /// Number of recorded diagnostics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any warning was recorded
    pub fn has_warnings(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity == Severity::Warning)
    }

    /// Iterate over the recorded diagnostics
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Consume the collection
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
