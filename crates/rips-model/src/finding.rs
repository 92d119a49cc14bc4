//! Validation findings.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single rule finding against the generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Stable rule identifier (e.g. `USR-AGE`).
    pub rule: String,
    /// Human-readable location (e.g. `transaccion.usuarios[0]`).
    pub scope: String,
    pub field: String,
    pub message: String,
    /// The offending value, `null` when absent.
    pub value: Value,
    pub severity: Severity,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}.{}: {}",
            self.severity, self.scope, self.field, self.message
        )
    }
}

pub fn error_count(findings: &[ValidationError]) -> usize {
    findings
        .iter()
        .filter(|finding| finding.severity == Severity::Error)
        .count()
}

pub fn warning_count(findings: &[ValidationError]) -> usize {
    findings
        .iter()
        .filter(|finding| finding.severity == Severity::Warning)
        .count()
}
