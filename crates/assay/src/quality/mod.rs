//! Data-quality observations attached to profiles.

pub mod duplicates;
pub mod pii;

pub use duplicates::{DuplicateDetector, DuplicateIssue};
pub use pii::{PiiFinding, PiiTracker, PiiType};

use serde::{Deserialize, Serialize};

/// Severity level of a quality note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational only, may not require action.
    Info,
    /// Potential issue that should be reviewed.
    Warning,
    /// Definite issue that should be addressed.
    Error,
}

impl Severity {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

/// A free-text quality observation about a column or file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityNote {
    pub severity: Severity,
    pub message: String,
}

impl QualityNote {
    /// Create a new note.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    /// Informational note.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Warning note.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Error note.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}
