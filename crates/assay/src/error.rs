//! Error types for the Assay library.

use thiserror::Error;

/// Main error type for Assay operations.
#[derive(Debug, Error)]
pub enum AssayError {
    /// Attempt to merge structurally incompatible state, or to compare
    /// profiles that share no columns.
    #[error("Incompatible merge: {0}")]
    IncompatibleMerge(String),

    /// Profiling was cancelled mid-stream; no partial result is available.
    #[error("Profiling cancelled after {rows_processed} rows")]
    Cancelled { rows_processed: usize },

    /// An operation was given nothing to work on.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Assay operations.
pub type Result<T> = std::result::Result<T, AssayError>;
