//! Error types for review-import-core.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias using ExportError.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors raised while normalizing a vendor export. These reject the whole
/// export before any processing begins.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export is not a JSON object")]
    NotAnObject,

    #[error("missing required array `{field}`")]
    MissingArray { field: &'static str },

    #[error("invalid entry {index} in `{field}`: {reason}")]
    InvalidEntry {
        field: &'static str,
        index: usize,
        reason: String,
    },

    #[error("unknown source adapter `{0}`")]
    UnknownSource(String),
}

/// Failure signalled by a scheduling capability.
#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("card has non-finite {field}: {value}")]
    NonFiniteInput { field: &'static str, value: f64 },

    #[error("scheduler produced non-finite {field}")]
    NonFiniteOutput { field: &'static str },

    #[error("next due date after review at {reviewed_at} is out of range")]
    DueOutOfRange { reviewed_at: DateTime<Utc> },
}
