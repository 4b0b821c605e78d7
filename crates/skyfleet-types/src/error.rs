//! Error types for data parsing in skyfleet-types.

use thiserror::Error;

/// Errors that can occur when parsing snapshot or forecast payloads.
///
/// This error type is transport-agnostic and does not include
/// network errors (those belong in skyfleet-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The payload was well-formed JSON but its content is unusable.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The payload was not valid JSON for the expected shape.
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Parallel arrays in a payload disagree on length.
    #[error("Length mismatch in '{field}': expected {expected} values, got {actual}")]
    LengthMismatch {
        /// The array whose length differs.
        field: &'static str,
        /// Length of the reference array.
        expected: usize,
        /// Length actually found.
        actual: usize,
    },
}

impl ParseError {
    /// Create an invalid data error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }
}

/// Result type alias using skyfleet-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
