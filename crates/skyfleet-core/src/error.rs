//! Error types for skyfleet-core.
//!
//! This module defines the error taxonomy of the trajectory and weather
//! engine.
//!
//! # Error Recovery Strategies
//!
//! No error is fatal to the process. Feed failures are always recoverable:
//! the unit of work (one snapshot hour, one forecast request) is logged and
//! skipped.
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::FetchFailed`] (transport, timeout, 429, 5xx) | Retry, then skip | Transient network trouble |
//! | [`Error::FetchFailed`] (other 4xx) | Skip | Resource is missing for this hour |
//! | [`Error::Parse`] | Skip | Payload is unusable, retrying won't help |
//! | [`Error::IndexOutOfRange`] / [`Error::MissingSample`] | Render "no data for this hour" | Partial ingestion |
//! | [`Error::UnknownKey`] | Ignore the selection | Key is not in any snapshot |
//! | [`Error::InvalidOffset`] | Reject the input | Offset outside the lookback window |
//! | [`Error::InvalidConfig`] | Do not retry | Fix configuration and restart |

use std::time::Duration;

use thiserror::Error;

use skyfleet_types::{ObjectKey, ParseError};

/// Errors that can occur in the trajectory and weather engine.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A feed request failed before a usable body arrived.
    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed {
        /// The requested URL.
        url: String,
        /// Why the request failed.
        reason: FetchFailureReason,
    },

    /// A feed body could not be parsed.
    #[error("Failed to parse {resource}: {source}")]
    Parse {
        /// The resource that was being parsed.
        resource: String,
        #[source]
        source: ParseError,
    },

    /// A series index beyond the populated length was requested.
    #[error("Index {index} out of range for series of length {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The populated length of the series.
        len: usize,
    },

    /// The slot exists but its snapshot never arrived.
    #[error("No sample recorded at index {index}")]
    MissingSample {
        /// The requested index.
        index: usize,
    },

    /// The key does not appear in any ingested snapshot.
    #[error("Unknown object {0}")]
    UnknownKey(ObjectKey),

    /// A relative hour offset outside the lookback window.
    #[error("Invalid hour offset {0}: must be within [-23, 0]")]
    InvalidOffset(i32),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured reasons for feed request failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchFailureReason {
    /// Connection, TLS or body transfer error.
    Transport(String),
    /// The request exceeded the client timeout.
    Timeout(Duration),
    /// The server answered with a non-success status.
    Status(u16),
}

impl std::fmt::Display for FetchFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {}", msg),
            Self::Timeout(duration) => write!(f, "timed out after {:?}", duration),
            Self::Status(code) => write!(f, "HTTP status {}", code),
        }
    }
}

impl Error {
    /// Create a fetch failure for a non-success status.
    pub fn fetch_status(url: impl Into<String>, status: u16) -> Self {
        Self::FetchFailed {
            url: url.into(),
            reason: FetchFailureReason::Status(status),
        }
    }

    /// Create a fetch failure for a transport error.
    pub fn fetch_transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            reason: FetchFailureReason::Transport(message.into()),
        }
    }

    /// Create a fetch failure for a timed out request.
    pub fn fetch_timeout(url: impl Into<String>, duration: Duration) -> Self {
        Self::FetchFailed {
            url: url.into(),
            reason: FetchFailureReason::Timeout(duration),
        }
    }

    /// Create a parse failure for a named resource.
    pub fn parse(resource: impl Into<String>, source: ParseError) -> Self {
        Self::Parse {
            resource: resource.into(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error stands for "nothing recorded at that index".
    ///
    /// Presentation renders both variants as "no data for this hour".
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::IndexOutOfRange { .. } | Self::MissingSample { .. })
    }
}

/// Result type alias using skyfleet-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::fetch_status("https://feed/03.json", 404);
        assert_eq!(
            err.to_string(),
            "Fetch failed for https://feed/03.json: HTTP status 404"
        );

        let err = Error::fetch_transport("https://feed/00.json", "connection refused");
        assert!(err.to_string().contains("connection refused"));

        let err = Error::fetch_timeout("https://feed/00.json", Duration::from_secs(30));
        assert!(err.to_string().contains("30s"));

        let err = Error::IndexOutOfRange { index: 5, len: 3 };
        assert_eq!(
            err.to_string(),
            "Index 5 out of range for series of length 3"
        );

        let err = Error::UnknownKey(ObjectKey::new(12));
        assert_eq!(err.to_string(), "Unknown object #12");

        let err = Error::InvalidOffset(-24);
        assert!(err.to_string().contains("-24"));
    }

    #[test]
    fn test_parse_error_source() {
        use std::error::Error as _;

        let err = Error::parse("snapshot 07", ParseError::invalid("bad record"));
        assert!(err.to_string().contains("snapshot 07"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_is_no_data() {
        assert!(Error::IndexOutOfRange { index: 1, len: 1 }.is_no_data());
        assert!(Error::MissingSample { index: 1 }.is_no_data());
        assert!(!Error::UnknownKey(ObjectKey::new(0)).is_no_data());
    }
}
