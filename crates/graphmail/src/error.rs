//! Error types for the mail object model.

use std::io;
use std::path::PathBuf;

/// Result type alias for mail operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Mail object model errors.
///
/// Local misuse (`Validation`, `Resource`, `State`) is always reported
/// before any request leaves the process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input to a collection could not be normalized.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Local attachment content could not be read.
    #[error("Cannot read {}: {source}", path.display())]
    Resource {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Operation is not valid in the current lifecycle state.
    #[error("Invalid state for operation: {0}")]
    State(String),

    /// The service rejected the request.
    #[error("{operation} failed: {message}")]
    Remote {
        /// Operation that was attempted (e.g. "create draft").
        operation: String,
        /// Error message reported by the service, if any.
        message: String,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Token acquisition failed.
    #[error("Authentication error: {0}")]
    Auth(#[from] graphmail_oauth::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Creates a state error.
    #[must_use]
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a remote error for `operation`.
    #[must_use]
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns true if the failure happened on the far side of the transport.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Http(_) | Self::Auth(_))
    }

    /// Returns true if the failure was detected locally, before any request.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Resource { .. } | Self::State(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::state("sent").is_local());
        assert!(!Error::state("sent").is_remote());
        assert!(Error::remote("send", "denied").is_remote());
        assert!(!Error::remote("send", "denied").is_local());
    }

    #[test]
    fn test_resource_display() {
        let err = Error::Resource {
            path: PathBuf::from("/tmp/report.pdf"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.to_string(), "Cannot read /tmp/report.pdf: missing");
    }
}
