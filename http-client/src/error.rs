//! Error types for the HTTP transport

use thiserror::Error;

/// Errors that can occur while exchanging a request with the bridge
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// Connection-level failure that is worth one more attempt
    ///
    /// The bridge drops or stalls connections when it is busy, which surfaces
    /// as a connection reset or a timeout.
    #[error("Transient network error: {0}")]
    Transient(String),

    /// Any other network or I/O failure
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The bridge answered with a non-success HTTP status
    #[error("HTTP status {0}")]
    Status(u16),
}

impl HttpError {
    /// Whether a caller may retry the same request
    pub fn is_transient(&self) -> bool {
        matches!(self, HttpError::Transient(_))
    }

    /// Classify an I/O failure by its kind
    pub fn from_io(error: &std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::TimedOut => {
                HttpError::Transient(error.to_string())
            }
            _ => HttpError::Network(error.to_string()),
        }
    }
}
