use http_client::HttpError;
use thiserror::Error;

/// Errors raised by the bridge synchronization layer
///
/// Each variant is a distinct, caller-visible condition. Nothing in this layer
/// special-cases bridge error codes; callers decide which `Api` codes are
/// expected (for example 101, "link button not pressed").
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Connection-level failure that survived the dispatcher's single retry
    #[error("Transport error: {0}")]
    Transport(#[from] HttpError),

    /// The bridge answered with an `error` object
    #[error("Bridge error {code} at '{address}': {description}")]
    Api {
        code: i64,
        address: String,
        description: String,
    },

    /// A non-refreshing read found nothing cached yet
    #[error("No cached value for '{0}'")]
    CacheEmpty(String),

    /// The requested id or key is absent from the cached collection
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The reply lacks the expected shape
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    /// A child cache was used after its parent was dropped
    #[error("Cache '{0}' outlived its parent")]
    CacheDetached(String),
}

impl ApiError {
    /// Bridge error code, if this is an API error
    pub fn api_code(&self) -> Option<i64> {
        match self {
            ApiError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
