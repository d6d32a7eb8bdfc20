//! Private HTTP transport for Hue bridge communication
//!
//! This crate provides the single capability the rest of the SDK needs from
//! the network: send a request with a JSON text body to the bridge and hand
//! back the response body. The [`HttpHandler`] trait is the seam; [`UreqHandler`]
//! is the blocking implementation used in production.

mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use error::HttpError;

use std::fmt;
use std::time::Duration;

/// HTTP methods understood by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request to the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Host name or IP address of the bridge
    pub address: String,
    pub port: u16,
    /// Absolute path, e.g. `/api/<username>/lights`
    pub uri: String,
    /// JSON text sent as the request body
    pub body: String,
}

/// Capability to exchange one request with the bridge
///
/// Implementations must be shareable between threads; the dispatcher keeps
/// them behind an `Arc`.
pub trait HttpHandler: Send + Sync {
    /// Send `request` and return the raw response body
    fn send(&self, request: &HttpRequest) -> Result<String, HttpError>;
}

/// Blocking transport backed by a `ureq` agent
#[derive(Debug, Clone)]
pub struct UreqHandler {
    agent: ureq::Agent,
}

impl UreqHandler {
    /// Create a new handler with default timeouts
    pub fn new() -> Self {
        Self::with_timeouts(Duration::from_secs(5), Duration::from_secs(10))
    }

    /// Create a handler with explicit connect and read timeouts
    pub fn with_timeouts(connect: Duration, read: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(connect)
                .timeout_read(read)
                .build(),
        }
    }
}

impl Default for UreqHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpHandler for UreqHandler {
    fn send(&self, request: &HttpRequest) -> Result<String, HttpError> {
        let url = format!("http://{}:{}{}", request.address, request.port, request.uri);
        tracing::trace!(method = %request.method, %url, "sending bridge request");

        let response = self
            .agent
            .request(request.method.as_str(), &url)
            .set("Content-Type", "application/json")
            .send_string(&request.body)
            .map_err(classify_ureq_error)?;

        response.into_string().map_err(|e| HttpError::from_io(&e))
    }
}

fn classify_ureq_error(error: ureq::Error) -> HttpError {
    match error {
        ureq::Error::Status(code, _) => HttpError::Status(code),
        ureq::Error::Transport(transport) => {
            let io_error = std::error::Error::source(&transport)
                .and_then(|source| source.downcast_ref::<std::io::Error>());
            match io_error {
                Some(io_error) => HttpError::from_io(io_error),
                None => HttpError::Network(transport.to_string()),
            }
        }
    }
}
