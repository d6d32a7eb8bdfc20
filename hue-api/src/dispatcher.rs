//! Rate-limited command channel to the bridge
//!
//! The bridge drops requests when it is flooded, so every call waits until a
//! shared "next allowed" instant before it is sent. All dispatcher clones made
//! from one connection share that instant.
//!
//! A caller claims its send slot while holding the lock, so two send instants
//! are never closer than the minimum delay. The HTTP exchanges themselves are
//! not serialized and may overlap; callers that need the round trips ordered
//! must add their own locking.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http_client::{HttpHandler, HttpRequest, Method};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::{ApiError, Result};

/// Default minimum spacing between two requests
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(100);

/// Throttle clock shared by every handle of one bridge connection
#[derive(Debug)]
pub struct RateLimitState {
    min_delay: Duration,
    next_allowed: Mutex<Instant>,
}

impl RateLimitState {
    pub fn new(min_delay: Duration, now: Instant) -> Self {
        Self {
            min_delay,
            next_allowed: Mutex::new(now),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn next_allowed(&self) -> Instant {
        *self.next_allowed.lock()
    }

    /// Block until the next request may be sent and reserve that instant
    ///
    /// The guard is held across the sleep, so waiting callers queue up and
    /// each one pushes `next_allowed` forward before the next can pass.
    /// Returns the claimed send instant.
    fn claim_slot(&self, clock: &dyn Clock) -> Instant {
        let mut next_allowed = self.next_allowed.lock();
        if clock.now() < *next_allowed {
            clock.sleep_until(*next_allowed);
        }
        let sent_at = clock.now();
        let candidate = sent_at + self.min_delay;
        if candidate > *next_allowed {
            *next_allowed = candidate;
        }
        sent_at
    }
}

/// Sends GET/PUT/POST/DELETE requests to `/api/<username>/...`
///
/// Cloning is cheap and shares the transport, clock and throttle.
#[derive(Clone)]
pub struct CommandDispatcher {
    address: String,
    port: u16,
    username: String,
    handler: Arc<dyn HttpHandler>,
    clock: Arc<dyn Clock>,
    throttle: Arc<RateLimitState>,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("min_delay", &self.throttle.min_delay)
            .finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    /// Create a dispatcher using the system clock and [`DEFAULT_MIN_DELAY`]
    pub fn new(
        address: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        handler: Arc<dyn HttpHandler>,
    ) -> Self {
        Self::with_clock(address, port, username, handler, Arc::new(SystemClock), DEFAULT_MIN_DELAY)
    }

    pub fn with_clock(
        address: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        handler: Arc<dyn HttpHandler>,
        clock: Arc<dyn Clock>,
        min_delay: Duration,
    ) -> Self {
        let throttle = Arc::new(RateLimitState::new(min_delay, clock.now()));
        Self {
            address: address.into(),
            port,
            username: username.into(),
            handler,
            clock,
            throttle,
        }
    }

    /// Derive a handle for other credentials that shares this throttle
    pub fn with_username(&self, username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..self.clone()
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn rate_limit(&self) -> &Arc<RateLimitState> {
        &self.throttle
    }

    pub fn get(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::Get, path, body)
    }

    pub fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::Put, path, body)
    }

    pub fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::Post, path, body)
    }

    pub fn delete(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::Delete, path, body)
    }

    /// Full request URI for a path relative to the user's API root
    pub fn combined_path(&self, path: &str) -> String {
        let separator = if path.is_empty() || path.starts_with('/') { "" } else { "/" };
        if self.username.is_empty() {
            format!("/api{separator}{path}")
        } else {
            format!("/api/{}{separator}{path}", self.username)
        }
    }

    fn request(&self, method: Method, path: &str, body: &Value) -> Result<Value> {
        let request = HttpRequest {
            method,
            address: self.address.clone(),
            port: self.port,
            uri: self.combined_path(path),
            body: body.to_string(),
        };

        self.throttle.claim_slot(self.clock.as_ref());
        let first = self.handler.send(&request);

        let text = match first {
            Ok(text) => text,
            Err(error) if error.is_transient() => {
                warn!(method = %method, uri = %request.uri, %error, "transient transport error, retrying once");
                self.throttle.claim_slot(self.clock.as_ref());
                self.handler.send(&request)?
            }
            Err(error) => return Err(error.into()),
        };

        debug!(method = %method, uri = %request.uri, "bridge request completed");
        parse_reply(&text)
    }
}

fn parse_reply(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Err(ApiError::MalformedReply("empty reply body".to_string()));
    }
    serde_json::from_str(text).map_err(|e| ApiError::MalformedReply(e.to_string()))
}
