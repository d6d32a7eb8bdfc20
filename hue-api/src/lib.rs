//! # Hue API
//!
//! The command channel to a Hue bridge: every read and write the SDK performs
//! goes through a [`CommandDispatcher`], which enforces a minimum delay between
//! requests, retries one transient transport failure, and returns the parsed
//! JSON reply.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hue_api::CommandDispatcher;
//! use http_client::UreqHandler;
//! use serde_json::json;
//!
//! let commands = CommandDispatcher::new("192.168.2.116", 80, "username", Arc::new(UreqHandler::new()));
//! let lights = commands.get("/lights", &json!({}))?;
//! # Ok::<(), hue_api::ApiError>(())
//! ```
//!
//! The [`reply`] module validates the bridge's success/error reply arrays.

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod reply;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-support"))]
pub use clock::ManualClock;
pub use dispatcher::{CommandDispatcher, RateLimitState, DEFAULT_MIN_DELAY};
pub use error::{ApiError, Result};

pub use http_client::{HttpError, HttpHandler, HttpRequest, Method};
#[cfg(feature = "test-support")]
pub use http_client::mock;
