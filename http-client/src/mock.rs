//! Scripted in-memory transport for tests
//!
//! Replies are queued per `(method, uri)` pair and consumed in order. A reply
//! registered with [`MockHttpHandler::respond_always`] is returned whenever the
//! queue for that pair is empty. Every request is recorded.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::{HttpError, HttpHandler, HttpRequest, Method};

type RouteKey = (Method, String);

#[derive(Default)]
struct Routes {
    queued: HashMap<RouteKey, VecDeque<Result<String, HttpError>>>,
    sticky: HashMap<RouteKey, String>,
}

/// Transport that answers from a script instead of the network
#[derive(Default)]
pub struct MockHttpHandler {
    routes: Mutex<Routes>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl MockHttpHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one reply body for `method uri`
    pub fn respond(&self, method: Method, uri: &str, body: impl Into<String>) -> &Self {
        self.push(method, uri, Ok(body.into()))
    }

    /// Queue one transport failure for `method uri`
    pub fn fail(&self, method: Method, uri: &str, error: HttpError) -> &Self {
        self.push(method, uri, Err(error))
    }

    /// Answer `method uri` with `body` whenever nothing is queued
    pub fn respond_always(&self, method: Method, uri: &str, body: impl Into<String>) -> &Self {
        self.routes
            .lock()
            .sticky
            .insert((method, uri.to_string()), body.into());
        self
    }

    /// All requests received so far
    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().clone()
    }

    /// Number of requests received for `method uri`
    pub fn call_count(&self, method: Method, uri: &str) -> usize {
        self.calls()
            .iter()
            .filter(|r| r.method == method && r.uri == uri)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls().len()
    }

    fn push(&self, method: Method, uri: &str, reply: Result<String, HttpError>) -> &Self {
        self.routes
            .lock()
            .queued
            .entry((method, uri.to_string()))
            .or_default()
            .push_back(reply);
        self
    }
}

impl HttpHandler for MockHttpHandler {
    fn send(&self, request: &HttpRequest) -> Result<String, HttpError> {
        self.calls.lock().push(request.clone());

        let key = (request.method, request.uri.clone());
        let mut routes = self.routes.lock();

        if let Some(reply) = routes.queued.get_mut(&key).and_then(VecDeque::pop_front) {
            return reply;
        }
        routes.sticky.get(&key).cloned().ok_or_else(|| {
            HttpError::Network(format!("unexpected request: {} {}", request.method, request.uri))
        })
    }
}
