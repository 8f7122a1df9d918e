//! In-process test client.
//!
//! Drives the dispatcher directly, no sockets involved. Build a request
//! (or just a method + target string), get a [`TestResponse`] back.

use crate::app::App;
use crate::dispatch::dispatch;
use litespeed_core::{Method, Request, Response};
use litespeed_http::parse_query;
use std::sync::Arc;

/// Sends synthetic requests through an application.
pub struct TestClient {
    app: Arc<App>,
}

impl TestClient {
    /// Wrap an application.
    #[must_use]
    pub fn new(app: App) -> Self {
        Self { app: Arc::new(app) }
    }

    /// The wrapped application (for hub access etc.).
    #[must_use]
    pub fn app(&self) -> &App {
        &self.app
    }

    /// GET a target (`/path/?query=...`).
    #[must_use]
    pub fn get(&self, target: &str) -> TestResponse {
        self.request(Method::Get, target)
    }

    /// POST to a target.
    #[must_use]
    pub fn post(&self, target: &str) -> TestResponse {
        self.request(Method::Post, target)
    }

    /// Send an arbitrary method to a target.
    #[must_use]
    pub fn request(&self, method: Method, target: &str) -> TestResponse {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };
        let mut request = Request::new(method, path);
        if let Some(query) = query {
            request.set_query(parse_query(query));
        }
        self.send(&request)
    }

    /// Dispatch a fully built request (custom headers, cookies, body).
    #[must_use]
    pub fn send(&self, request: &Request) -> TestResponse {
        TestResponse {
            inner: dispatch(&self.app, request),
        }
    }
}

/// A dispatched response with convenience accessors.
#[derive(Debug)]
pub struct TestResponse {
    inner: Response,
}

impl TestResponse {
    /// The status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.inner.status()
    }

    /// First header value with the given name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.find_header(name)
    }

    /// Raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.inner.body_bytes()
    }

    /// Body as (lossy) text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.inner.body_bytes()).into_owned()
    }

    /// Body parsed as JSON.
    ///
    /// # Errors
    /// Propagates deserialization failures.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(self.inner.body_bytes())
    }

    /// The underlying response.
    #[must_use]
    pub fn into_inner(self) -> Response {
        self.inner
    }
}
