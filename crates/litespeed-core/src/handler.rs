//! Handler signature, result union, and response normalization.
//!
//! Handlers are plain synchronous functions from a request plus extracted
//! path arguments to a [`HandlerResult`] (or a [`HandlerError`]). Every
//! result variant normalizes into a complete [`Response`] through
//! [`HandlerResult::into_response`]; the normalization is total, so the
//! dispatcher never has to special-case a handler return shape.

use crate::request::Request;
use crate::response::Response;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// Payload
// ============================================================================

/// A response body: text or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    /// Consume into raw bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(s) => s.into_bytes(),
            Self::Binary(b) => b,
        }
    }

    /// Byte length of the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Binary(b) => b.len(),
        }
    }

    /// True when the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Self::Binary(b)
    }
}

impl From<&[u8]> for Payload {
    fn from(b: &[u8]) -> Self {
        Self::Binary(b.to_vec())
    }
}

// ============================================================================
// HandlerResult
// ============================================================================

/// Everything a handler may return. A closed union: the dispatcher
/// normalizes each variant the same way every time.
#[derive(Debug, Clone)]
pub enum HandlerResult {
    /// Body only; status 200, no headers.
    Body(Payload),
    /// Body plus explicit status.
    BodyStatus(Payload, u16),
    /// Body, status, and extra headers.
    BodyStatusHeaders(Payload, u16, Vec<(String, String)>),
    /// Text fragments concatenated in order into one 200 body.
    Fragments(Vec<String>),
    /// A rendered template: body plus content-type header, status 200.
    Rendered {
        body: String,
        headers: Vec<(String, String)>,
    },
    /// A served file (possibly a byte range): body, headers, status.
    Served {
        body: Vec<u8>,
        headers: Vec<(String, String)>,
        status: u16,
    },
    /// A JSON document; serialized with `application/json`, status 200.
    Structured(serde_json::Value),
}

impl HandlerResult {
    /// Serialize a value to a [`HandlerResult::Structured`] result.
    ///
    /// # Errors
    /// Returns [`HandlerError::Failed`] when serialization fails.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        serde_json::to_value(value)
            .map(Self::Structured)
            .map_err(|e| HandlerError::Failed(format!("json serialization: {e}")))
    }

    /// Normalize into a complete [`Response`].
    ///
    /// Total: every variant produces a well-formed response. Defaults are
    /// status 200 and no headers; the wire layer supplies `content-length`.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Body(payload) => Response::new(200).body(payload.into_bytes()),
            Self::BodyStatus(payload, status) => {
                Response::new(status).body(payload.into_bytes())
            }
            Self::BodyStatusHeaders(payload, status, headers) => {
                let mut response = Response::new(status).body(payload.into_bytes());
                for (name, value) in headers {
                    response.push_header(name, value);
                }
                response
            }
            Self::Fragments(parts) => Response::new(200).body(parts.concat()),
            Self::Rendered { body, headers } => {
                let mut response = Response::new(200).body(body);
                for (name, value) in headers {
                    response.push_header(name, value);
                }
                response
            }
            Self::Served {
                body,
                headers,
                status,
            } => {
                let mut response = Response::new(status).body(body);
                for (name, value) in headers {
                    response.push_header(name, value);
                }
                response
            }
            Self::Structured(value) => Response::new(200)
                .header("content-type", "application/json")
                .body(value.to_string()),
        }
    }
}

impl From<&str> for HandlerResult {
    fn from(s: &str) -> Self {
        Self::Body(s.into())
    }
}

impl From<String> for HandlerResult {
    fn from(s: String) -> Self {
        Self::Body(s.into())
    }
}

impl From<Vec<u8>> for HandlerResult {
    fn from(b: Vec<u8>) -> Self {
        Self::Body(b.into())
    }
}

impl From<serde_json::Value> for HandlerResult {
    fn from(value: serde_json::Value) -> Self {
        Self::Structured(value)
    }
}

// ============================================================================
// HandlerError
// ============================================================================

/// Failure modes a handler (or its collaborators) can surface.
#[derive(Debug)]
pub enum HandlerError {
    /// The addressed resource does not exist (404).
    NotFound,
    /// A requested byte range cannot be satisfied (416).
    RangeNotSatisfiable { start: u64, length: u64 },
    /// A path argument failed type coercion (500).
    BadArgument(String),
    /// An I/O failure while producing the response (500).
    Io(std::io::Error),
    /// Any other handler failure (500).
    Failed(String),
}

impl HandlerError {
    /// The status code this error maps to.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::RangeNotSatisfiable { .. } => 416,
            Self::BadArgument(_) | Self::Io(_) | Self::Failed(_) => 500,
        }
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "resource not found"),
            Self::RangeNotSatisfiable { start, length } => {
                write!(f, "range start {start} outside resource of length {length}")
            }
            Self::BadArgument(msg) => write!(f, "bad path argument: {msg}"),
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::Failed(msg) => write!(f, "handler failed: {msg}"),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ============================================================================
// PathArgs
// ============================================================================

/// Arguments extracted from the matched route pattern's capture groups,
/// in appearance order. Named groups carry their name.
#[derive(Debug, Clone, Default)]
pub struct PathArgs {
    entries: Vec<(Option<String>, String)>,
}

impl PathArgs {
    /// No arguments.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from `(name, value)` entries in appearance order.
    #[must_use]
    pub fn from_entries(entries: Vec<(Option<String>, String)>) -> Self {
        Self { entries }
    }

    /// Number of extracted arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no arguments were extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Positional lookup.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(_, v)| v.as_str())
    }

    /// Named lookup.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.as_deref() == Some(name))
            .map(|(_, v)| v.as_str())
    }

    /// Positional lookup with `FromStr` coercion.
    ///
    /// # Errors
    /// Returns [`HandlerError::BadArgument`] when the argument is missing or
    /// fails to parse.
    pub fn parse<T>(&self, index: usize) -> Result<T, HandlerError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self
            .get(index)
            .ok_or_else(|| HandlerError::BadArgument(format!("no argument at index {index}")))?;
        raw.parse()
            .map_err(|e| HandlerError::BadArgument(format!("argument {index} ({raw:?}): {e}")))
    }

    /// Named lookup with `FromStr` coercion.
    ///
    /// # Errors
    /// Returns [`HandlerError::BadArgument`] when the argument is missing or
    /// fails to parse.
    pub fn parse_named<T>(&self, name: &str) -> Result<T, HandlerError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self
            .named(name)
            .ok_or_else(|| HandlerError::BadArgument(format!("no argument named {name:?}")))?;
        raw.parse()
            .map_err(|e| HandlerError::BadArgument(format!("argument {name:?} ({raw:?}): {e}")))
    }
}

/// What a handler returns.
pub type HandlerOutcome = Result<HandlerResult, HandlerError>;

/// A shared, thread-safe route handler.
pub type Handler = Arc<dyn Fn(&Request, &PathArgs) -> HandlerOutcome + Send + Sync>;
