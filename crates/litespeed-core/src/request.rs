//! HTTP request types.
//!
//! A [`Request`] is built once per connection/request by the wire layer (or a
//! test client) and handed to handlers read-only. Cookie and uploaded-file
//! parsing are external collaborators: the maps are carried here, populated
//! by whoever constructs the request.

use serde::Serialize;
use std::collections::HashMap;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

impl Method {
    /// Parse a method token (case-insensitive).
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            "TRACE" => Some(Self::Trace),
            _ => None,
        }
    }

    /// The uppercase verb.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive HTTP header collection.
///
/// Names are normalized to lowercase on insert.
#[derive(Debug, Default, Clone)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Insert a header, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Check for a header by name (case-insensitive).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_ascii_lowercase())
    }

    /// Iterate over all `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no headers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Multi-valued query parameters.
///
/// The same key may appear several times in a query string; every value is
/// kept in appearance order.
#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    inner: HashMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for a key.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(key.into()).or_default().push(value.into());
    }

    /// First value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values for a key, in appearance order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.inner.get(key).map_or(&[], Vec::as_slice)
    }

    /// Check whether a key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Iterate over `(key, values)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of key/value pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.values().map(Vec::len).sum()
    }

    /// True when no parameters are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// A parsed request cookie: value plus any attributes the collaborator
/// attached (e.g. `Path`, `Max-Age`).
#[derive(Debug, Clone, Serialize)]
pub struct Cookie {
    /// The cookie value.
    pub value: String,
    /// Attribute name/value pairs.
    pub attributes: HashMap<String, String>,
}

impl Cookie {
    /// Create a cookie with no attributes.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            attributes: HashMap::new(),
        }
    }
}

/// An uploaded file entry, already parsed out of the request body by an
/// external collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    /// The client-supplied file name.
    pub filename: String,
    /// The declared content type.
    pub content_type: String,
    /// Raw file bytes.
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// One HTTP request, read-only for handlers.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: QueryParams,
    headers: Headers,
    cookies: HashMap<String, Cookie>,
    files: HashMap<String, UploadedFile>,
    body: Vec<u8>,
}

impl Request {
    /// Create a request with the given method and (percent-decoded) path.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            headers: Headers::new(),
            cookies: HashMap::new(),
            files: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// The raw request path (query string excluded).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters.
    #[must_use]
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to headers (construction time only).
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Parsed cookies.
    #[must_use]
    pub fn cookies(&self) -> &HashMap<String, Cookie> {
        &self.cookies
    }

    /// Uploaded files by field name.
    #[must_use]
    pub fn files(&self) -> &HashMap<String, UploadedFile> {
        &self.files
    }

    /// Raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replace the query parameters.
    pub fn set_query(&mut self, query: QueryParams) {
        self.query = query;
    }

    /// Insert a cookie.
    pub fn insert_cookie(&mut self, name: impl Into<String>, cookie: Cookie) {
        self.cookies.insert(name.into(), cookie);
    }

    /// Insert an uploaded file entry.
    pub fn insert_file(&mut self, field: impl Into<String>, file: UploadedFile) {
        self.files.insert(field.into(), file);
    }

    /// Replace the body bytes.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    /// A JSON view of the request (method, path, query, headers, cookies,
    /// uploaded field names). Useful for echo/debug handlers.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let query: serde_json::Map<String, serde_json::Value> = self
            .query
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::from(v.to_vec())))
            .collect();
        let headers: serde_json::Map<String, serde_json::Value> = self
            .headers
            .iter()
            .map(|(n, v)| (n.to_string(), serde_json::Value::from(v)))
            .collect();
        let cookies = serde_json::to_value(&self.cookies).unwrap_or_default();
        let files: Vec<&str> = self.files.keys().map(String::as_str).collect();

        serde_json::json!({
            "method": self.method.as_str(),
            "path": self.path,
            "query": query,
            "headers": headers,
            "cookies": cookies,
            "files": files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(Method::parse("get"), Some(Method::Get));
        assert_eq!(Method::parse("Post"), Some(Method::Post));
        assert_eq!(Method::parse("BREW"), None);
    }

    #[test]
    fn headers_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(headers.contains("Content-type"));
    }

    #[test]
    fn query_params_keep_multiple_values() {
        let mut query = QueryParams::new();
        query.append("a", "1");
        query.append("b", "2");
        query.append("a", "3");

        assert_eq!(query.get("a"), Some("1"));
        assert_eq!(query.get_all("a"), &["1".to_string(), "3".to_string()]);
        assert_eq!(query.len(), 3);
    }

    #[test]
    fn request_json_echo_includes_query_and_method() {
        let mut request = Request::new(Method::Get, "/json/");
        let mut query = QueryParams::new();
        query.append("test", "value");
        request.set_query(query);
        request.insert_cookie("session", Cookie::new("abc"));

        let value = request.to_json();
        assert_eq!(value["method"], "GET");
        assert_eq!(value["path"], "/json/");
        assert_eq!(value["query"]["test"][0], "value");
        assert_eq!(value["cookies"]["session"]["value"], "abc");
    }
}
