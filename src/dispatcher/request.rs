use http::Method;
use serde::de::DeserializeOwned;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum inline headers before heap allocation.
/// Most requests have ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path.
///
/// Header names are stored lowercased as `Arc<str>` so lookups are
/// case-insensitive and repeated names clone in O(1).
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Stack-allocated query parameter storage (same layout as path params).
pub type QueryVec = SmallVec<[(Arc<str>, String); 8]>;

/// An inbound HTTP request as seen by middleware and handlers.
///
/// Parsed once per request by the server adapter and never mutated afterwards;
/// middleware that wants to rewrite a request builds a new one and passes it
/// to `next`.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: String,
    path: String,
    query: QueryVec,
    headers: HeaderVec,
    body: Vec<u8>,
}

impl Request {
    /// Create a request for `uri` (path plus optional query string).
    #[must_use]
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let (path, query) = match uri.split_once('?') {
            Some((path, qs)) => (path.to_string(), parse_query(qs)),
            None => (uri.clone(), QueryVec::new()),
        };
        let path = if path.is_empty() { "/".to_string() } else { path };
        Self {
            method,
            uri,
            path,
            query,
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }

    /// Append a header. Names are case-insensitive.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.push_header(name, value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the JSON body and set `content-type`.
    #[must_use]
    pub fn with_json(self, value: &serde_json::Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(value.to_string())
    }

    pub(crate) fn push_header(&mut self, name: &str, value: String) {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value));
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path and query string exactly as received.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    /// Convert headers to HashMap.
    /// Note: This allocates - use header() in hot paths
    #[must_use]
    pub fn headers_map(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Get a query parameter by name.
    ///
    /// Uses "last write wins" semantics for repeated names (`?a=1&a=2`).
    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn query(&self) -> &QueryVec {
        &self.query
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is empty or malformed.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Token from an `Authorization: Bearer <token>` header.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Decode an `a=1&b=two` query string.
#[must_use]
pub fn parse_query(qs: &str) -> QueryVec {
    url::form_urlencoded::parse(qs.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}
