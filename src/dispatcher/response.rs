use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

use super::request::HeaderVec;

/// Response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    /// UTF-8 text, sent as `text/plain` unless a content type is set
    Text(String),
    /// JSON value, sent as `application/json`
    Json(Value),
    /// Raw bytes; the content type must be set explicitly
    Bytes(Vec<u8>),
}

/// The single response shape every handler return value normalises to.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code
    pub status: StatusCode,
    /// Extra response headers (lowercase names)
    pub headers: HeaderVec,
    pub body: Body,
}

impl Response {
    #[must_use]
    pub fn new(status: StatusCode, body: Body) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body,
        }
    }

    #[must_use]
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self::new(status, Body::Json(body))
    }

    #[must_use]
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, Body::Text(body.into()))
    }

    #[must_use]
    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, Body::Text(body.into())).with_header("content-type", "text/html")
    }

    #[must_use]
    pub fn bytes(status: StatusCode, content_type: &str, body: Vec<u8>) -> Self {
        Self::new(status, Body::Bytes(body)).with_header("content-type", content_type)
    }

    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, Body::Empty)
    }

    /// `{"error": message}` with the given status.
    #[must_use]
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Add or replace a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value.into());
        self
    }

    /// Add or replace a header (case-insensitive match on the name).
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value));
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Explicit content type, or the default implied by the body.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        if let Some(ct) = self.header("content-type") {
            return Some(ct);
        }
        match &self.body {
            Body::Empty => None,
            Body::Text(_) => Some("text/plain; charset=utf-8"),
            Body::Json(_) => Some("application/json"),
            Body::Bytes(_) => Some("application/octet-stream"),
        }
    }

    /// Body serialized to wire bytes.
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            Body::Empty => Vec::new(),
            Body::Text(s) => s.as_bytes().to_vec(),
            Body::Json(v) => v.to_string().into_bytes(),
            Body::Bytes(b) => b.clone(),
        }
    }

    /// Body as text, for tests and logging.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes()).into_owned()
    }
}

/// Conversion from a handler's return value into a [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

/// A JSON mapping or value: 200 with a JSON body.
impl IntoResponse for Value {
    fn into_response(self) -> Response {
        Response::json(StatusCode::OK, self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(StatusCode::OK, self)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(StatusCode::OK, self)
    }
}

/// A bare status: empty body.
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        Response::empty(self)
    }
}

impl IntoResponse for i64 {
    fn into_response(self) -> Response {
        Response::json(StatusCode::OK, Value::from(self))
    }
}

impl IntoResponse for i32 {
    fn into_response(self) -> Response {
        Response::json(StatusCode::OK, Value::from(self))
    }
}

/// `(body, status)`: the body's response with its status overridden.
impl<T: IntoResponse> IntoResponse for (T, StatusCode) {
    fn into_response(self) -> Response {
        let mut res = self.0.into_response();
        res.status = self.1;
        res
    }
}

/// Serialize any `T: Serialize` as a 200 JSON body.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.0) {
            Ok(v) => Response::json(StatusCode::OK, v),
            Err(e) => {
                error!(error = %e, "Failed to serialize JSON response body");
                Response::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}
