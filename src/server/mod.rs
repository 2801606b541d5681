//! HTTP transport adapter built on `may_minihttp`.
//!
//! Connection handling stays inside `may_minihttp`; this module converts its
//! requests into [`Request`](crate::dispatcher::Request)s, hands them to the
//! [`Dispatcher`](crate::dispatcher::Dispatcher) and writes the result back.

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_request, Rejection};
pub use response::{
    intern_header_line, write_response, MAX_INTERNED_HEADERS, MAX_LEAKED_REQUEST_IDS,
};
pub use service::{AppService, DEFAULT_MAX_BODY_BYTES};
