//! # Dispatcher Module
//!
//! Maps an inbound [`Request`] to one of the attached routers, runs that
//! router's middleware chain around the resolved handler and returns a
//! [`Response`].
//!
//! ## Request Flow
//!
//! 1. A [`RequestContext`](crate::context::RequestContext) is created with a
//!    request id (taken from `x-request-id` when it is a valid ULID)
//! 2. Routers are tried in attachment order; the first whose table matches
//!    method and path serves the request
//! 3. The router's middleware runs outer to inner, then the handler
//! 4. The handler's return value is normalised into a [`Response`]
//!
//! When no router matches, the result is 405 (some router knows the path
//! under another method, listed in `Allow`) or 404.
//!
//! ## Error Handling
//!
//! - `HandlerError::BadRequest` becomes 400 with its message
//! - any other handler error becomes a logged, masked 500
//! - a panic in a handler is caught at the handler call and becomes a 500
//!   that still passes back through the router's middleware
//! - a panic in middleware is caught around the chain; either way the
//!   server keeps serving other requests

mod core;
mod request;
mod response;

pub use core::{Dispatcher, REQUEST_ID_HEADER};
pub use request::{parse_query, HeaderVec, QueryVec, Request, MAX_INLINE_HEADERS};
pub use response::{Body, IntoResponse, Json, Response};
