//! # Router Module
//!
//! Path matching, route tables and the [`Router`] that groups routes with
//! their middleware.
//!
//! ## Overview
//!
//! - [`PathPattern`] compiles `/users/<id>` (or `/users/{id}`) once at
//!   registration and matches request paths segment by segment.
//! - [`RouteTable`] keeps `(method, pattern) -> handler` bindings in
//!   registration order and resolves a request to a match, a 405 or a 404.
//! - [`Router`] owns one table, one middleware chain and a mount prefix.
//!
//! ## Example
//!
//! ```rust
//! use oxrouter::router::{get, Router};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = Router::new();
//! router.route(get("/hello/<name>", |input| {
//!     Ok(format!("Hello {}", input.param("name")?))
//! }))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Resolution policy
//!
//! Resolution is a linear scan; the first registered route whose pattern and
//! method match wins. Registering the same method twice for the same pattern
//! shape (placeholder names ignored) is rejected with
//! [`RouteError::Conflict`].

mod core;
mod pattern;
mod route;
mod table;

pub use core::Router;
pub use pattern::{ParamVec, PathParams, PathPattern, PatternError, Segment, MAX_INLINE_PARAMS};
pub use route::{
    delete, get, handler_fn, head, options, patch, post, put, FnHandler, Handler, HandlerError,
    HandlerInput, Route,
};
pub use table::{Resolution, RouteEntry, RouteError, RouteMatch, RouteTable};
