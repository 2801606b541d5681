//! Middleware: the onion-style chain and the bundled interceptors.

mod auth;
mod core;
mod metrics;
mod tracing;

pub use auth::{AuthMiddleware, CLAIMS_KEY};
pub use core::{from_fn, Endpoint, FnMiddleware, Middleware, MiddlewareChain, Next};
pub use metrics::MetricsMiddleware;
pub use tracing::TracingMiddleware;
