use std::time::Instant;

use tracing::{field, info, info_span, warn};

use super::{Middleware, Next};
use crate::context::RequestContext;
use crate::dispatcher::{Request, Response};

/// Wraps the rest of the chain in a `request` span and logs completion.
///
/// Span fields: `method`, `path`, `request_id`, plus `status` and
/// `latency_us` recorded once the response is known.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn handle(&self, req: &Request, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let span = info_span!(
            "request",
            method = %req.method(),
            path = %req.path(),
            request_id = %ctx.request_id(),
            route_pattern = ctx.route_pattern().unwrap_or("-"),
            status = field::Empty,
            latency_us = field::Empty,
        );
        let start = Instant::now();
        let res = span.in_scope(|| next.run(req, ctx));
        let latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        span.record("status", res.status.as_u16());
        span.record("latency_us", latency_us);
        span.in_scope(|| {
            if res.status.is_server_error() {
                warn!(status = res.status.as_u16(), latency_us, "Request failed");
            } else {
                info!(status = res.status.as_u16(), latency_us, "Request completed");
            }
        });
        res
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}
