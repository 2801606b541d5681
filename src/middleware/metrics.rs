use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::{Middleware, Next};
use crate::context::RequestContext;
use crate::dispatcher::{Request, Response};

/// Request metrics collected with atomics.
///
/// Tracks request counts, cumulative latency, responses per status class,
/// authentication failures (401s) and hits per route pattern. Counters use
/// `Ordering::Relaxed`; a snapshot is eventually consistent.
///
/// Register one instance on every router that should be counted; share it
/// through an `Arc` and [`Router::middleware_arc`](crate::router::Router::middleware_arc).
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    status_classes: [AtomicUsize; 5],
    auth_failures: AtomicUsize,
    stack_size: AtomicUsize,
    route_hits: DashMap<String, usize>,
}

impl Default for MetricsMiddleware {
    fn default() -> Self {
        Self {
            request_count: AtomicUsize::new(0),
            total_latency_ns: AtomicU64::new(0),
            status_classes: Default::default(),
            auth_failures: AtomicUsize::new(0),
            stack_size: AtomicUsize::new(0),
            route_hits: DashMap::new(),
        }
    }
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of requests that passed through this middleware
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean processing time, zero before the first request.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Responses with status `class`xx (1 through 5).
    #[must_use]
    pub fn status_class_count(&self, class: u16) -> usize {
        match class {
            1..=5 => self.status_classes[usize::from(class - 1)].load(Ordering::Relaxed),
            _ => 0,
        }
    }

    #[must_use]
    pub fn auth_failures(&self) -> usize {
        self.auth_failures.load(Ordering::Relaxed)
    }

    /// Hits recorded for a route pattern such as `/hello/<name>`.
    #[must_use]
    pub fn route_hits(&self, pattern: &str) -> usize {
        self.route_hits.get(pattern).map_or(0, |v| *v)
    }

    /// Coroutine stack size observed on the last request.
    #[must_use]
    pub fn stack_size(&self) -> usize {
        self.stack_size.load(Ordering::Relaxed)
    }

    /// All counters as a JSON object, for a `/metrics` endpoint.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let mut routes = serde_json::Map::new();
        for entry in &self.route_hits {
            routes.insert(entry.key().clone(), Value::from(*entry.value()));
        }
        json!({
            "requests": self.request_count(),
            "average_latency_us": u64::try_from(self.average_latency().as_micros())
                .unwrap_or(u64::MAX),
            "status": {
                "1xx": self.status_class_count(1),
                "2xx": self.status_class_count(2),
                "3xx": self.status_class_count(3),
                "4xx": self.status_class_count(4),
                "5xx": self.status_class_count(5),
            },
            "auth_failures": self.auth_failures(),
            "stack_size": self.stack_size(),
            "routes": routes,
        })
    }

    /// Counters in the Prometheus text exposition format.
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let mut out = format!(
            "# HELP oxrouter_requests_total Total number of handled requests\n\
             # TYPE oxrouter_requests_total counter\n\
             oxrouter_requests_total {}\n\
             # HELP oxrouter_request_latency_seconds Average request latency in seconds\n\
             # TYPE oxrouter_request_latency_seconds gauge\n\
             oxrouter_request_latency_seconds {}\n\
             # HELP oxrouter_auth_failures_total Requests answered with 401\n\
             # TYPE oxrouter_auth_failures_total counter\n\
             oxrouter_auth_failures_total {}\n\
             # HELP oxrouter_coroutine_stack_bytes Coroutine stack size\n\
             # TYPE oxrouter_coroutine_stack_bytes gauge\n\
             oxrouter_coroutine_stack_bytes {}\n\
             # HELP oxrouter_responses_total Responses by status class\n\
             # TYPE oxrouter_responses_total counter\n",
            self.request_count(),
            self.average_latency().as_secs_f64(),
            self.auth_failures(),
            self.stack_size(),
        );
        for class in 1..=5u16 {
            out.push_str(&format!(
                "oxrouter_responses_total{{class=\"{class}xx\"}} {}\n",
                self.status_class_count(class)
            ));
        }
        out.push_str(
            "# HELP oxrouter_route_hits_total Requests per route pattern\n\
             # TYPE oxrouter_route_hits_total counter\n",
        );
        for entry in &self.route_hits {
            out.push_str(&format!(
                "oxrouter_route_hits_total{{route=\"{}\"}} {}\n",
                entry.key().replace('"', "\\\""),
                entry.value()
            ));
        }
        out
    }

    fn record_stack(&self) {
        let size = if may::coroutine::is_coroutine() {
            may::coroutine::current().stack_size()
        } else {
            may::config().get_stack_size()
        };
        self.stack_size.store(size, Ordering::Relaxed);
    }
}

impl Middleware for MetricsMiddleware {
    fn handle(&self, req: &Request, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        if let Some(pattern) = ctx.route_pattern() {
            *self.route_hits.entry(pattern.to_string()).or_insert(0) += 1;
        }

        let start = Instant::now();
        let res = next.run(req, ctx);
        let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.total_latency_ns.fetch_add(elapsed, Ordering::Relaxed);

        let class = res.status.as_u16() / 100;
        if (1..=5).contains(&class) {
            self.status_classes[usize::from(class - 1)].fetch_add(1, Ordering::Relaxed);
        }
        if res.status == http::StatusCode::UNAUTHORIZED {
            self.auth_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.record_stack();
        res
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}
