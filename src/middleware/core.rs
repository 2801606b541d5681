use std::sync::Arc;

use crate::context::RequestContext;
use crate::dispatcher::{Request, Response};

/// A request interceptor.
///
/// Middleware sees the request and the per-request context before anything
/// downstream, decides whether to continue with `next`, and sees the final
/// response on the way back out:
///
/// ```text
/// A.pre -> B.pre -> handler -> B.post -> A.post
/// ```
///
/// Returning without calling `next` short-circuits the rest of the chain.
pub trait Middleware: Send + Sync {
    fn handle(&self, req: &Request, ctx: &mut RequestContext, next: Next<'_>) -> Response;

    /// Label used in route dumps and logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The innermost link of a chain, normally the resolved route handler.
pub trait Endpoint {
    fn call(&self, req: &Request, ctx: &mut RequestContext) -> Response;
}

impl<F> Endpoint for F
where
    F: Fn(&Request, &mut RequestContext) -> Response,
{
    fn call(&self, req: &Request, ctx: &mut RequestContext) -> Response {
        self(req, ctx)
    }
}

/// The remainder of the chain after the current middleware.
///
/// `Next` is `Copy`; a middleware may run it zero times (short-circuit),
/// once (the usual case) or several times (retries).
#[derive(Clone, Copy)]
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(rest: &'a [Arc<dyn Middleware>], endpoint: &'a dyn Endpoint) -> Self {
        Self { rest, endpoint }
    }

    /// Continue with the next middleware, or the endpoint when none is left.
    ///
    /// The request may be a rewritten copy of the one this middleware received.
    pub fn run(self, req: &Request, ctx: &mut RequestContext) -> Response {
        match self.rest.split_first() {
            Some((current, rest)) => current.handle(req, ctx, Next::new(rest, self.endpoint)),
            None => self.endpoint.call(req, ctx),
        }
    }

    /// Number of middleware still ahead of the endpoint.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

/// Ordered middleware owned by one router.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `middleware`; it runs inside everything registered before it.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(middleware);
    }

    /// Run the chain around `endpoint`, outermost layer first.
    pub fn run(
        &self,
        req: &Request,
        ctx: &mut RequestContext,
        endpoint: &dyn Endpoint,
    ) -> Response {
        Next::new(&self.layers, endpoint).run(req, ctx)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.layers.iter().map(|m| m.name())
    }
}

/// Middleware built from a closure; see [`from_fn`].
pub struct FnMiddleware<F> {
    f: F,
    name: &'static str,
}

impl<F> FnMiddleware<F> {
    /// Give the closure a readable name for route dumps.
    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&Request, &mut RequestContext, Next<'_>) -> Response + Send + Sync,
{
    fn handle(&self, req: &Request, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        (self.f)(req, ctx, next)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Wrap a closure as middleware.
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&Request, &mut RequestContext, Next<'_>) -> Response + Send + Sync,
{
    FnMiddleware { f, name: "fn" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RequestId;
    use http::{Method, StatusCode};
    use std::sync::Mutex;

    fn recorder(
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    ) -> Arc<dyn Middleware> {
        Arc::new(from_fn(move |req, ctx, next| {
            log.lock().unwrap().push(format!("{label}.pre"));
            let res = next.run(req, ctx);
            log.lock().unwrap().push(format!("{label}.post"));
            res
        }))
    }

    #[test]
    fn test_onion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.push(recorder("A", log.clone()));
        chain.push(recorder("B", log.clone()));

        let handler_log = log.clone();
        let endpoint = move |_: &Request, _: &mut RequestContext| {
            handler_log.lock().unwrap().push("H".to_string());
            Response::text(StatusCode::OK, "done")
        };

        let req = Request::new(Method::GET, "/");
        let mut ctx = RequestContext::new(RequestId::new());
        let res = chain.run(&req, &mut ctx, &endpoint);

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["A.pre", "B.pre", "H", "B.post", "A.post"]
        );
    }

    #[test]
    fn test_empty_chain_calls_endpoint() {
        let chain = MiddlewareChain::new();
        let endpoint =
            |_: &Request, _: &mut RequestContext| Response::empty(StatusCode::NO_CONTENT);
        let req = Request::new(Method::GET, "/");
        let mut ctx = RequestContext::default();
        assert_eq!(chain.run(&req, &mut ctx, &endpoint).status, StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_next_can_run_twice() {
        let mut chain = MiddlewareChain::new();
        chain.push(Arc::new(from_fn(|req, ctx, next| {
            let first = next.run(req, ctx);
            if first.status.is_server_error() {
                return next.run(req, ctx);
            }
            first
        })));
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let endpoint = |_: &Request, _: &mut RequestContext| {
            if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                Response::empty(StatusCode::SERVICE_UNAVAILABLE)
            } else {
                Response::empty(StatusCode::OK)
            }
        };
        let req = Request::new(Method::GET, "/");
        let mut ctx = RequestContext::default();
        assert_eq!(chain.run(&req, &mut ctx, &endpoint).status, StatusCode::OK);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
