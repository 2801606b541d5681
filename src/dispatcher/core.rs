use http::{Method, StatusCode};
use serde_json::json;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{Request, Response};
use crate::context::{AppData, RequestContext};
use crate::ids::RequestId;
use crate::router::{HandlerError, HandlerInput, PathParams, Resolution, RouteEntry, Router};

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Routes requests to the attached routers.
///
/// Built once at startup and shared read-only by every connection afterwards.
pub struct Dispatcher {
    routers: Vec<Router>,
    app_data: Option<AppData>,
    echo_request_id: bool,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            routers: Vec::new(),
            app_data: None,
            echo_request_id: true,
        }
    }

    /// Attach a router. Routers attached earlier take precedence.
    pub fn attach(&mut self, router: Router) -> &mut Self {
        info!(
            router = %router.name(),
            prefix = %router.prefix(),
            routes = router.table().len(),
            middleware = router.chain().len(),
            position = self.routers.len(),
            "Attached router"
        );
        self.routers.push(router);
        self
    }

    /// Application data handed to every handler.
    pub fn app_data(&mut self, data: AppData) -> &mut Self {
        self.app_data = Some(data);
        self
    }

    /// Whether responses carry `x-request-id` (on by default).
    pub fn echo_request_id(&mut self, enabled: bool) -> &mut Self {
        self.echo_request_id = enabled;
        self
    }

    #[must_use]
    pub fn routers(&self) -> &[Router] {
        &self.routers
    }

    /// Log every attached router's table.
    pub fn dump_routes(&self) {
        for router in &self.routers {
            router.dump_routes();
        }
    }

    /// Serve one request.
    pub fn dispatch(&self, req: Request) -> Response {
        let request_id = RequestId::from_header_or_new(req.header(REQUEST_ID_HEADER));
        let mut ctx = RequestContext::new(request_id);

        let mut allowed: Vec<Method> = Vec::new();
        let mut served = None;
        for router in &self.routers {
            match router.resolve(req.method(), req.path()) {
                Resolution::Matched(m) => {
                    debug!(
                        request_id = %request_id,
                        router = %router.name(),
                        method = %req.method(),
                        path = %req.path(),
                        route_pattern = %m.entry.pattern,
                        "Route matched"
                    );
                    served = Some(self.run_route(router, m.entry, &m.params, &req, &mut ctx));
                    break;
                }
                Resolution::MethodNotAllowed { allowed: methods } => {
                    for method in methods {
                        if !allowed.contains(&method) {
                            allowed.push(method);
                        }
                    }
                }
                Resolution::NotFound => {}
            }
        }

        let mut res = match served {
            Some(res) => res,
            None if !allowed.is_empty() => {
                debug!(
                    request_id = %request_id,
                    method = %req.method(),
                    path = %req.path(),
                    allowed = ?allowed,
                    "Method not allowed"
                );
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                Response::error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
                    .with_header("allow", allow)
            }
            None => {
                warn!(
                    request_id = %request_id,
                    method = %req.method(),
                    path = %req.path(),
                    "No route matched"
                );
                Response::json(
                    StatusCode::NOT_FOUND,
                    json!({
                        "error": "Not Found",
                        "method": req.method().as_str(),
                        "path": req.path(),
                    }),
                )
            }
        };

        if self.echo_request_id {
            res.set_header(REQUEST_ID_HEADER, request_id.to_string());
        }
        res
    }

    fn run_route(
        &self,
        router: &Router,
        entry: &RouteEntry,
        params: &PathParams,
        req: &Request,
        ctx: &mut RequestContext,
    ) -> Response {
        ctx.set_route_pattern(Arc::from(entry.pattern.as_str()));
        let app_data = self.app_data.as_ref();
        // A handler panic becomes the endpoint's 500, so middleware still
        // post-processes it on the way out.
        let endpoint = |req: &Request, ctx: &mut RequestContext| {
            let request_id = ctx.request_id();
            catch_unwind(AssertUnwindSafe(|| invoke_handler(entry, params, req, ctx, app_data)))
                .unwrap_or_else(|panic| {
                    log_panic(request_id, router, entry, panic.as_ref(), "Handler panicked");
                    internal_error()
                })
        };

        let request_id = ctx.request_id();
        match catch_unwind(AssertUnwindSafe(|| router.chain().run(req, ctx, &endpoint))) {
            Ok(res) => res,
            Err(panic) => {
                log_panic(request_id, router, entry, panic.as_ref(), "Middleware panicked");
                internal_error()
            }
        }
    }
}

fn log_panic(
    request_id: RequestId,
    router: &Router,
    entry: &RouteEntry,
    panic: &(dyn Any + Send),
    message: &str,
) {
    let backtrace = std::backtrace::Backtrace::capture();
    error!(
        request_id = %request_id,
        router = %router.name(),
        route_pattern = %entry.pattern,
        panic_message = %panic_message(panic),
        backtrace = %backtrace,
        "{}",
        message
    );
}

fn invoke_handler(
    entry: &RouteEntry,
    params: &PathParams,
    req: &Request,
    ctx: &mut RequestContext,
    app_data: Option<&AppData>,
) -> Response {
    if let Some(missing) = entry.requires.iter().find(|key| !ctx.contains(key)) {
        error!(
            request_id = %ctx.request_id(),
            route_pattern = %entry.pattern,
            key = %missing,
            "Required context key was never set"
        );
        return internal_error();
    }

    let input = HandlerInput::new(req, params, ctx, app_data);
    match entry.handler.call(&input) {
        Ok(res) => res,
        Err(HandlerError::BadRequest(message)) => {
            debug!(
                request_id = %ctx.request_id(),
                route_pattern = %entry.pattern,
                error = %message,
                "Rejected request"
            );
            Response::error(StatusCode::BAD_REQUEST, &message)
        }
        Err(e) => {
            error!(
                request_id = %ctx.request_id(),
                route_pattern = %entry.pattern,
                error = %e,
                "Handler failed"
            );
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    Response::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
