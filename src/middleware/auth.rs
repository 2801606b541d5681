use http::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Middleware, Next};
use crate::context::RequestContext;
use crate::dispatcher::{Request, Response};
use crate::security::TokenValidator;

/// Context key holding the full claim object of a validated token.
pub const CLAIMS_KEY: &str = "claims";

/// Bearer-token gate.
///
/// Reads `Authorization: Bearer <token>` and asks the [`TokenValidator`]
/// for its claims. Requests without a valid token are answered with
/// 401 `{"error": "Unauthorized"}` and never reach `next`. Accepted requests
/// get the claim object under [`CLAIMS_KEY`] and every claim named with
/// [`inject`](AuthMiddleware::inject) under its own key.
pub struct AuthMiddleware {
    validator: Arc<dyn TokenValidator>,
    inject: Vec<String>,
}

impl AuthMiddleware {
    pub fn new<V: TokenValidator + 'static>(validator: V) -> Self {
        Self::from_arc(Arc::new(validator))
    }

    pub fn from_arc(validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            validator,
            inject: Vec::new(),
        }
    }

    /// Copy claim `name` into the request context. A token without the
    /// claim is rejected.
    #[must_use]
    pub fn inject(mut self, name: impl Into<String>) -> Self {
        self.inject.push(name.into());
        self
    }

    fn unauthorized() -> Response {
        Response::error(StatusCode::UNAUTHORIZED, "Unauthorized")
    }
}

impl Middleware for AuthMiddleware {
    fn handle(&self, req: &Request, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let Some(token) = req.bearer_token() else {
            debug!(path = %req.path(), "Missing bearer token");
            return Self::unauthorized();
        };
        let Some(claims) = self.validator.validate(token) else {
            warn!(path = %req.path(), request_id = %ctx.request_id(), "Invalid bearer token");
            return Self::unauthorized();
        };

        for name in &self.inject {
            let Some(value) = claims.get(name).cloned() else {
                warn!(
                    path = %req.path(),
                    claim = %name,
                    "Bearer token lacks a required claim"
                );
                return Self::unauthorized();
            };
            ctx.set(name.clone(), value);
        }
        ctx.set(CLAIMS_KEY, Value::Object(claims));

        next.run(req, ctx)
    }

    fn name(&self) -> &'static str {
        "auth"
    }
}
