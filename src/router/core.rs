use http::Method;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::pattern::PathPattern;
use super::route::{handler_fn, Route};
use super::table::{Resolution, RouteError, RouteTable};
use crate::middleware::{Middleware, MiddlewareChain};
use crate::static_files::StaticFiles;

/// A group of routes sharing one middleware chain and one mount prefix.
///
/// Routers are assembled at startup and then handed to the
/// [`Dispatcher`](crate::dispatcher::Dispatcher), after which they are only
/// read. Middleware registered here wraps every route of this router and no
/// other.
#[derive(Clone)]
pub struct Router {
    name: String,
    prefix: PathPattern,
    table: RouteTable,
    chain: MiddlewareChain,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// A router mounted at `/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "router".to_string(),
            prefix: PathPattern::root(),
            table: RouteTable::new(),
            chain: MiddlewareChain::new(),
        }
    }

    /// A router whose routes all live under `prefix` (e.g. `/api/v1`).
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPrefix`] when the prefix is not an absolute,
    /// placeholder-free path.
    pub fn with_prefix(prefix: &str) -> Result<Self, RouteError> {
        let invalid = || RouteError::InvalidPrefix {
            prefix: prefix.to_string(),
        };
        let pattern = PathPattern::parse(prefix).map_err(|_| invalid())?;
        if !pattern.is_static() {
            return Err(invalid());
        }
        Ok(Self {
            prefix: pattern,
            ..Self::new()
        })
    }

    /// Label used in logs and route dumps.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        self.prefix.as_str()
    }

    /// Register a route built with [`get`](super::get), [`post`](super::post), ...
    ///
    /// # Errors
    ///
    /// See [`RouteTable::register`].
    pub fn route(&mut self, route: Route) -> Result<&mut Self, RouteError> {
        self.table.register(route, &self.prefix)?;
        Ok(self)
    }

    /// Append middleware; later registrations run closer to the handler.
    pub fn middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware_arc(Arc::new(middleware))
    }

    /// Append middleware that is shared with other routers.
    pub fn middleware_arc(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        debug!(
            router = %self.name,
            middleware = middleware.name(),
            position = self.chain.len(),
            "Added middleware"
        );
        self.chain.push(middleware);
        self
    }

    /// Serve files below `dir` at `mount/<path..>`.
    ///
    /// A missing file is answered with 404 by this router; the request does
    /// not fall through to routers attached later.
    ///
    /// # Errors
    ///
    /// Fails when `mount` is not a valid static path or is already taken.
    pub fn static_files(
        &mut self,
        dir: impl Into<PathBuf>,
        mount: &str,
    ) -> Result<&mut Self, RouteError> {
        let mount_pattern = PathPattern::parse(mount).map_err(|_| RouteError::InvalidPrefix {
            prefix: mount.to_string(),
        })?;
        if !mount_pattern.is_static() {
            return Err(RouteError::InvalidPrefix {
                prefix: mount.to_string(),
            });
        }

        let files = StaticFiles::new(dir);
        info!(
            router = %self.name,
            mount = %mount,
            dir = %files.base_dir().display(),
            "Mounted static files"
        );

        let pattern = format!("{}/{{*path}}", mount.trim_end_matches('/'));
        let route = Route::new(
            Method::GET,
            pattern,
            handler_fn(move |input| Ok(files.serve(input.param("path")?))),
        )
        .named("static_files");
        self.route(route)
    }

    /// Resolve a request against this router's table.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        self.table.resolve(method, path)
    }

    #[must_use]
    pub fn chain(&self) -> &MiddlewareChain {
        &self.chain
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// `(method, pattern)` of every route, in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.table
            .entries()
            .iter()
            .map(|e| (e.method.clone(), e.pattern.as_str().to_string()))
            .collect()
    }

    /// Log the routing table at `info`.
    pub fn dump_routes(&self) {
        let middleware: Vec<&str> = self.chain.names().collect();
        info!(
            router = %self.name,
            prefix = %self.prefix,
            routes = self.table.len(),
            middleware = ?middleware,
            "Router table"
        );
        for entry in self.table.entries() {
            info!(
                router = %self.name,
                method = %entry.method,
                pattern = %entry.pattern,
                name = entry.name.as_deref().unwrap_or("-"),
                requires = ?entry.requires,
                "Route"
            );
        }
    }
}
