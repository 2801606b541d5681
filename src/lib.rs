//! # oxrouter
//!
//! **oxrouter** is a small, coroutine-powered HTTP router for Rust with
//! onion-style middleware, a per-request context and bearer-token auth,
//! served by `may_minihttp`.
//!
//! ## Architecture
//!
//! - **[`router`]** - Path patterns (`/users/<id>` or `/users/{id}`), route
//!   descriptors and per-router route tables
//! - **[`middleware`]** - The onion chain plus auth, tracing and metrics layers
//! - **[`dispatcher`]** - Router selection, chain execution, response
//!   normalisation and panic containment
//! - **[`context`]** - The per-request key/value context middleware writes
//!   and handlers read
//! - **[`security`]** - Token validation and the bundled HS256 codec
//! - **[`server`]** - The `may_minihttp` service adapter
//! - **[`static_files`]** / **[`templating`]** - File serving and HTML
//!   templates for routers that need them
//! - **[`config`]**, **[`logging`]**, **[`runtime_config`]** - Ambient setup
//! - **[`demo`]** - The reference application run by `oxrouter serve`
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as AppService<br/>(may_minihttp)
//!     participant Dispatcher
//!     participant Router as Router<br/>(first match wins)
//!     participant Chain as Middleware Chain
//!     participant Handler
//!
//!     Client->>Server: HTTP Request<br/>GET /hello/world
//!     Server->>Server: Parse method, path,<br/>headers, query, body
//!     alt Body over limit
//!         Server-->>Client: 413 Payload Too Large
//!     end
//!     Server->>Dispatcher: dispatch(request)
//!     Dispatcher->>Router: resolve(method, path)
//!     alt No router matches
//!         Dispatcher-->>Client: 405 (Allow) or 404
//!     end
//!     Router-->>Dispatcher: route + path params
//!     Dispatcher->>Chain: run(request, context)
//!     Chain->>Chain: outer middleware ... inner middleware
//!     alt Middleware short-circuits
//!         Chain-->>Client: e.g. 401 Unauthorized
//!     end
//!     Chain->>Handler: HandlerInput (request, params, context)
//!     Handler-->>Chain: IntoResponse
//!     Chain-->>Dispatcher: Response (unwound in reverse order)
//!     Dispatcher-->>Server: Response + x-request-id
//!     Server-->>Client: HTTP Response
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use http::{Method, StatusCode};
//! use oxrouter::dispatcher::{Dispatcher, Request};
//! use oxrouter::router::{get, Router};
//!
//! let mut router = Router::new();
//! router
//!     .route(get("/hello/<name>", |input| Ok(format!("Hello {}", input.param("name")?))))
//!     .unwrap();
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.attach(router);
//!
//! let res = dispatcher.dispatch(Request::new(Method::GET, "/hello/world"));
//! assert_eq!(res.status, StatusCode::OK);
//! assert_eq!(res.body_text(), "Hello world");
//! ```
//!
//! ## Runtime Considerations
//!
//! oxrouter runs on the `may` coroutine runtime, not tokio:
//!
//! - Each connection is served by a coroutine with a fixed stack
//! - Stack size is set with `OXR_STACK_SIZE` (default `0x8000`)
//! - Handlers should avoid deep recursion and large stack locals
//! - Blocking calls inside handlers block only their coroutine when they go
//!   through `may`'s primitives

pub mod cli;
pub mod config;
pub mod context;
pub mod demo;
pub mod dispatcher;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod security;
pub mod server;
pub mod static_files;
pub mod templating;

pub use config::AppConfig;
pub use context::{AppData, ContextError, RequestContext};
pub use dispatcher::{Dispatcher, IntoResponse, Json, Request, Response};
pub use ids::RequestId;
pub use middleware::{Middleware, Next};
pub use router::{HandlerError, HandlerInput, Route, Router};
