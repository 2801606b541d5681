//! The reference application served by `oxrouter serve`.
//!
//! Three routers, attached in this order:
//!
//! 1. secured: bearer-token auth, `GET /me`
//! 2. public: `POST /login`, `POST /register`, `GET /hello/<name>`,
//!    `GET /health`, `GET /metrics` and, with templates configured,
//!    `GET /greet/<name>`
//! 3. static files, when `static_files.dir` is configured
//!
//! Users live in an in-memory [`UserStore`] handed to handlers as
//! application data. `admin` / `password` is seeded as user 1.

use anyhow::Context;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::context::AppData;
use crate::dispatcher::{Dispatcher, IntoResponse, Response};
use crate::middleware::{AuthMiddleware, Middleware, MetricsMiddleware, TracingMiddleware};
use crate::router::{get, post, HandlerError, HandlerInput, Router};
use crate::security::JwtCodec;
use crate::templating::Templates;

/// Seeded account, matching the classic example credentials.
pub const SEED_USERNAME: &str = "admin";
pub const SEED_PASSWORD: &str = "password";

#[derive(Debug, Clone)]
struct StoredUser {
    id: u64,
    password_digest: Vec<u8>,
}

/// Username-unique user store.
///
/// Registration goes through `DashMap::entry`, so a duplicate username is
/// detected and refused under the same shard lock that would insert it.
#[derive(Debug)]
pub struct UserStore {
    users: DashMap<String, StoredUser>,
    next_id: AtomicU64,
}

impl Default for UserStore {
    fn default() -> Self {
        Self {
            users: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

fn digest(password: &str) -> Vec<u8> {
    Sha256::digest(password.as_bytes()).to_vec()
}

impl UserStore {
    /// A store holding only the seeded account.
    #[must_use]
    pub fn seeded() -> Self {
        let store = Self::default();
        if store.register(SEED_USERNAME, SEED_PASSWORD).is_none() {
            warn!(username = SEED_USERNAME, "Seed user already present");
        }
        store
    }

    /// Add a user, returning its id, or `None` if the name is taken.
    #[must_use]
    pub fn register(&self, username: &str, password: &str) -> Option<u64> {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                slot.insert(StoredUser {
                    id,
                    password_digest: digest(password),
                });
                Some(id)
            }
        }
    }

    /// User id for valid credentials.
    #[must_use]
    pub fn authenticate(&self, username: &str, password: &str) -> Option<u64> {
        let user = self.users.get(username)?;
        (user.password_digest == digest(password)).then_some(user.id)
    }

    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

fn login(input: &HandlerInput<'_>, codec: &JwtCodec) -> Result<Response, HandlerError> {
    let cred: Credentials = input.json()?;
    let store = input.app_data::<UserStore>()?;
    let Some(user_id) = store.authenticate(&cred.username, &cred.password) else {
        warn!(username = %cred.username, "Login failed");
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    };
    let token = codec
        .encode(&json!({ "user_id": user_id }))
        .map_err(|e| HandlerError::Internal(e.into()))?;
    info!(user_id, "Issued token");
    Ok(json!({ "token": token }).into_response())
}

fn register(input: &HandlerInput<'_>) -> Result<Response, HandlerError> {
    let cred: Credentials = input.json()?;
    if cred.username.trim().is_empty() || cred.password.is_empty() {
        return Err(HandlerError::bad_request("username and password are required"));
    }
    let store = input.app_data::<UserStore>()?;
    match store.register(&cred.username, &cred.password) {
        Some(id) => {
            info!(user_id = id, username = %cred.username, "Registered user");
            let body = json!({ "id": id, "username": cred.username });
            Ok((body, StatusCode::CREATED).into_response())
        }
        None => Ok(Response::error(StatusCode::CONFLICT, "Username already exists")),
    }
}

fn me(input: &HandlerInput<'_>) -> Result<Response, HandlerError> {
    let user_id: u64 = input.get("user_id")?;
    Ok(json!({ "user_id": user_id }).into_response())
}

fn hello(input: &HandlerInput<'_>) -> Result<String, HandlerError> {
    Ok(format!("Hello {}", input.param("name")?))
}

/// Build the token codec described by `config`.
#[must_use]
pub fn jwt_codec(config: &AppConfig) -> JwtCodec {
    let codec = JwtCodec::new(&config.security.jwt_secret);
    match config.security.token_ttl_secs {
        Some(secs) => codec.with_ttl(Duration::from_secs(secs)),
        None => codec,
    }
}

/// Wire the reference application.
///
/// # Errors
///
/// Fails when a route cannot be registered or the template directory is
/// missing.
pub fn build_dispatcher(config: &AppConfig) -> anyhow::Result<Dispatcher> {
    let codec = jwt_codec(config);
    let metrics = Arc::new(MetricsMiddleware::new());
    let metrics_layer: Arc<dyn Middleware> = Arc::clone(&metrics) as Arc<dyn Middleware>;

    let mut secured = Router::new().named("secured");
    secured
        .middleware(TracingMiddleware)
        .middleware_arc(Arc::clone(&metrics_layer))
        .middleware(AuthMiddleware::new(codec.clone()).inject("user_id"));
    secured.route(get("/me", me).requires(["user_id"]).named("me"))?;

    let mut public = Router::new().named("public");
    public
        .middleware(TracingMiddleware)
        .middleware_arc(Arc::clone(&metrics_layer));
    let login_codec = codec;
    public
        .route(post("/login", move |input| login(input, &login_codec)).named("login"))?
        .route(post("/register", register).named("register"))?
        .route(get("/hello/<name>", hello).params(["name"]).named("hello"))?
        .route(get("/health", |_| Ok(json!({ "status": "ok" }))).named("health"))?;

    let metrics_view = Arc::clone(&metrics);
    public.route(
        get("/metrics", move |input| {
            Ok(match input.request().query_param("format") {
                Some("prometheus") => {
                    Response::text(StatusCode::OK, metrics_view.render_prometheus())
                        .with_header("content-type", "text/plain; version=0.0.4")
                }
                _ => Response::json(StatusCode::OK, metrics_view.snapshot()),
            })
        })
        .named("metrics"),
    )?;

    if let Some(dir) = &config.templates.dir {
        let templates = Templates::from_dir(dir)
            .with_context(|| format!("loading templates from {}", dir.display()))?;
        public.route(
            get("/greet/<name>", move |input| {
                let name = input.param("name")?;
                Ok(templates.render_response("greet.html", &json!({ "name": name })))
            })
            .params(["name"])
            .named("greet"),
        )?;
    }

    let mut dispatcher = Dispatcher::new();
    dispatcher
        .app_data(AppData::new(UserStore::seeded()))
        .echo_request_id(config.http.request_id_header)
        .attach(secured)
        .attach(public);

    if let Some(dir) = &config.static_files.dir {
        let mut assets = Router::new().named("static");
        assets
            .middleware(TracingMiddleware)
            .middleware_arc(metrics_layer)
            .static_files(dir.clone(), &config.static_files.mount)?;
        dispatcher.attach(assets);
    }

    Ok(dispatcher)
}
