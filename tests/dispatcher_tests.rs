//! Tests for router selection, response normalisation and failure handling
//!
//! # Test Coverage
//!
//! - Path parameters reaching the handler (`/hello/<name>`)
//! - Router precedence when two routers define the same route
//! - 404 / 405 responses, including `Allow`
//! - Handler errors and panics masked as 500, still seen by middleware
//! - A required context key that no middleware set
//! - Request id propagation

use http::{Method, StatusCode};
use oxrouter::dispatcher::{Dispatcher, Request, Response, REQUEST_ID_HEADER};
use oxrouter::middleware::{from_fn, MetricsMiddleware, Middleware, Next};
use oxrouter::router::{get, post, HandlerError, Router};
use oxrouter::{AppData, RequestContext, RequestId};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn hello_router(greeting: &'static str) -> Router {
    let mut router = Router::new().named(greeting);
    router
        .route(
            get("/hello/<name>", move |input| {
                Ok(format!("{greeting} {}", input.param("name")?))
            })
            .params(["name"]),
        )
        .unwrap();
    router
}

#[test]
fn test_path_param_reaches_handler() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(hello_router("Hello"));

    let res = dispatcher.dispatch(Request::new(Method::GET, "/hello/world"));
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body_text().contains("world"));
}

#[test]
fn test_first_attached_router_wins() {
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .attach(hello_router("first"))
        .attach(hello_router("second"));

    for _ in 0..3 {
        let res = dispatcher.dispatch(Request::new(Method::GET, "/hello/ada"));
        assert_eq!(res.body_text(), "first ada");
    }
}

#[test]
fn test_later_router_serves_method_the_first_lacks() {
    let mut reads = Router::new();
    reads.route(get("/items", |_| Ok("list"))).unwrap();
    let mut writes = Router::new();
    writes
        .route(post("/items", |_| Ok(("created", StatusCode::CREATED))))
        .unwrap();

    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(reads).attach(writes);

    let res = dispatcher.dispatch(Request::new(Method::POST, "/items"));
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body_text(), "created");
}

#[test]
fn test_not_found_body() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(hello_router("Hello"));

    let res = dispatcher.dispatch(Request::new(Method::GET, "/nothing/here"));
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&res.body_text()).unwrap(),
        json!({"error": "Not Found", "method": "GET", "path": "/nothing/here"})
    );
}

#[test]
fn test_method_not_allowed_lists_methods_of_every_router() {
    let mut a = Router::new();
    a.route(get("/things", |_| Ok("get"))).unwrap();
    let mut b = Router::new();
    b.route(post("/things", |_| Ok("post"))).unwrap();

    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(a).attach(b);

    let res = dispatcher.dispatch(Request::new(Method::DELETE, "/things"));
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.header("allow"), Some("GET, POST"));
}

#[test]
fn test_handler_error_is_masked() {
    let mut router = Router::new();
    router
        .route(get("/fail", |_| -> Result<String, HandlerError> {
            Err(anyhow::anyhow!("database is on fire").into())
        }))
        .unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(router);

    let res = dispatcher.dispatch(Request::new(Method::GET, "/fail"));
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!res.body_text().contains("fire"));
}

#[test]
fn test_bad_request_keeps_its_message() {
    let mut router = Router::new();
    router
        .route(get("/n/<n>", |input| {
            let n: u32 = input.param_as("n")?;
            Ok(format!("{}", n * 2))
        }))
        .unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(router);

    assert_eq!(
        dispatcher.dispatch(Request::new(Method::GET, "/n/21")).body_text(),
        "42"
    );
    let res = dispatcher.dispatch(Request::new(Method::GET, "/n/abc"));
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body_text().contains("invalid value"));
}

#[test]
fn test_panic_becomes_500_and_dispatcher_keeps_serving() {
    let mut router = Router::new();
    router
        .route(get("/boom", |_| -> Result<&'static str, HandlerError> {
            panic!("kaboom")
        }))
        .unwrap()
        .route(get("/fine", |_| Ok("fine")))
        .unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(router);

    let res = dispatcher.dispatch(Request::new(Method::GET, "/boom"));
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!res.body_text().contains("kaboom"));

    let res = dispatcher.dispatch(Request::new(Method::GET, "/fine"));
    assert_eq!(res.status, StatusCode::OK);
}

#[test]
fn test_panic_response_still_flows_back_through_middleware() {
    let metrics = Arc::new(MetricsMiddleware::new());
    let mut router = Router::new();
    router
        .middleware_arc(Arc::clone(&metrics) as Arc<dyn Middleware>)
        .middleware(from_fn(|req: &Request, ctx: &mut RequestContext, next: Next<'_>| {
            next.run(req, ctx).with_header("x-post", "seen")
        }))
        .route(get("/boom", |_| -> Result<&'static str, HandlerError> {
            panic!("boom")
        }))
        .unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(router);

    let res = dispatcher.dispatch(Request::new(Method::GET, "/boom"));
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.header("x-post"), Some("seen"));
    assert_eq!(metrics.request_count(), 1);
    assert_eq!(metrics.status_class_count(5), 1);
}

#[test]
fn test_middleware_panic_is_masked() {
    let mut router = Router::new();
    router
        .middleware(from_fn(|_: &Request, _: &mut RequestContext, _: Next<'_>| -> Response {
            panic!("layer failed")
        }))
        .route(get("/fine", |_| Ok("fine")))
        .unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(router);

    let res = dispatcher.dispatch(Request::new(Method::GET, "/fine"));
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!res.body_text().contains("layer failed"));
}

#[test]
fn test_unknown_path_param_is_a_server_error() {
    let mut router = Router::new();
    router
        .route(get("/hello/<name>", |input| Ok(input.param("who")?.to_string())))
        .unwrap()
        .route(get("/items/<id>", |input| Ok(input.param_as::<u32>("id")?.to_string())))
        .unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(router);

    let res = dispatcher.dispatch(Request::new(Method::GET, "/hello/world"));
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!res.body_text().contains("who"));

    let res = dispatcher.dispatch(Request::new(Method::GET, "/items/abc"));
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let res = dispatcher.dispatch(Request::new(Method::GET, "/items/7"));
    assert_eq!(res.body_text(), "7");
}

#[test]
fn test_missing_required_key_is_500_and_handler_never_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let mut router = Router::new();
    router
        .route(
            get("/me", move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok("me")
            })
            .requires(["user_id"]),
        )
        .unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(router);

    let res = dispatcher.dispatch(Request::new(Method::GET, "/me"));
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_return_shapes_normalise_alike() {
    let mut router = Router::new();
    router
        .route(get("/pair", |_| Ok((json!({"a": 1}), StatusCode::ACCEPTED))))
        .unwrap()
        .route(get("/typed", |_| {
            Ok(Response::json(StatusCode::ACCEPTED, json!({"a": 1})))
        }))
        .unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher.echo_request_id(false).attach(router);

    let pair = dispatcher.dispatch(Request::new(Method::GET, "/pair"));
    let typed = dispatcher.dispatch(Request::new(Method::GET, "/typed"));
    assert_eq!(pair, typed);
}

#[test]
fn test_request_id_is_echoed_or_generated() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach(hello_router("Hello"));

    let given = RequestId::new().to_string();
    let req = Request::new(Method::GET, "/hello/x").with_header(REQUEST_ID_HEADER, given.clone());
    let res = dispatcher.dispatch(req);
    assert_eq!(res.header(REQUEST_ID_HEADER), Some(given.as_str()));

    let res = dispatcher.dispatch(Request::new(Method::GET, "/missing"));
    let generated = res.header(REQUEST_ID_HEADER).unwrap();
    assert!(generated.parse::<RequestId>().is_ok());
}

#[test]
fn test_app_data_is_shared_with_handlers() {
    struct Counter(AtomicUsize);

    let mut router = Router::new();
    router
        .route(get("/count", |input| {
            let counter = input.app_data::<Counter>()?;
            Ok(format!("{}", counter.0.fetch_add(1, Ordering::SeqCst) + 1))
        }))
        .unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .app_data(AppData::new(Counter(AtomicUsize::new(0))))
        .attach(router);

    dispatcher.dispatch(Request::new(Method::GET, "/count"));
    let res = dispatcher.dispatch(Request::new(Method::GET, "/count"));
    assert_eq!(res.body_text(), "2");
}
