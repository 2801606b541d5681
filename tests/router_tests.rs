//! Route table behaviour seen through the public `Router` API.

use http::Method;
use oxrouter::router::{get, post, put, Resolution, RouteError, Router};

fn ok(_: &oxrouter::HandlerInput<'_>) -> Result<&'static str, oxrouter::HandlerError> {
    Ok("ok")
}

fn petstore() -> Router {
    let mut router = Router::new();
    router
        .route(get("/pets", ok))
        .unwrap()
        .route(post("/pets", ok))
        .unwrap()
        .route(get("/pets/<id>", ok))
        .unwrap()
        .route(get("/users/{user_id}/posts/{post_id}", ok))
        .unwrap();
    router
}

#[test]
fn test_params_are_captured_by_name() {
    let router = petstore();
    match router.resolve(&Method::GET, "/users/7/posts/abc") {
        Resolution::Matched(m) => {
            assert_eq!(m.entry.pattern.as_str(), "/users/{user_id}/posts/{post_id}");
            assert_eq!(m.params.len(), 2);
            assert_eq!(m.params.get("user_id"), Some("7"));
            assert_eq!(m.params.get("post_id"), Some("abc"));
        }
        _ => panic!("expected a match"),
    }
}

#[test]
fn test_matching_is_idempotent() {
    let router = petstore();
    let first = match router.resolve(&Method::GET, "/pets/42") {
        Resolution::Matched(m) => m.params.to_map(),
        _ => panic!("expected a match"),
    };
    let second = match router.resolve(&Method::GET, "/pets/42") {
        Resolution::Matched(m) => m.params.to_map(),
        _ => panic!("expected a match"),
    };
    assert_eq!(first, second);
}

#[test]
fn test_segment_count_must_match() {
    let router = petstore();
    for path in ["/pets/42/extra", "/users/7/posts", "/nothing", "/"] {
        assert!(
            matches!(router.resolve(&Method::GET, path), Resolution::NotFound),
            "{path} should not match"
        );
    }
}

#[test]
fn test_other_method_is_not_allowed_rather_than_missing() {
    let router = petstore();
    match router.resolve(&Method::DELETE, "/pets") {
        Resolution::MethodNotAllowed { allowed } => {
            assert_eq!(allowed, vec![Method::GET, Method::POST]);
        }
        _ => panic!("expected MethodNotAllowed"),
    }
}

#[test]
fn test_duplicate_route_is_a_conflict_across_placeholder_syntaxes() {
    let mut router = petstore();
    assert!(matches!(
        router.route(get("/pets/{pet_id}", ok)),
        Err(RouteError::Conflict { .. })
    ));

    // Same shape under another method is fine.
    assert!(router.route(put("/pets/<id>", ok)).is_ok());
}

#[test]
fn test_declared_params_must_equal_pattern_params() {
    let mut router = Router::new();
    assert!(matches!(
        router.route(get("/hello/<name>", ok).params(["username"])),
        Err(RouteError::ParamMismatch { .. })
    ));

    assert!(router
        .route(get("/hello/<name>", ok).params(["name"]))
        .is_ok());
}

#[test]
fn test_prefix_applies_to_every_route() {
    let mut router = Router::with_prefix("/api/v1").unwrap();
    router.route(get("/pets/<id>", ok)).unwrap();

    assert!(matches!(
        router.resolve(&Method::GET, "/api/v1/pets/3"),
        Resolution::Matched(_)
    ));
    assert!(matches!(
        router.resolve(&Method::GET, "/pets/3"),
        Resolution::NotFound
    ));
    assert_eq!(
        router.routes(),
        vec![(Method::GET, "/api/v1/pets/<id>".to_string())]
    );
}

#[test]
fn test_prefix_must_be_static() {
    assert!(matches!(
        Router::with_prefix("/api/<version>"),
        Err(RouteError::InvalidPrefix { .. })
    ));
}

#[test]
fn test_trailing_slash_is_ignored() {
    let router = petstore();
    assert!(matches!(
        router.resolve(&Method::GET, "/pets/"),
        Resolution::Matched(_)
    ));
}
