use super::*;
use crate::manager::test_helpers::{FakeGateway, create_test_manager};
use crate::status_store::MemoryStatusStore;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;

mod modules;
mod system;

const TOKEN: &str = "Bearer test-token";

/// Router over a fake accounting service and an in-memory store
fn create_test_app(gateway: Arc<FakeGateway>) -> (Router, Arc<MemoryStatusStore>) {
    let (manager, store) = create_test_manager(gateway);
    let config = manager.config().clone();
    (create_router(Arc::new(manager), config), store)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", TOKEN)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", TOKEN)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", TOKEN)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Router built from the test config after `tweak`
fn router_with(tweak: impl FnOnce(&mut Config)) -> Router {
    let (manager, _store) = create_test_manager(Arc::new(FakeGateway::connected()));
    let mut config = (**manager.config()).clone();
    tweak(&mut config);
    create_router(Arc::new(manager), Arc::new(config))
}

/// `access-control-allow-origin` returned for a health request from `origin`
async fn allowed_origin(app: Router, origin: &str) -> Option<String> {
    let request = Request::builder()
        .uri("/health")
        .header("origin", origin)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response
        .headers()
        .get("access-control-allow-origin")
        .map(|v| v.to_str().unwrap().to_string())
}

#[tokio::test]
async fn server_keeps_serving_once_bound() {
    let (manager, _store) = create_test_manager(Arc::new(FakeGateway::connected()));
    let mut config = (**manager.config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();

    let server = tokio::spawn(start_api_server(Arc::new(manager), Arc::new(config)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!server.is_finished());
    server.abort();
}

#[tokio::test]
async fn wildcard_cors_allows_any_origin() {
    let app = router_with(|c| {
        c.server.api.cors_enabled = true;
        c.server.api.cors_origins = vec!["*".to_string()];
    });
    assert_eq!(
        allowed_origin(app, "http://localhost:3000").await.as_deref(),
        Some("*")
    );
}

#[tokio::test]
async fn listed_cors_origin_is_echoed() {
    let app = router_with(|c| {
        c.server.api.cors_enabled = true;
        c.server.api.cors_origins = vec!["http://app.example.com".to_string()];
    });
    assert_eq!(
        allowed_origin(app, "http://app.example.com").await.as_deref(),
        Some("http://app.example.com")
    );
}

#[tokio::test]
async fn disabled_cors_sends_no_header() {
    let app = router_with(|c| c.server.api.cors_enabled = false);
    assert_eq!(allowed_origin(app, "http://localhost:3000").await, None);
}

#[tokio::test]
async fn swagger_ui_can_be_turned_off() {
    let app = router_with(|c| c.server.api.swagger_ui = false);
    let response = app
        .oneshot(Request::builder().uri("/swagger-ui").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
