use super::*;

#[tokio::test]
async fn test_health_check() {
    let (app, _store) = create_test_app(Arc::new(FakeGateway::connected()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let (app, _store) = create_test_app(Arc::new(FakeGateway::connected()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["info"]["title"], "qbo-sync REST API");
    assert!(json["paths"]["/files/{file_id}/sync"].is_object());
}

#[tokio::test]
async fn test_event_stream_content_type() {
    let (app, _store) = create_test_app(Arc::new(FakeGateway::connected()));

    let response = app
        .oneshot(get("/events"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
}

#[tokio::test]
async fn test_read_routes_require_bearer_token() {
    let gateway = Arc::new(FakeGateway::connected());

    for uri in ["/files/f1/status", "/files/f1/modules", "/modules", "/events"] {
        let (app, _store) = create_test_app(gateway.clone());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "unauthorized", "{uri}");
    }
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_health_and_openapi_are_public() {
    for uri in ["/health", "/openapi.json"] {
        let (app, _store) = create_test_app(Arc::new(FakeGateway::connected()));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn test_unknown_path_is_not_found_not_unauthorized() {
    let (app, _store) = create_test_app(Arc::new(FakeGateway::connected()));

    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
