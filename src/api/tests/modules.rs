use super::*;
use crate::api::routes::REFRESH_FAILED_HEADER;
use crate::error::RemoteOperation;
use crate::registry::ModuleRegistry;

#[tokio::test]
async fn test_list_modules_in_registry_order() {
    let (app, _store) = create_test_app(Arc::new(FakeGateway::connected()));

    let response = app
        .oneshot(get("/modules"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let keys: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["key"].as_str().unwrap())
        .collect();
    let registry = ModuleRegistry::qbo();
    let expected: Vec<&str> = registry.list().iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, expected);
}

#[tokio::test]
async fn test_file_modules_table_after_open() {
    let gateway = Arc::new(FakeGateway::connected());
    gateway.set_count("bill", 0);
    let (app, _store) = create_test_app(gateway);

    let response = app.clone().oneshot(get("/files/f1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/files/f1/modules")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let rows = json.as_array().unwrap();
    let bill = rows.iter().find(|r| r["key"] == "bill").unwrap();
    assert_eq!(bill["count"], 0);
    assert_eq!(bill["actionable"], false);
    assert_eq!(bill["status"], "Not Synced");
    let invoice = rows.iter().find(|r| r["key"] == "invoice").unwrap();
    assert_eq!(invoice["count"], 5);
    assert_eq!(invoice["actionable"], true);
}

#[tokio::test]
async fn test_delete_without_confirm_is_refused() {
    let gateway = Arc::new(FakeGateway::connected());
    let (app, _store) = create_test_app(gateway.clone());

    let response = app
        .oneshot(request("DELETE", "/files/f1/modules/vendor"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(json_body(response).await["error"]["code"], "not_confirmed");
    assert_eq!(gateway.count(RemoteOperation::DeleteModuleData), 0);
}

#[tokio::test]
async fn test_delete_confirmed() {
    let gateway = Arc::new(FakeGateway::connected());
    let (app, _store) = create_test_app(gateway.clone());

    let response = app
        .oneshot(request("DELETE", "/files/f1/modules/vendor?confirm=true"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["module"], "vendor");
    assert_eq!(json["company_id"], "realm-1");
    assert_eq!(json["refresh"]["refreshed"]["summary"]["vendor"]["count"], 0);
    assert_eq!(gateway.count(RemoteOperation::DeleteModuleData), 1);
}

#[tokio::test]
async fn test_delete_unknown_module_is_not_found() {
    let gateway = Arc::new(FakeGateway::connected());
    let (app, _store) = create_test_app(gateway.clone());

    let response = app
        .oneshot(request("DELETE", "/files/f1/modules/payroll?confirm=true"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_export_downloads_artifact() {
    let gateway = Arc::new(FakeGateway::connected());
    let (app, _store) = create_test_app(gateway.clone());

    let response = app
        .oneshot(get("/files/f1/modules/invoice/export/excel?confirm=true"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"Acme_USA_invoice.xlsx\""
    );
    assert!(response.headers().get(REFRESH_FAILED_HEADER).is_none());

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"PK\x03\x04 spreadsheet");
}

#[tokio::test]
async fn test_export_reports_failed_refresh_in_header() {
    let gateway = Arc::new(FakeGateway::connected());
    gateway.fail_op(RemoteOperation::FetchSummary);
    let (app, _store) = create_test_app(gateway.clone());

    let response = app
        .oneshot(get("/files/f1/modules/invoice/export/csv?confirm=true"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "text/csv");
    assert_eq!(
        response.headers().get(REFRESH_FAILED_HEADER).unwrap(),
        "fetch_summary"
    );
}

#[tokio::test]
async fn test_export_unknown_format_is_bad_request() {
    let gateway = Arc::new(FakeGateway::connected());
    let (app, _store) = create_test_app(gateway.clone());

    let response = app
        .oneshot(get("/files/f1/modules/invoice/export/pdf?confirm=true"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_export_without_confirm_is_refused() {
    let gateway = Arc::new(FakeGateway::connected());
    let (app, _store) = create_test_app(gateway.clone());

    let response = app
        .oneshot(get("/files/f1/modules/invoice/export/excel"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(gateway.count(RemoteOperation::ExportModuleData), 0);
}
