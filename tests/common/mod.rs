//! Common test utilities for qbo-sync end-to-end tests
//!
//! Each test gets its own wiremock accounting service and SQLite file.

#![allow(dead_code)]

use qbo_sync::{Config, Credential, FileId, Selection, SyncManager};
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const FILE: &str = "f1";
pub const REALM: &str = "9130";
pub const SYNCED_AT: &str = "2025-03-01T10:15:00Z";

/// A mock accounting service plus the config pointing at it
pub struct TestEnv {
    pub server: MockServer,
    pub config: Config,
    pub temp_dir: TempDir,
}

impl TestEnv {
    /// Start a mock service and a config with a fresh database and export dir
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let temp_dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.gateway.base_url = server.uri();
        config.gateway.request_timeout = Duration::from_secs(5);
        config.persistence.database_path = temp_dir.path().join("state.db");
        config.export.export_dir = temp_dir.path().join("exports");
        config.sync.retry.initial_delay = Duration::from_millis(1);
        config.sync.retry.max_delay = Duration::from_millis(5);
        config.sync.retry.jitter = false;

        Self {
            server,
            config,
            temp_dir,
        }
    }

    /// Open a manager over the env's database and service
    pub async fn manager(&self) -> SyncManager {
        SyncManager::open(self.config.clone()).await.unwrap()
    }

    /// Every request the mock service has seen so far
    pub async fn requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Number of requests seen with this method and path
    pub async fn count(&self, http_method: &str, url_path: &str) -> usize {
        self.requests()
            .await
            .iter()
            .filter(|r| r.method.as_str() == http_method && r.url.path() == url_path)
            .count()
    }
}

pub fn credential() -> Credential {
    Credential::bearer("e2e-token")
}

pub fn file() -> FileId {
    FileId::from(FILE)
}

pub fn selection(keys: &[&str]) -> Selection {
    keys.iter().copied().collect()
}

/// File record linked to company `REALM` ("Acme", USA)
pub async fn mount_connected_file(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/api/files/{FILE}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": FILE,
            "fileName": "Acme books",
            "destinationRegion": "USA",
            "qbo": { "isConnected": true, "realmId": REALM, "companyName": "Acme" }
        })))
        .mount(server)
        .await;
}

/// Every sync trigger succeeds
pub async fn mount_sync_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/qbo/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(server)
        .await;
}

/// Triggers for `module` fail with `status`, ahead of any catch-all sync mock
pub async fn mount_sync_failure(server: &MockServer, module: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path("/api/qbo/sync"))
        .and(body_partial_json(json!({ "modules": [module] })))
        .respond_with(
            ResponseTemplate::new(status).set_body_json(json!({ "message": "QBO rejected" })),
        )
        .with_priority(1)
        .mount(server)
        .await;
}

/// Sync dates answered for the file; `times` limits how often (None = forever)
pub async fn mount_sync_dates(server: &MockServer, body: Value, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path(format!("/api/qborawdata/sync-dates/{FILE}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body));
    match times {
        Some(n) => mock.up_to_n_times(n).with_priority(1).mount(server).await,
        None => mock.mount(server).await,
    }
}

/// Summary answered for the company; `times` limits how often (None = forever)
pub async fn mount_summary(server: &MockServer, body: Value, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path(format!("/api/qborawdata/summary/{REALM}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body));
    match times {
        Some(n) => mock.up_to_n_times(n).with_priority(1).mount(server).await,
        None => mock.mount(server).await,
    }
}
