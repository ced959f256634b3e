use crate::db::*;
use crate::types::{StatusRecord, SyncStatus};
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_get_state_missing_key_returns_none() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    assert!(db.get_state("qbo_sync_status_nope").await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn test_put_state_overwrites_previous_value() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.put_state("k", r#"{"a":1}"#).await.unwrap();
    db.put_state("k", r#"{"a":2}"#).await.unwrap();

    assert_eq!(db.get_state("k").await.unwrap().as_deref(), Some(r#"{"a":2}"#));

    let entry = db.get_state_entry("k").await.unwrap().unwrap();
    assert_eq!(entry.key, "k");
    assert!(entry.updated_at > 0, "updated_at should be a unix timestamp");

    db.close().await;
}

#[tokio::test]
async fn test_update_status_entry_merges_modules() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.update_status_entry("qbo_sync_status_f1", "invoice", SyncStatus::Fetching)
        .await
        .unwrap();
    let record = db
        .update_status_entry("qbo_sync_status_f1", "vendor", SyncStatus::Completed)
        .await
        .unwrap();

    assert_eq!(record.status("invoice"), SyncStatus::Fetching);
    assert_eq!(record.status("vendor"), SyncStatus::Completed);

    let raw = db.get_state("qbo_sync_status_f1").await.unwrap().unwrap();
    let stored: StatusRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored, record, "returned record must match what was persisted");
    assert!(
        raw.contains("\"Fetching\""),
        "statuses are stored with their display spelling: {raw}"
    );

    db.close().await;
}

#[tokio::test]
async fn test_update_status_entry_replaces_undecodable_value() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.put_state("qbo_sync_status_f1", "not json").await.unwrap();
    let record = db
        .update_status_entry("qbo_sync_status_f1", "bill", SyncStatus::Error)
        .await
        .unwrap();

    assert_eq!(record.len(), 1);
    assert_eq!(record.status("bill"), SyncStatus::Error);

    db.close().await;
}

#[tokio::test]
async fn test_concurrent_updates_on_same_key_keep_every_module() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = std::sync::Arc::new(Database::new(temp_file.path()).await.unwrap());

    let modules = ["account", "customer", "vendor", "item", "class", "term"];
    let mut handles = Vec::new();
    for module in modules {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.update_status_entry("qbo_sync_status_f1", module, SyncStatus::Completed)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let raw = db.get_state("qbo_sync_status_f1").await.unwrap().unwrap();
    let stored: StatusRecord = serde_json::from_str(&raw).unwrap();
    for module in modules {
        assert_eq!(
            stored.status(module),
            SyncStatus::Completed,
            "{module} must not be lost to a concurrent writer"
        );
    }
}

#[tokio::test]
async fn test_delete_state_reports_whether_row_existed() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.put_state("k", "{}").await.unwrap();

    assert!(db.delete_state("k").await.unwrap());
    assert!(!db.delete_state("k").await.unwrap());
    assert!(db.get_state("k").await.unwrap().is_none());

    db.close().await;
}
