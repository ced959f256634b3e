//! Durable per-file status cache
//!
//! The orchestrator only talks to [`StatusStore`]. [`SqliteStatusStore`]
//! persists through [`Database`]; [`MemoryStatusStore`] keeps everything in
//! process for tests and throwaway sessions. Both partition strictly by file:
//! nothing written for one file is ever visible under another.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::Database;
use crate::error::DatabaseError;
use crate::types::{FileId, StatusRecord, SyncDateRecord, SyncStatus};
use crate::{Error, Result};

/// Local state key holding a file's status record
pub fn status_key(file_id: &FileId) -> String {
    format!("qbo_sync_status_{}", file_id)
}

/// Local state key holding a file's last fetched sync dates
pub fn sync_dates_key(file_id: &FileId) -> String {
    format!("qbo_sync_dates_{}", file_id)
}

/// Per-file module status storage
///
/// `set` must be durable before it returns. Absent modules read as
/// [`SyncStatus::NotSynced`].
///
/// # Examples
///
/// ```no_run
/// use qbo_sync::{FileId, MemoryStatusStore, StatusStore, SyncStatus};
///
/// # #[tokio::main]
/// # async fn main() -> qbo_sync::Result<()> {
/// let store = MemoryStatusStore::new();
/// let file = FileId::from("f1");
///
/// store.set(&file, "invoice", SyncStatus::Completed).await?;
/// assert_eq!(store.get(&file, "invoice").await?, SyncStatus::Completed);
/// assert_eq!(store.get(&file, "vendor").await?, SyncStatus::NotSynced);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Status of one module, `NotSynced` if never recorded
    async fn get(&self, file_id: &FileId, module: &str) -> Result<SyncStatus> {
        Ok(self.get_all(file_id).await?.status(module))
    }

    /// Overwrite one module's status
    async fn set(&self, file_id: &FileId, module: &str, status: SyncStatus) -> Result<()>;

    /// Snapshot of every recorded status for a file
    async fn get_all(&self, file_id: &FileId) -> Result<StatusRecord>;

    /// Last sync dates fetched from the remote for a file
    async fn sync_dates(&self, file_id: &FileId) -> Result<SyncDateRecord>;

    /// Replace the cached sync dates of a file with a freshly fetched set
    async fn replace_sync_dates(&self, file_id: &FileId, record: &SyncDateRecord) -> Result<()>;
}

/// SQLite-backed status store
#[derive(Clone)]
pub struct SqliteStatusStore {
    db: Arc<Database>,
}

impl SqliteStatusStore {
    /// Wrap an open database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The underlying database
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    async fn load<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        match self.db.get_state(key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                Error::Database(DatabaseError::CorruptState {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }),
            None => Ok(T::default()),
        }
    }
}

#[async_trait]
impl StatusStore for SqliteStatusStore {
    async fn set(&self, file_id: &FileId, module: &str, status: SyncStatus) -> Result<()> {
        self.db
            .update_status_entry(&status_key(file_id), module, status)
            .await?;
        Ok(())
    }

    async fn get_all(&self, file_id: &FileId) -> Result<StatusRecord> {
        self.load(&status_key(file_id)).await
    }

    async fn sync_dates(&self, file_id: &FileId) -> Result<SyncDateRecord> {
        self.load(&sync_dates_key(file_id)).await
    }

    async fn replace_sync_dates(&self, file_id: &FileId, record: &SyncDateRecord) -> Result<()> {
        let value = serde_json::to_string(record)?;
        self.db.put_state(&sync_dates_key(file_id), &value).await
    }
}

/// In-process status store
#[derive(Default)]
pub struct MemoryStatusStore {
    statuses: RwLock<HashMap<FileId, StatusRecord>>,
    dates: RwLock<HashMap<FileId, SyncDateRecord>>,
}

impl MemoryStatusStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn set(&self, file_id: &FileId, module: &str, status: SyncStatus) -> Result<()> {
        self.statuses
            .write()
            .await
            .entry(file_id.clone())
            .or_default()
            .set(module, status);
        Ok(())
    }

    async fn get_all(&self, file_id: &FileId) -> Result<StatusRecord> {
        Ok(self
            .statuses
            .read()
            .await
            .get(file_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn sync_dates(&self, file_id: &FileId) -> Result<SyncDateRecord> {
        Ok(self
            .dates
            .read()
            .await
            .get(file_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_sync_dates(&self, file_id: &FileId, record: &SyncDateRecord) -> Result<()> {
        self.dates
            .write()
            .await
            .insert(file_id.clone(), record.clone());
        Ok(())
    }
}
