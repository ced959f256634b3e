//! Namespaced key/value state: per-file status records and cached sync dates.

use crate::error::DatabaseError;
use crate::types::{StatusRecord, SyncStatus};
use crate::{Error, Result};
use sqlx::SqliteConnection;

use super::{Database, StateEntry};

impl Database {
    /// Read the raw value stored under `key`
    pub async fn get_state(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar(
            r#"
            SELECT value FROM local_state WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to read state {}: {}",
                key, e
            )))
        })?;

        Ok(value)
    }

    /// Read the full row stored under `key`, including its write time
    pub async fn get_state_entry(&self, key: &str) -> Result<Option<StateEntry>> {
        let entry = sqlx::query_as::<_, StateEntry>(
            r#"
            SELECT key, value, updated_at FROM local_state WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to read state {}: {}",
                key, e
            )))
        })?;

        Ok(entry)
    }

    /// Store `value` under `key`, replacing any previous value
    ///
    /// The write is committed before this returns.
    pub async fn put_state(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO local_state (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to write state {}: {}",
                key, e
            )))
        })?;

        Ok(())
    }

    /// Set one module's status inside the status record stored under `key`
    ///
    /// Read-modify-write runs in a single write transaction, so two callers
    /// updating different modules of the same file never lose each other's
    /// entry. A stored value that no longer decodes is replaced by a fresh
    /// record. Returns the record as written.
    pub async fn update_status_entry(
        &self,
        key: &str,
        module: &str,
        status: SyncStatus,
    ) -> Result<StatusRecord> {
        // Runs on its own task so a cancelled caller cannot hand a connection
        // back to the pool with the transaction still open.
        let pool = self.pool.clone();
        let key = key.to_string();
        let module = module.to_string();
        tokio::spawn(async move {
            let mut conn = pool.acquire().await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to acquire connection: {}",
                    e
                )))
            })?;

            // IMMEDIATE takes the write lock up front instead of upgrading mid-transaction
            sqlx::query("BEGIN IMMEDIATE")
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to begin transaction: {}",
                        e
                    )))
                })?;

            let result = Self::write_status_entry(&mut conn, &key, &module, status).await;

            match result {
                Ok(record) => {
                    sqlx::query("COMMIT")
                        .execute(&mut *conn)
                        .await
                        .map_err(|e| {
                            Error::Database(DatabaseError::QueryFailed(format!(
                                "Failed to commit status update for {}: {}",
                                key, e
                            )))
                        })?;
                    Ok::<StatusRecord, Error>(record)
                }
                Err(e) => {
                    let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                    Err(e)
                }
            }
        })
        .await
        .map_err(|e| Error::Other(format!("status update task failed: {}", e)))?
    }

    async fn write_status_entry(
        conn: &mut SqliteConnection,
        key: &str,
        module: &str,
        status: SyncStatus,
    ) -> Result<StatusRecord> {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT value FROM local_state WHERE key = ?")
                .bind(key)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to read state {}: {}",
                        key, e
                    )))
                })?;

        let mut record = match existing {
            Some(raw) => serde_json::from_str::<StatusRecord>(&raw).unwrap_or_else(|e| {
                tracing::warn!(key = %key, error = %e, "discarding undecodable status record");
                StatusRecord::default()
            }),
            None => StatusRecord::default(),
        };
        record.set(module, status);

        let value = serde_json::to_string(&record)?;
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO local_state (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(&value)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to write state {}: {}",
                key, e
            )))
        })?;

        Ok(record)
    }

    /// Remove the value stored under `key`
    ///
    /// Returns true if a row was deleted.
    pub async fn delete_state(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM local_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete state {}: {}",
                    key, e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }
}
