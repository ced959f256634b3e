//! Database layer for qbo-sync
//!
//! Handles SQLite persistence for the per-file local state that survives
//! restarts: module sync statuses and the last fetched sync dates.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`state`] - Namespaced key/value state (`local_state` table)

use sqlx::{FromRow, sqlite::SqlitePool};

mod migrations;
mod state;

/// One row of the `local_state` table
#[derive(Debug, Clone, FromRow)]
pub struct StateEntry {
    /// Namespaced key, e.g. `qbo_sync_status_<fileId>`
    pub key: String,
    /// Serialized JSON value
    pub value: String,
    /// Unix timestamp of the last write
    pub updated_at: i64,
}

/// Database handle for qbo-sync
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
