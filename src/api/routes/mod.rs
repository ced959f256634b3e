//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`files`] - File lookup, status, sync batches, refresh and company link
//! - [`modules`] - Module registry, per-file module table, delete and export
//! - [`system`] - Health, events, OpenAPI

use crate::registry::Selection;
use crate::types::{FileId, StatusRecord};
use serde::{Deserialize, Serialize};

mod files;
mod modules;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use files::*;
pub use modules::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for delete and export
///
/// Both actions are destructive or costly on the remote side and run only
/// when the caller states `confirm=true`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConfirmQuery {
    /// Whether the user confirmed the action (default: false)
    #[serde(default)]
    pub confirm: bool,
}

/// Request body for POST /files/:file_id/sync
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SyncRequest {
    /// Module keys to sync, in order (ignored when `all` is set)
    #[serde(default)]
    pub modules: Option<Selection>,
    /// Sync every registered module in registry order
    #[serde(default)]
    pub all: bool,
}

/// Response for GET /files/:file_id/connect
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ConnectResponse {
    /// Authorization URL to open in the user's browser
    pub url: String,
}

/// Response for GET /files/:file_id/status
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct FileStatusResponse {
    /// The file
    pub file_id: FileId,
    /// Persisted status per module (absent modules are Not Synced)
    pub statuses: StatusRecord,
    /// Whether a sync batch is currently running for the file
    pub syncing: bool,
}
