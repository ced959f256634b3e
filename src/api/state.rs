//! Application state for the API server

use crate::{Config, SyncManager};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The sync manager serving every route
    pub manager: Arc<SyncManager>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(manager: Arc<SyncManager>, config: Arc<Config>) -> Self {
        Self { manager, config }
    }
}
