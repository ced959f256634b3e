//! Sync orchestration split into focused submodules.
//!
//! The `SyncManager` struct and its methods are organized by domain:
//! - [`sync`] - Sequential per-module sync batches
//! - [`refresh`] - Post-action refresh of sync dates and record counts
//! - [`actions`] - Confirmed delete and export of module data
//! - [`connection`] - File metadata, company link and the module table
//! - [`guard`] - Per-file single-flight guard for sync batches

mod actions;
mod connection;
mod guard;
mod refresh;
mod sync;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use actions::ExportReport;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::gateway::{HttpGateway, SyncGateway};
use crate::registry::ModuleRegistry;
use crate::status_store::{SqliteStatusStore, StatusStore};
use crate::types::{CompanyId, Event, FileContext, FileId, ModuleSummary};

/// What the manager remembers between calls for rendering and guards
#[derive(Clone, Default)]
pub(crate) struct ViewCache {
    /// Context resolved by the last `open_file` (or lazy lookup) per file
    pub(crate) files: Arc<RwLock<HashMap<FileId, FileContext>>>,
    /// Last record counts fetched per company
    pub(crate) summaries: Arc<RwLock<HashMap<CompanyId, ModuleSummary>>>,
}

/// Main orchestrator instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct SyncManager {
    /// Per-file status persistence
    pub(crate) store: Arc<dyn StatusStore>,
    /// Remote accounting service
    pub(crate) gateway: Arc<dyn SyncGateway>,
    /// Known modules, in display order
    pub(crate) registry: Arc<ModuleRegistry>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Files with a sync batch in flight
    pub(crate) in_flight: guard::InFlight,
    /// Linked companies and last summaries
    pub(crate) cache: ViewCache,
}

impl SyncManager {
    /// Create a manager over an injected store and gateway
    ///
    /// The configuration is validated first. Uses the QuickBooks Online
    /// module registry; see [`SyncManager::with_registry`] to replace it.
    pub fn new(
        config: Config,
        store: Arc<dyn StatusStore>,
        gateway: Arc<dyn SyncGateway>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(config.sync.event_buffer);

        Ok(Self {
            store,
            gateway,
            registry: Arc::new(ModuleRegistry::qbo()),
            config: Arc::new(config),
            event_tx,
            in_flight: guard::InFlight::default(),
            cache: ViewCache::default(),
        })
    }

    /// Open the configured SQLite database and talk to the configured service
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use qbo_sync::{Config, SyncManager};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let mut config = Config::default();
    ///     config.gateway.base_url = "https://books.example.com".to_string();
    ///
    ///     let manager = SyncManager::open(config).await?;
    ///     println!("{} modules available", manager.registry().len());
    ///     Ok(())
    /// }
    /// ```
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Database::new(&config.persistence.database_path).await?;
        let store = Arc::new(SqliteStatusStore::new(Arc::new(db)));
        let gateway = Arc::new(HttpGateway::new(&config.gateway)?);

        tracing::info!(
            database = %config.persistence.database_path.display(),
            base_url = %gateway.base_url(),
            "sync manager ready"
        );

        Self::new(config, store, gateway)
    }

    /// Replace the module registry
    pub fn with_registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Subscribe to orchestration events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than `sync.event_buffer` events
    /// receives a `RecvError::Lagged` error.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The module registry in use
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// The configuration the manager was built with
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The status store in use
    pub fn store(&self) -> &Arc<dyn StatusStore> {
        &self.store
    }

    /// Emit an event to all subscribers
    ///
    /// Having no subscribers is not an error.
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let manager = Arc::new(self.clone());
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(manager, config).await })
    }
}
