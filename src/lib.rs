//! # qbo-sync
//!
//! Per-module synchronization orchestrator for QuickBooks Online data.
//!
//! A file (logical workspace) linked to a QuickBooks Online company can pull
//! each accounting module (accounts, invoices, bills, ...) independently.
//! qbo-sync drives those pulls one module at a time, keeps a durable
//! per-module status that survives restarts, and offers confirmed delete and
//! export of a module's remote data.
//!
//! ## Design
//!
//! - **Library-first** - No CLI or UI; embed [`SyncManager`] or serve it over HTTP with [`api`]
//! - **Durable status** - Every status transition is persisted before the next step runs
//! - **Isolated failures** - One module failing never stops the rest of a batch
//! - **Event-driven** - Consumers subscribe to [`Event`]s instead of polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use qbo_sync::{Config, Credential, FileId, Selection, SyncManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.gateway.base_url = "https://accounting.example.com".to_string();
//!
//!     let manager = SyncManager::open(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = manager.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let credential = Credential::bearer("token-from-login");
//!     let file = FileId::from("file-123");
//!     let selection: Selection = ["invoice", "bill"].into_iter().collect();
//!
//!     let report = manager.run_sync(&credential, &file, &selection).await?;
//!     for module in report.failed() {
//!         eprintln!("{module} failed");
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Export naming, writing and confirmation
pub mod export;
/// Remote accounting service client
pub mod gateway;
/// Sync orchestration facade (decomposed into focused submodules)
pub mod manager;
/// Module registry and selections
pub mod registry;
/// Retry logic with exponential backoff
pub mod retry;
/// Per-file module status persistence
pub mod status_store;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, FileCollisionAction, RetryConfig};
pub use db::Database;
pub use error::{
    ApiError, DatabaseError, Error, ErrorDetail, RefreshFailure, RemoteFailure,
    RemoteFailureKind, RemoteOperation, Result, ToHttpStatus,
};
pub use export::{
    AutoConfirm, Confirmation, ConfirmationRequest, Decline, ExportArtifact, ExportMaterializer,
    SaveOutcome,
};
pub use gateway::{HttpGateway, SyncGateway};
pub use manager::{ExportReport, SyncManager};
pub use registry::{ModuleDescriptor, ModuleRegistry, Selection};
pub use status_store::{MemoryStatusStore, SqliteStatusStore, StatusStore};
pub use types::{
    BatchReport, CompanyId, Credential, DeleteReport, Event, ExportFormat, FileContext, FileId,
    ModuleOutcome, ModuleRow, ModuleSummary, RefreshOutcome, RefreshSnapshot, Region,
    StatusRecord, SyncDateRecord, SyncStatus,
};

/// Serve the REST API until SIGTERM, SIGINT or Ctrl+C.
///
/// A batch still running when the signal arrives is abandoned; modules it
/// had not settled keep their `Fetching` status.
///
/// # Example
///
/// ```no_run
/// use qbo_sync::{Config, SyncManager, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = SyncManager::open(Config::default()).await?;
///
///     // Serve until SIGTERM/SIGINT
///     run_with_shutdown(manager).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(manager: SyncManager) -> Result<()> {
    let server = manager.spawn_api_server();
    let abort = server.abort_handle();

    tokio::select! {
        _ = wait_for_signal() => {
            abort.abort();
            tracing::info!("API server shut down");
            Ok(())
        }
        joined = server => match joined {
            Ok(result) => result,
            Err(e) => Err(Error::ApiServerError(e.to_string())),
        },
    }
}

/// Resolves on the first SIGTERM or SIGINT. Falls back to Ctrl+C alone when
/// the unix handlers cannot be installed.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let handlers = signal(SignalKind::terminate())
        .and_then(|term| Ok((term, signal(SignalKind::interrupt())?)));

    let (mut term, mut int) = match handlers {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(error = %e, "signal handlers unavailable, waiting for ctrl_c");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    let name = tokio::select! {
        _ = term.recv() => "SIGTERM",
        _ = int.recv() => "SIGINT",
    };
    tracing::info!(signal = name, "shutdown signal received");
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl+C");
        return;
    }
    tracing::info!(signal = "ctrl_c", "shutdown signal received");
}
