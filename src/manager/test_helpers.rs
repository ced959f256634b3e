//! Shared test helpers: a scripted gateway and manager constructors.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::db::Database;
use crate::error::{RemoteFailure, RemoteFailureKind, RemoteOperation};
use crate::gateway::{RemoteResult, SyncGateway};
use crate::manager::SyncManager;
use crate::registry::ModuleRegistry;
use crate::status_store::{MemoryStatusStore, SqliteStatusStore, StatusStore};
use crate::types::{
    CompanyId, Credential, ExportFormat, FileId, FileInfo, ModuleCount, ModuleSummary,
    QboConnection, Region, SyncDateRecord, SyncStatus,
};

pub(crate) const REALM: &str = "realm-1";

/// One recorded gateway call
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Call {
    pub(crate) op: RemoteOperation,
    pub(crate) module: Option<String>,
}

/// Instant the fake service reports for a freshly synced module
pub(crate) fn synced_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 10, 15, 0).unwrap()
}

pub(crate) fn credential() -> Credential {
    Credential::bearer("test-token")
}

/// In-process stand-in for the accounting service
///
/// Behaves like the real service: a successful sync stamps the module's
/// sync date, a delete zeroes the module's count and clears its date.
pub(crate) struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    file: Mutex<FileInfo>,
    company_name: String,
    sync_dates: Mutex<SyncDateRecord>,
    summary: Mutex<ModuleSummary>,
    /// module -> (remaining failures, kind); u32::MAX fails forever
    trigger_failures: Mutex<HashMap<String, (u32, RemoteFailureKind)>>,
    failing_ops: Mutex<Vec<RemoteOperation>>,
    export_payload: Vec<u8>,
    /// When set, trigger_sync waits for a permit before answering
    trigger_gate: Mutex<Option<Arc<Semaphore>>>,
    /// When set, trigger_sync records the status persisted at call time
    observer: Mutex<Option<(Arc<MemoryStatusStore>, FileId)>>,
    seen_at_trigger: Mutex<Vec<(String, SyncStatus)>>,
}

impl FakeGateway {
    /// A file linked to company "Acme" (realm-1) in the USA, every module holding 5 records
    pub(crate) fn connected() -> Self {
        let summary = ModuleRegistry::qbo()
            .list()
            .iter()
            .map(|m| (m.key.clone(), ModuleCount { count: 5 }))
            .collect();

        Self {
            calls: Mutex::new(Vec::new()),
            file: Mutex::new(FileInfo {
                id: Some("f1".to_string()),
                file_name: "Acme books".to_string(),
                destination_region: Some("USA".to_string()),
                qbo: Some(QboConnection {
                    is_connected: true,
                    realm_id: Some(REALM.to_string()),
                    company_name: None,
                }),
            }),
            company_name: "Acme".to_string(),
            sync_dates: Mutex::new(SyncDateRecord::default()),
            summary: Mutex::new(ModuleSummary(summary)),
            trigger_failures: Mutex::new(HashMap::new()),
            failing_ops: Mutex::new(Vec::new()),
            export_payload: b"PK\x03\x04 spreadsheet".to_vec(),
            trigger_gate: Mutex::new(None),
            observer: Mutex::new(None),
            seen_at_trigger: Mutex::new(Vec::new()),
        }
    }

    /// A file that was never linked to a company
    pub(crate) fn disconnected() -> Self {
        let gateway = Self::connected();
        *gateway.file.lock().unwrap() = FileInfo {
            id: Some("f1".to_string()),
            file_name: "Loose file".to_string(),
            destination_region: Some("UK".to_string()),
            qbo: None,
        };
        gateway
    }

    /// Make every trigger for `module` fail
    pub(crate) fn fail_trigger(&self, module: &str, kind: RemoteFailureKind) {
        self.fail_trigger_times(module, u32::MAX, kind);
    }

    /// Make the next `times` triggers for `module` fail
    pub(crate) fn fail_trigger_times(&self, module: &str, times: u32, kind: RemoteFailureKind) {
        self.trigger_failures
            .lock()
            .unwrap()
            .insert(module.to_string(), (times, kind));
    }

    /// Make every call of `op` fail with HTTP 500
    pub(crate) fn fail_op(&self, op: RemoteOperation) {
        self.failing_ops.lock().unwrap().push(op);
    }

    /// Stop failing `op`
    pub(crate) fn heal_op(&self, op: RemoteOperation) {
        self.failing_ops.lock().unwrap().retain(|o| *o != op);
    }

    pub(crate) fn set_count(&self, module: &str, count: u64) {
        self.summary
            .lock()
            .unwrap()
            .0
            .insert(module.to_string(), ModuleCount { count });
    }

    /// Put a company name on the file record itself
    pub(crate) fn set_record_company_name(&self, name: &str) {
        if let Some(qbo) = self.file.lock().unwrap().qbo.as_mut() {
            qbo.company_name = Some(name.to_string());
        }
    }

    pub(crate) fn set_destination_region(&self, region: Option<&str>) {
        self.file.lock().unwrap().destination_region = region.map(str::to_string);
    }

    /// Hold every trigger until the returned semaphore gets permits
    pub(crate) fn gate_triggers(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.trigger_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Record the persisted status of each module as its trigger arrives
    pub(crate) fn observe_statuses(&self, store: Arc<MemoryStatusStore>, file_id: FileId) {
        *self.observer.lock().unwrap() = Some((store, file_id));
    }

    pub(crate) fn seen_at_trigger(&self) -> Vec<(String, SyncStatus)> {
        self.seen_at_trigger.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, op: RemoteOperation) -> usize {
        self.calls().iter().filter(|c| c.op == op).count()
    }

    /// Modules passed to trigger_sync, in call order
    pub(crate) fn triggered(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.op == RemoteOperation::TriggerSync)
            .filter_map(|c| c.module)
            .collect()
    }

    fn record(&self, op: RemoteOperation, module: Option<&str>) -> RemoteResult<()> {
        self.calls.lock().unwrap().push(Call {
            op,
            module: module.map(str::to_string),
        });

        if self.failing_ops.lock().unwrap().contains(&op) {
            let failure = RemoteFailure::new(op, RemoteFailureKind::Status { code: 500 }, "HTTP 500");
            return Err(match module {
                Some(m) => failure.for_module(m),
                None => failure,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SyncGateway for FakeGateway {
    async fn trigger_sync(
        &self,
        _credential: &Credential,
        file_id: &FileId,
        modules: &[String],
    ) -> RemoteResult<()> {
        assert_eq!(modules.len(), 1, "the orchestrator triggers one module at a time");
        let module = modules[0].clone();

        let observer = self.observer.lock().unwrap().clone();
        if let Some((store, observed_file)) = observer {
            let status = store.get(&observed_file, &module).await.unwrap();
            self.seen_at_trigger
                .lock()
                .unwrap()
                .push((module.clone(), status));
        }

        let gate = self.trigger_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        self.record(RemoteOperation::TriggerSync, Some(&module))?;

        {
            let mut failures = self.trigger_failures.lock().unwrap();
            if let Some((remaining, kind)) = failures.get_mut(&module) {
                if *remaining > 0 {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    return Err(RemoteFailure::new(
                        RemoteOperation::TriggerSync,
                        kind.clone(),
                        format!("sync of {module} for {file_id} rejected"),
                    )
                    .for_module(&module));
                }
            }
        }

        self.sync_dates
            .lock()
            .unwrap()
            .0
            .insert(module, Some(synced_at()));
        Ok(())
    }

    async fn fetch_sync_dates(
        &self,
        _credential: &Credential,
        _file_id: &FileId,
    ) -> RemoteResult<SyncDateRecord> {
        self.record(RemoteOperation::FetchSyncDates, None)?;
        Ok(self.sync_dates.lock().unwrap().clone())
    }

    async fn fetch_summary(
        &self,
        _credential: &Credential,
        company_id: &CompanyId,
    ) -> RemoteResult<ModuleSummary> {
        self.record(RemoteOperation::FetchSummary, None)?;
        assert_eq!(company_id.as_str(), REALM, "summary is keyed by company, not file");
        Ok(self.summary.lock().unwrap().clone())
    }

    async fn delete_module_data(
        &self,
        _credential: &Credential,
        _company_id: &CompanyId,
        module: &str,
    ) -> RemoteResult<()> {
        self.record(RemoteOperation::DeleteModuleData, Some(module))?;
        self.set_count(module, 0);
        self.sync_dates
            .lock()
            .unwrap()
            .0
            .insert(module.to_string(), None);
        Ok(())
    }

    async fn export_module_data(
        &self,
        _credential: &Credential,
        _file_id: &FileId,
        region: Region,
        module: &str,
        _format: ExportFormat,
    ) -> RemoteResult<Vec<u8>> {
        self.record(RemoteOperation::ExportModuleData, Some(module))?;
        assert_eq!(Some(region.code().to_string()), self.file.lock().unwrap().destination_region);
        Ok(self.export_payload.clone())
    }

    async fn fetch_file(&self, _credential: &Credential, _file_id: &FileId) -> RemoteResult<FileInfo> {
        self.record(RemoteOperation::FetchFile, None)?;
        Ok(self.file.lock().unwrap().clone())
    }

    async fn fetch_company_name(
        &self,
        _credential: &Credential,
        _file_id: &FileId,
    ) -> RemoteResult<String> {
        self.record(RemoteOperation::FetchCompanyName, None)?;
        Ok(self.company_name.clone())
    }

    async fn connect_url(&self, _credential: &Credential, file_id: &FileId) -> RemoteResult<String> {
        self.record(RemoteOperation::Connect, None)?;
        Ok(format!("https://appcenter.example.com/connect?state={file_id}"))
    }

    async fn disconnect(&self, _credential: &Credential, _file_id: &FileId) -> RemoteResult<()> {
        self.record(RemoteOperation::Disconnect, None)?;
        if let Some(qbo) = self.file.lock().unwrap().qbo.as_mut() {
            qbo.is_connected = false;
        }
        Ok(())
    }
}

/// Default config with millisecond retry delays
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.sync.retry.initial_delay = Duration::from_millis(1);
    config.sync.retry.max_delay = Duration::from_millis(5);
    config.sync.retry.jitter = false;
    config
}

/// Manager over an in-memory store; the store is returned for inspection
pub(crate) fn create_test_manager(gateway: Arc<FakeGateway>) -> (SyncManager, Arc<MemoryStatusStore>) {
    let store = Arc::new(MemoryStatusStore::new());
    let manager = SyncManager::new(test_config(), store.clone(), gateway).unwrap();
    (manager, store)
}

/// Manager over a SQLite store in a temp dir (which must be kept alive)
pub(crate) async fn create_sqlite_manager(gateway: Arc<FakeGateway>) -> (SyncManager, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.persistence.database_path = temp_dir.path().join("state.db");
    config.export.export_dir = temp_dir.path().join("exports");

    let db = Database::new(&config.persistence.database_path).await.unwrap();
    let store: Arc<dyn StatusStore> = Arc::new(SqliteStatusStore::new(Arc::new(db)));
    let manager = SyncManager::new(config, store, gateway).unwrap();
    (manager, temp_dir)
}
