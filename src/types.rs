//! Core types for qbo-sync

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::error::{RefreshFailure, RemoteFailure, RemoteOperation};

/// Identifier of a file (logical workspace)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct FileId(pub String);

impl FileId {
    /// Create a new FileId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FileId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a connected company (QBO realm), distinct from the file identifier
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct CompanyId(pub String);

impl CompanyId {
    /// Create a new CompanyId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CompanyId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CompanyId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CompanyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bearer credential issued by the authentication collaborator
///
/// The token is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a bearer token
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building the Authorization header
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Synchronization status of one module for one file
///
/// `Completed` and `Error` are resting states: a fresh sync request moves
/// them back to `Fetching`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum SyncStatus {
    /// No sync has been recorded
    #[default]
    #[serde(rename = "Not Synced")]
    NotSynced,
    /// A sync request is in flight
    #[serde(rename = "Fetching")]
    Fetching,
    /// The last sync succeeded
    #[serde(rename = "Completed")]
    Completed,
    /// The last sync failed
    #[serde(rename = "Error")]
    Error,
}

impl SyncStatus {
    /// Display/wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::NotSynced => "Not Synced",
            SyncStatus::Fetching => "Fetching",
            SyncStatus::Completed => "Completed",
            SyncStatus::Error => "Error",
        }
    }

    /// Whether a batch has finished with this module
    pub fn is_settled(&self) -> bool {
        matches!(self, SyncStatus::Completed | SyncStatus::Error)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-file mapping from module key to status
///
/// Absent keys read as [`SyncStatus::NotSynced`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct StatusRecord(pub BTreeMap<String, SyncStatus>);

impl StatusRecord {
    /// Status of a module, defaulting to NotSynced
    pub fn status(&self, module: &str) -> SyncStatus {
        self.0.get(module).copied().unwrap_or_default()
    }

    /// Overwrite the status of a module
    pub fn set(&mut self, module: impl Into<String>, status: SyncStatus) {
        self.0.insert(module.into(), status);
    }

    /// Iterate over recorded entries
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SyncStatus)> {
        self.0.iter()
    }

    /// Number of recorded entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-file mapping from module key to last successful sync instant
///
/// Populated only from the remote service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct SyncDateRecord(pub BTreeMap<String, Option<DateTime<Utc>>>);

impl SyncDateRecord {
    /// Last sync instant of a module, if the remote reported one
    pub fn last_synced(&self, module: &str) -> Option<DateTime<Utc>> {
        self.0.get(module).copied().flatten()
    }
}

/// Record count of one module
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ModuleCount {
    /// Number of records held by the remote service
    #[serde(default)]
    pub count: u64,
}

/// Per-company mapping from module key to record count
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ModuleSummary(pub BTreeMap<String, ModuleCount>);

impl ModuleSummary {
    /// Record count of a module, 0 when the remote reported nothing
    pub fn count(&self, module: &str) -> u64 {
        self.0.get(module).map(|c| c.count).unwrap_or(0)
    }
}

/// Destination region of a file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Region {
    /// United States
    #[serde(rename = "USA")]
    Usa,
    /// South Africa
    #[serde(rename = "SA")]
    Sa,
    /// Australia
    #[serde(rename = "AUS")]
    Aus,
    /// United Kingdom
    #[serde(rename = "UK")]
    Uk,
    /// Any other region
    #[serde(rename = "OTHER")]
    Other,
}

impl Region {
    /// Region code as used in remote paths and artifact names
    pub fn code(&self) -> &'static str {
        match self {
            Region::Usa => "USA",
            Region::Sa => "SA",
            Region::Aus => "AUS",
            Region::Uk => "UK",
            Region::Other => "OTHER",
        }
    }

    /// Human-readable region name
    pub fn label(&self) -> &'static str {
        match self {
            Region::Usa => "USA",
            Region::Sa => "South Africa",
            Region::Aus => "Australia",
            Region::Uk => "United Kingdom",
            Region::Other => "Other",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Region {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USA" => Ok(Region::Usa),
            "SA" => Ok(Region::Sa),
            "AUS" => Ok(Region::Aus),
            "UK" => Ok(Region::Uk),
            "OTHER" => Ok(Region::Other),
            _ => Err(crate::Error::Validation {
                message: format!("unknown region '{s}'"),
            }),
        }
    }
}

/// Export file format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Excel workbook (.xlsx)
    Excel,
    /// Comma-separated values (.csv)
    Csv,
}

impl ExportFormat {
    /// Artifact file extension
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    /// Remote path segment selecting the export endpoint
    pub fn endpoint(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "export-excel",
            ExportFormat::Csv => "export-csv",
        }
    }

    /// MIME type of the artifact
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv",
        }
    }

    /// Short label used in confirmation prompts
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "Excel",
            ExportFormat::Csv => "CSV",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(crate::Error::Validation {
                message: format!("unknown export format '{s}'"),
            }),
        }
    }
}

/// Connection block of a file record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QboConnection {
    /// Whether the file is linked to a company
    #[serde(default)]
    pub is_connected: bool,
    /// Company (realm) identifier
    #[serde(default)]
    pub realm_id: Option<String>,
    /// Company display name, when the service already knows it
    #[serde(default)]
    pub company_name: Option<String>,
}

/// File metadata as reported by the remote service
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Remote record identifier
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// File display name
    #[serde(default)]
    pub file_name: String,
    /// Destination region code
    #[serde(default)]
    pub destination_region: Option<String>,
    /// Company connection, absent for never-connected files
    #[serde(default)]
    pub qbo: Option<QboConnection>,
}

impl FileInfo {
    /// Whether the file is linked to a company
    pub fn is_connected(&self) -> bool {
        self.qbo.as_ref().is_some_and(|q| q.is_connected)
    }

    /// The linked company, if connected and the realm is known
    pub fn company_id(&self) -> Option<CompanyId> {
        self.qbo
            .as_ref()
            .filter(|q| q.is_connected)
            .and_then(|q| q.realm_id.clone())
            .filter(|realm| !realm.is_empty())
            .map(CompanyId)
    }

    /// Company name stored on the file record, if non-empty
    pub fn company_name(&self) -> Option<&str> {
        self.qbo
            .as_ref()
            .and_then(|q| q.company_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

/// Everything needed to act on a file, resolved once per session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileContext {
    /// The file
    pub file_id: FileId,
    /// File display name
    pub file_name: String,
    /// Destination region, when set and recognised
    pub region: Option<Region>,
    /// Linked company, when connected
    pub company_id: Option<CompanyId>,
    /// Company display name (empty when not connected)
    pub company_name: String,
    /// Sync dates at the time the file was opened
    pub sync_dates: SyncDateRecord,
}

/// Result of one module within a sync batch
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ModuleOutcome {
    /// Module key
    pub module: String,
    /// Final status (Completed or Error)
    pub status: SyncStatus,
    /// Number of trigger attempts made
    pub attempts: u32,
    /// Failure reason, for modules that ended in Error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteFailure>,
}

/// Sync dates and record counts re-pulled after an action
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RefreshSnapshot {
    /// Refreshed sync dates for the file
    pub sync_dates: SyncDateRecord,
    /// Refreshed record counts for the company
    pub summary: ModuleSummary,
}

/// Result of the post-action refresh
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Both refresh calls succeeded
    Refreshed(RefreshSnapshot),
    /// The refresh failed; the primary action still stands
    Failed(RefreshFailure),
}

impl RefreshOutcome {
    /// The snapshot, when the refresh succeeded
    pub fn snapshot(&self) -> Option<&RefreshSnapshot> {
        match self {
            RefreshOutcome::Refreshed(snapshot) => Some(snapshot),
            RefreshOutcome::Failed(_) => None,
        }
    }

    /// The secondary failure, when the refresh did not complete
    pub fn failure(&self) -> Option<&RefreshFailure> {
        match self {
            RefreshOutcome::Refreshed(_) => None,
            RefreshOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Result of a sync batch
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchReport {
    /// The file that was synced
    pub file_id: FileId,
    /// Per-module results, in processing order
    pub outcomes: Vec<ModuleOutcome>,
    /// Sync dates after the last successful module (unchanged if none succeeded)
    pub sync_dates: SyncDateRecord,
    /// Post-batch refresh result
    pub refresh: RefreshOutcome,
}

impl BatchReport {
    /// Modules that ended Completed
    pub fn completed(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == SyncStatus::Completed)
            .map(|o| o.module.as_str())
    }

    /// Modules that ended in Error
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == SyncStatus::Error)
            .map(|o| o.module.as_str())
    }

    /// Whether every module in the batch completed
    pub fn all_completed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == SyncStatus::Completed)
    }
}

/// Result of a confirmed module deletion
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteReport {
    /// The file the deletion was issued from
    pub file_id: FileId,
    /// The company whose data was deleted
    pub company_id: CompanyId,
    /// The deleted module
    pub module: String,
    /// Post-delete refresh result
    pub refresh: RefreshOutcome,
}

/// One row of the per-file module table, in registry order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ModuleRow {
    /// Module key
    pub key: String,
    /// Display label
    pub label: String,
    /// Persisted sync status
    pub status: SyncStatus,
    /// Last successful sync, as last reported by the remote
    pub last_synced: Option<DateTime<Utc>>,
    /// Record count from the last summary, if one was fetched
    pub count: Option<u64>,
    /// Whether export/delete make sense (records are known to exist)
    pub actionable: bool,
}

/// Event emitted while orchestrating syncs and module actions
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A sync batch was accepted
    BatchStarted {
        /// File being synced
        file_id: FileId,
        /// Modules in processing order
        modules: Vec<String>,
    },

    /// A module status was persisted
    ModuleStatusChanged {
        /// File the module belongs to
        file_id: FileId,
        /// Module key
        module: String,
        /// New status
        status: SyncStatus,
    },

    /// A module failed within a batch (the batch continues)
    ModuleSyncFailed {
        /// File being synced
        file_id: FileId,
        /// Module key
        module: String,
        /// Failure reason
        error: String,
    },

    /// A sync batch finished
    BatchFinished {
        /// File that was synced
        file_id: FileId,
        /// Number of modules that completed
        completed: usize,
        /// Number of modules that failed
        failed: usize,
    },

    /// Sync dates were re-pulled for a file
    SyncDatesRefreshed {
        /// File whose dates were refreshed
        file_id: FileId,
    },

    /// Record counts were re-pulled for a company
    SummaryRefreshed {
        /// Company whose counts were refreshed
        company_id: CompanyId,
    },

    /// A post-action refresh failed
    RefreshFailed {
        /// File the refresh was for
        file_id: FileId,
        /// Refresh step that failed
        operation: RemoteOperation,
        /// Failure reason
        error: String,
    },

    /// Remote data for a module was deleted
    ModuleDeleted {
        /// File the deletion was issued from
        file_id: FileId,
        /// Company whose data was deleted
        company_id: CompanyId,
        /// Module key
        module: String,
    },

    /// A module export was materialized
    ModuleExported {
        /// File exported from
        file_id: FileId,
        /// Module key
        module: String,
        /// Artifact name
        file_name: String,
    },

    /// A file was disconnected from its company
    Disconnected {
        /// The disconnected file
        file_id: FileId,
    },
}
