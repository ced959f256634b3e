//! Remote Sync Gateway
//!
//! [`SyncGateway`] is the only way the orchestrator reaches the accounting
//! service. Every call takes the caller's bearer [`Credential`] and either
//! returns parsed data or a [`RemoteFailure`] naming the operation that
//! failed. Implementations never retry; retry policy lives with the caller.
//!
//! [`HttpGateway`] talks to the real service over HTTP.

use async_trait::async_trait;

use crate::error::RemoteFailure;
use crate::types::{
    CompanyId, Credential, ExportFormat, FileId, FileInfo, ModuleSummary, Region, SyncDateRecord,
};

mod http;

pub use http::HttpGateway;

/// Result of a gateway call
pub type RemoteResult<T> = std::result::Result<T, RemoteFailure>;

/// Remote operations needed to sync, refresh, export and delete module data
#[async_trait]
pub trait SyncGateway: Send + Sync {
    /// Ask the service to pull `modules` for `file_id` from the company
    ///
    /// Accepts one or more modules; the orchestrator always sends exactly one.
    async fn trigger_sync(
        &self,
        credential: &Credential,
        file_id: &FileId,
        modules: &[String],
    ) -> RemoteResult<()>;

    /// Last successful sync instant per module
    async fn fetch_sync_dates(
        &self,
        credential: &Credential,
        file_id: &FileId,
    ) -> RemoteResult<SyncDateRecord>;

    /// Record counts per module for a company
    async fn fetch_summary(
        &self,
        credential: &Credential,
        company_id: &CompanyId,
    ) -> RemoteResult<ModuleSummary>;

    /// Delete every stored record of one module for a company
    async fn delete_module_data(
        &self,
        credential: &Credential,
        company_id: &CompanyId,
        module: &str,
    ) -> RemoteResult<()>;

    /// Download one module's data as a spreadsheet
    async fn export_module_data(
        &self,
        credential: &Credential,
        file_id: &FileId,
        region: Region,
        module: &str,
        format: ExportFormat,
    ) -> RemoteResult<Vec<u8>>;

    /// File metadata, including its company connection
    async fn fetch_file(&self, credential: &Credential, file_id: &FileId) -> RemoteResult<FileInfo>;

    /// Company display name for a connected file
    async fn fetch_company_name(
        &self,
        credential: &Credential,
        file_id: &FileId,
    ) -> RemoteResult<String>;

    /// Authorization URL that links a file to a company
    async fn connect_url(&self, credential: &Credential, file_id: &FileId) -> RemoteResult<String>;

    /// Unlink a file from its company
    async fn disconnect(&self, credential: &Credential, file_id: &FileId) -> RemoteResult<()>;
}
