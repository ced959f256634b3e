//! Error types for qbo-sync
//!
//! This module provides the error taxonomy for the library:
//! - Validation failures (empty or unknown selections) that abort before any remote call
//! - Remote failures from the accounting service, tagged with operation and module
//! - Refresh failures, which are secondary and never undo the action that triggered them
//! - HTTP status code mapping and structured error bodies for the REST surface

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for qbo-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for qbo-sync
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "gateway.base_url")
        key: Option<String>,
    },

    /// Caller input rejected before any remote call was issued
    #[error("validation failed: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// A module key that is not part of the registry
    #[error("unknown module: {module}")]
    UnknownModule {
        /// The offending module key
        module: String,
    },

    /// A call to the remote accounting service failed
    #[error(transparent)]
    Remote(#[from] RemoteFailure),

    /// Post-action refresh failed (secondary, never reverts the primary action)
    #[error(transparent)]
    Refresh(#[from] RefreshFailure),

    /// A sync batch is already running for this file
    #[error("a sync batch is already running for file {file_id}")]
    SyncInProgress {
        /// File whose batch is in flight
        file_id: String,
    },

    /// The confirmation gate declined a destructive or export action
    #[error("{action} was not confirmed")]
    NotConfirmed {
        /// The action that was declined (e.g., "delete", "export")
        action: String,
    },

    /// The file is not linked to a company on the accounting service
    #[error("file {file_id} is not connected to a company")]
    NotConnected {
        /// The file that has no company link
        file_id: String,
    },

    /// Last known record count for the module is zero
    #[error("module {module} has no records")]
    EmptyModule {
        /// Module with no records
        module: String,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Stored value could not be decoded
    #[error("corrupt state for key {key}: {reason}")]
    CorruptState {
        /// The local state key holding the bad value
        key: String,
        /// Why decoding failed
        reason: String,
    },
}

/// Remote operations exposed by the gateway
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOperation {
    /// POST /qbo/sync
    TriggerSync,
    /// GET /qborawdata/sync-dates/{fileId}
    FetchSyncDates,
    /// GET /qborawdata/summary/{companyId}
    FetchSummary,
    /// DELETE /qborawdata/delete/{companyId}/{moduleKey}
    DeleteModuleData,
    /// GET /qborawdata/export-{excel|csv}/{fileId}/{region}/{moduleKey}
    ExportModuleData,
    /// GET /files/{fileId}
    FetchFile,
    /// GET /qbocompany/company/{fileId}
    FetchCompanyName,
    /// GET /qbo/connect/{fileId}
    Connect,
    /// POST /qbo/disconnect/{fileId}
    Disconnect,
}

impl RemoteOperation {
    /// Stable name used in logs and error bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteOperation::TriggerSync => "trigger_sync",
            RemoteOperation::FetchSyncDates => "fetch_sync_dates",
            RemoteOperation::FetchSummary => "fetch_summary",
            RemoteOperation::DeleteModuleData => "delete_module_data",
            RemoteOperation::ExportModuleData => "export_module_data",
            RemoteOperation::FetchFile => "fetch_file",
            RemoteOperation::FetchCompanyName => "fetch_company_name",
            RemoteOperation::Connect => "connect",
            RemoteOperation::Disconnect => "disconnect",
        }
    }
}

impl std::fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a remote call failed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteFailureKind {
    /// The request never produced a response (connect error, timeout, reset)
    Transport {
        /// Whether the transport gave up because of a timeout
        timeout: bool,
    },
    /// The service answered with a non-2xx status
    Status {
        /// HTTP status code
        code: u16,
    },
    /// A request or response body was unusable
    Payload,
}

/// A failed gateway call, normalized regardless of cause
#[derive(Clone, Debug, Error, Serialize, Deserialize, ToSchema)]
#[error(
    "remote {operation} failed{}: {message}",
    .module.as_ref().map(|m| format!(" for module {m}")).unwrap_or_default()
)]
pub struct RemoteFailure {
    /// The gateway operation that failed
    pub operation: RemoteOperation,
    /// The module involved, when the operation is module-scoped
    pub module: Option<String>,
    /// Failure classification
    pub kind: RemoteFailureKind,
    /// Human-readable detail
    pub message: String,
}

impl RemoteFailure {
    /// Create a failure for an operation
    pub fn new(operation: RemoteOperation, kind: RemoteFailureKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            module: None,
            kind,
            message: message.into(),
        }
    }

    /// Tag the failure with the module it concerns
    pub fn for_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Classify a reqwest error raised while sending or reading a request
    pub fn from_reqwest(operation: RemoteOperation, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            RemoteFailureKind::Transport { timeout: true }
        } else if err.is_decode() {
            RemoteFailureKind::Payload
        } else if let Some(status) = err.status() {
            RemoteFailureKind::Status {
                code: status.as_u16(),
            }
        } else {
            RemoteFailureKind::Transport { timeout: false }
        };
        Self::new(operation, kind, err.to_string())
    }

    /// Whether the failure happened below the HTTP layer
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, RemoteFailureKind::Transport { .. })
    }
}

/// A post-action refresh that could not complete
#[derive(Clone, Debug, Error, Serialize, Deserialize, ToSchema)]
#[error("refresh failed during {operation}: {message}")]
pub struct RefreshFailure {
    /// The refresh step that failed
    pub operation: RemoteOperation,
    /// Human-readable detail
    pub message: String,
}

impl From<RemoteFailure> for RefreshFailure {
    fn from(failure: RemoteFailure) -> Self {
        Self {
            operation: failure.operation,
            message: failure.message,
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "remote_failure",
///     "message": "remote delete_module_data failed for module vendor: HTTP 500",
///     "details": { "operation": "delete_module_data", "module": "vendor" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "validation_error", "remote_failure")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::Validation { .. } => 400,
            Error::UnknownModule { .. } => 404,
            Error::NotConfirmed { .. } => 412, // Precondition Failed
            Error::NotConnected { .. } => 409,
            Error::SyncInProgress { .. } => 409,
            Error::EmptyModule { .. } => 422,

            // Upstream accounting service problems
            Error::Remote(_) | Error::Refresh(_) => 502,

            Error::Database(_)
            | Error::Sqlx(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::ApiServerError(_)
            | Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation { .. } => "validation_error",
            Error::UnknownModule { .. } => "unknown_module",
            Error::Remote(_) => "remote_failure",
            Error::Refresh(_) => "refresh_failure",
            Error::SyncInProgress { .. } => "sync_in_progress",
            Error::NotConfirmed { .. } => "not_confirmed",
            Error::NotConnected { .. } => "not_connected",
            Error::EmptyModule { .. } => "empty_module",
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Remote(failure) => Some(serde_json::json!({
                "operation": failure.operation,
                "module": failure.module,
                "failure": failure.kind,
            })),
            Error::Refresh(failure) => Some(serde_json::json!({
                "operation": failure.operation,
            })),
            Error::SyncInProgress { file_id } | Error::NotConnected { file_id } => {
                Some(serde_json::json!({ "file_id": file_id }))
            }
            Error::UnknownModule { module } | Error::EmptyModule { module } => {
                Some(serde_json::json!({ "module": module }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
