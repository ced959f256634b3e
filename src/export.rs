//! Export Materializer and the confirmation gate
//!
//! Exported spreadsheets are named `{company}_{region}_{module}.{xlsx|csv}`
//! and handed over untouched. Destructive and export actions go through a
//! caller-supplied [`Confirmation`] before any remote call is issued.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{ExportConfig, FileCollisionAction};
use crate::error::Result;
use crate::types::{ExportFormat, Region};
use crate::utils::{get_unique_path, sanitize_file_name};

/// Deterministic artifact name for an export
///
/// ```
/// use qbo_sync::export::artifact_name;
/// use qbo_sync::{ExportFormat, Region};
///
/// let name = artifact_name("Acme", Region::Usa, "invoice", ExportFormat::Excel);
/// assert_eq!(name, "Acme_USA_invoice.xlsx");
/// ```
pub fn artifact_name(company_name: &str, region: Region, module: &str, format: ExportFormat) -> String {
    format!(
        "{}_{}_{}.{}",
        company_name,
        region.code(),
        module,
        format.extension()
    )
}

/// A named export ready to be handed to the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Download name, see [`artifact_name`]
    pub file_name: String,
    /// Spreadsheet format
    pub format: ExportFormat,
    /// Payload exactly as received from the service
    pub data: Vec<u8>,
}

impl ExportArtifact {
    /// Name and wrap a payload without altering its bytes
    pub fn materialize(
        data: Vec<u8>,
        company_name: &str,
        region: Region,
        module: &str,
        format: ExportFormat,
    ) -> Self {
        Self {
            file_name: artifact_name(company_name, region, module, format),
            format,
            data,
        }
    }

    /// MIME type of the payload
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Where a saved artifact ended up
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The artifact was written to this path
    Written(PathBuf),
    /// A file already existed at this path and was kept
    Skipped(PathBuf),
}

impl SaveOutcome {
    /// Path that was written or kept
    pub fn path(&self) -> &Path {
        match self {
            SaveOutcome::Written(path) | SaveOutcome::Skipped(path) => path,
        }
    }
}

/// Writes export artifacts to a directory
#[derive(Clone, Debug)]
pub struct ExportMaterializer {
    dir: PathBuf,
    collision: FileCollisionAction,
}

impl ExportMaterializer {
    /// Materializer writing into `dir`
    pub fn new(dir: impl Into<PathBuf>, collision: FileCollisionAction) -> Self {
        Self {
            dir: dir.into(),
            collision,
        }
    }

    /// Materializer for the configured export directory
    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(config.export_dir.clone(), config.file_collision)
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an artifact, applying the collision policy
    pub async fn save(&self, artifact: &ExportArtifact) -> Result<SaveOutcome> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.dir.join(sanitize_file_name(&artifact.file_name));
        match get_unique_path(&target, self.collision)? {
            Some(path) => {
                tokio::fs::write(&path, &artifact.data).await?;
                tracing::info!(
                    path = %path.display(),
                    bytes = artifact.len(),
                    "export artifact saved"
                );
                Ok(SaveOutcome::Written(path))
            }
            None => {
                tracing::info!(path = %target.display(), "export artifact exists, skipping");
                Ok(SaveOutcome::Skipped(target))
            }
        }
    }
}

/// Action awaiting confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConfirmAction {
    /// Delete all remote data of a module
    Delete,
    /// Export a module as a spreadsheet
    Export {
        /// Requested format
        format: ExportFormat,
    },
}

impl ConfirmAction {
    /// Short verb used in errors and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmAction::Delete => "delete",
            ConfirmAction::Export { .. } => "export",
        }
    }
}

/// What the user is asked to confirm
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    /// The pending action
    #[serde(flatten)]
    pub action: ConfirmAction,
    /// Module the action applies to
    pub module: String,
    /// Prompt shown to the user
    pub prompt: String,
}

impl ConfirmationRequest {
    /// Prompt for deleting a module's data
    pub fn delete(module: &str) -> Self {
        Self {
            action: ConfirmAction::Delete,
            module: module.to_string(),
            prompt: format!("Delete all {} data for this QBO company?", module),
        }
    }

    /// Prompt for exporting a module
    pub fn export(region: Region, module: &str, format: ExportFormat) -> Self {
        let label = format.label();
        Self {
            action: ConfirmAction::Export { format },
            module: module.to_string(),
            prompt: format!(
                "Export {}:- {}_{} {} Sheet?",
                label,
                region.code(),
                module,
                label
            ),
        }
    }
}

/// Caller-supplied policy deciding whether a gated action may proceed
#[async_trait]
pub trait Confirmation: Send + Sync {
    /// Return true to let the action proceed
    async fn confirm(&self, request: &ConfirmationRequest) -> bool;
}

/// Confirms everything (the caller already asked)
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoConfirm;

#[async_trait]
impl Confirmation for AutoConfirm {
    async fn confirm(&self, _request: &ConfirmationRequest) -> bool {
        true
    }
}

/// Declines everything
#[derive(Clone, Copy, Debug, Default)]
pub struct Decline;

#[async_trait]
impl Confirmation for Decline {
    async fn confirm(&self, _request: &ConfirmationRequest) -> bool {
        false
    }
}
