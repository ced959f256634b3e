//! Confirmed delete and export of module data
//!
//! Both actions need a connected company and a module with records. The
//! caller's [`Confirmation`] is asked before the remote call is issued; a
//! declined request makes no remote call at all. A failed remote call leaves
//! every cache untouched. A successful one is followed by a refresh whose
//! failure is reported next to the result.

use super::SyncManager;
use crate::error::{Error, RemoteFailure, Result};
use crate::export::{Confirmation, ConfirmationRequest, ExportArtifact, ExportMaterializer, SaveOutcome};
use crate::types::{
    CompanyId, Credential, DeleteReport, Event, ExportFormat, FileContext, FileId, RefreshOutcome,
    Region,
};

/// Result of a confirmed export
#[derive(Clone, Debug)]
pub struct ExportReport {
    /// The file exported from
    pub file_id: FileId,
    /// The exported module
    pub module: String,
    /// Named payload, bytes as received
    pub artifact: ExportArtifact,
    /// Where the artifact was written, for exports saved to disk
    pub saved: Option<SaveOutcome>,
    /// Post-export refresh result
    pub refresh: RefreshOutcome,
}

impl SyncManager {
    /// Delete every remote record of one module for the file's company
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownModule`] for a key outside the registry
    /// - [`Error::NotConnected`] when the file has no company link
    /// - [`Error::EmptyModule`] when the last known count is zero
    /// - [`Error::NotConfirmed`] when the confirmation is declined
    /// - [`Error::Remote`] when the service rejects the deletion
    pub async fn delete_module(
        &self,
        credential: &Credential,
        file_id: &FileId,
        module: &str,
        confirmation: &dyn Confirmation,
    ) -> Result<DeleteReport> {
        self.registry.require(module)?;
        let context = self.file_context(credential, file_id).await?;
        let company_id = connected_company(&context)?;
        self.ensure_has_records(&company_id, module).await?;

        confirm(confirmation, &ConfirmationRequest::delete(module)).await?;

        self.gateway
            .delete_module_data(credential, &company_id, module)
            .await
            .map_err(|e| action_failed(file_id, module, e))?;

        tracing::info!(
            file_id = %file_id,
            company_id = %company_id,
            module = %module,
            "module data deleted"
        );
        self.emit_event(Event::ModuleDeleted {
            file_id: file_id.clone(),
            company_id: company_id.clone(),
            module: module.to_string(),
        });

        let refresh = self.refresh_outcome(credential, file_id, &company_id).await;

        Ok(DeleteReport {
            file_id: file_id.clone(),
            company_id,
            module: module.to_string(),
            refresh,
        })
    }

    /// Export one module as a spreadsheet
    ///
    /// The artifact is named `{company}_{region}_{module}.{xlsx|csv}` and
    /// returned to the caller. Fails like [`delete_module`](Self::delete_module),
    /// plus [`Error::Validation`] when the file has no destination region.
    pub async fn export_module(
        &self,
        credential: &Credential,
        file_id: &FileId,
        module: &str,
        format: ExportFormat,
        confirmation: &dyn Confirmation,
    ) -> Result<ExportReport> {
        self.export_with(credential, file_id, module, format, confirmation, None)
            .await
    }

    /// Export one module and write it to the configured export directory
    pub async fn export_module_to_disk(
        &self,
        credential: &Credential,
        file_id: &FileId,
        module: &str,
        format: ExportFormat,
        confirmation: &dyn Confirmation,
    ) -> Result<ExportReport> {
        let materializer = ExportMaterializer::from_config(&self.config.export);
        self.export_with(
            credential,
            file_id,
            module,
            format,
            confirmation,
            Some(&materializer),
        )
        .await
    }

    async fn export_with(
        &self,
        credential: &Credential,
        file_id: &FileId,
        module: &str,
        format: ExportFormat,
        confirmation: &dyn Confirmation,
        materializer: Option<&ExportMaterializer>,
    ) -> Result<ExportReport> {
        self.registry.require(module)?;
        let context = self.file_context(credential, file_id).await?;
        let company_id = connected_company(&context)?;
        let region = destination_region(&context)?;
        self.ensure_has_records(&company_id, module).await?;

        confirm(
            confirmation,
            &ConfirmationRequest::export(region, module, format),
        )
        .await?;

        let data = self
            .gateway
            .export_module_data(credential, file_id, region, module, format)
            .await
            .map_err(|e| action_failed(file_id, module, e))?;

        let artifact =
            ExportArtifact::materialize(data, &context.company_name, region, module, format);
        let saved = match materializer {
            Some(materializer) => Some(materializer.save(&artifact).await?),
            None => None,
        };

        tracing::info!(
            file_id = %file_id,
            module = %module,
            artifact = %artifact.file_name,
            bytes = artifact.len(),
            "module exported"
        );
        self.emit_event(Event::ModuleExported {
            file_id: file_id.clone(),
            module: module.to_string(),
            file_name: artifact.file_name.clone(),
        });

        let refresh = self.refresh_outcome(credential, file_id, &company_id).await;

        Ok(ExportReport {
            file_id: file_id.clone(),
            module: module.to_string(),
            artifact,
            saved,
            refresh,
        })
    }

    /// Refuse actions on a module the last summary reported as empty
    ///
    /// Without a cached summary the count is unknown and the action proceeds.
    async fn ensure_has_records(&self, company_id: &CompanyId, module: &str) -> Result<()> {
        let summaries = self.cache.summaries.read().await;
        match summaries.get(company_id) {
            Some(summary) if summary.count(module) == 0 => Err(Error::EmptyModule {
                module: module.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

async fn confirm(confirmation: &dyn Confirmation, request: &ConfirmationRequest) -> Result<()> {
    if confirmation.confirm(request).await {
        return Ok(());
    }

    tracing::debug!(
        action = request.action.as_str(),
        module = %request.module,
        "action declined"
    );
    Err(Error::NotConfirmed {
        action: request.action.as_str().to_string(),
    })
}

fn connected_company(context: &FileContext) -> Result<CompanyId> {
    context.company_id.clone().ok_or_else(|| Error::NotConnected {
        file_id: context.file_id.to_string(),
    })
}

fn destination_region(context: &FileContext) -> Result<Region> {
    context.region.ok_or_else(|| Error::Validation {
        message: format!("file {} has no destination region", context.file_id),
    })
}

fn action_failed(file_id: &FileId, module: &str, failure: RemoteFailure) -> Error {
    let failure = if failure.module.is_some() {
        failure
    } else {
        failure.for_module(module)
    };
    tracing::warn!(
        file_id = %file_id,
        module = %module,
        operation = %failure.operation,
        error = %failure,
        "module action failed"
    );
    Error::Remote(failure)
}
