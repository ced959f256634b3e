//! Sequential per-module sync batches
//!
//! Modules are processed strictly one at a time in the caller's order. Each
//! goes `Fetching` (persisted before the remote call), then `Completed` or
//! `Error`. A failing module never stops the ones after it.

use super::SyncManager;
use super::refresh::unresolved_company;
use crate::error::Result;
use crate::registry::Selection;
use crate::retry::with_retry_counted;
use crate::types::{
    BatchReport, Credential, Event, FileId, ModuleOutcome, RefreshOutcome, SyncDateRecord,
    SyncStatus,
};

impl SyncManager {
    /// Sync the selected modules of a file
    ///
    /// An empty selection, or one naming a module the registry does not know,
    /// is rejected before any remote call. A second batch for a file whose
    /// batch is still running fails with [`Error::SyncInProgress`](crate::Error::SyncInProgress).
    ///
    /// Per-module remote failures are recorded as `Error` and reported in the
    /// returned [`BatchReport`]; they do not fail the call. Only persistence
    /// failures do: a status that cannot be written stops the batch there,
    /// leaving the current module at whatever was last persisted (usually
    /// `Fetching`) and the remaining modules untouched.
    pub async fn run_sync(
        &self,
        credential: &Credential,
        file_id: &FileId,
        selection: &Selection,
    ) -> Result<BatchReport> {
        selection.validate(&self.registry)?;
        let _guard = self.in_flight.acquire(file_id)?;

        tracing::info!(
            file_id = %file_id,
            modules = selection.len(),
            "sync batch started"
        );
        self.emit_event(Event::BatchStarted {
            file_id: file_id.clone(),
            modules: selection.keys().to_vec(),
        });

        let mut sync_dates = self.cached_sync_dates(file_id).await?;
        let mut outcomes = Vec::with_capacity(selection.len());
        for module in selection.keys() {
            let outcome = self
                .sync_module(credential, file_id, module, &mut sync_dates)
                .await?;
            outcomes.push(outcome);
        }

        let completed = outcomes
            .iter()
            .filter(|o| o.status == SyncStatus::Completed)
            .count();
        let failed = outcomes.len() - completed;

        tracing::info!(
            file_id = %file_id,
            completed,
            failed,
            "sync batch finished"
        );
        self.emit_event(Event::BatchFinished {
            file_id: file_id.clone(),
            completed,
            failed,
        });

        let refresh = self.refresh_after_batch(credential, file_id).await;
        if let Some(snapshot) = refresh.snapshot() {
            sync_dates = snapshot.sync_dates.clone();
        }

        Ok(BatchReport {
            file_id: file_id.clone(),
            outcomes,
            sync_dates,
            refresh,
        })
    }

    /// Sync every module of the registry, in registry order
    pub async fn sync_all(&self, credential: &Credential, file_id: &FileId) -> Result<BatchReport> {
        let selection = Selection::all(&self.registry);
        self.run_sync(credential, file_id, &selection).await
    }

    async fn sync_module(
        &self,
        credential: &Credential,
        file_id: &FileId,
        module: &str,
        sync_dates: &mut SyncDateRecord,
    ) -> Result<ModuleOutcome> {
        self.set_status(file_id, module, SyncStatus::Fetching).await?;

        let gateway = self.gateway.as_ref();
        let batch = [module.to_string()];
        let modules: &[String] = &batch;
        let (result, attempts) = with_retry_counted(&self.config.sync.retry, move || {
            gateway.trigger_sync(credential, file_id, modules)
        })
        .await;

        match result {
            Ok(()) => {
                self.set_status(file_id, module, SyncStatus::Completed).await?;

                match self.gateway.fetch_sync_dates(credential, file_id).await {
                    Ok(dates) => {
                        self.remember_sync_dates(file_id, &dates).await;
                        self.emit_event(Event::SyncDatesRefreshed {
                            file_id: file_id.clone(),
                        });
                        *sync_dates = dates;
                    }
                    Err(e) => {
                        tracing::warn!(
                            file_id = %file_id,
                            module = %module,
                            error = %e,
                            "sync dates not refreshed after module sync"
                        );
                    }
                }

                Ok(ModuleOutcome {
                    module: module.to_string(),
                    status: SyncStatus::Completed,
                    attempts,
                    error: None,
                })
            }
            Err(failure) => {
                let failure = if failure.module.is_some() {
                    failure
                } else {
                    failure.for_module(module)
                };

                self.set_status(file_id, module, SyncStatus::Error).await?;

                tracing::warn!(
                    file_id = %file_id,
                    module = %module,
                    attempts,
                    error = %failure,
                    "module sync failed"
                );
                self.emit_event(Event::ModuleSyncFailed {
                    file_id: file_id.clone(),
                    module: module.to_string(),
                    error: failure.to_string(),
                });

                Ok(ModuleOutcome {
                    module: module.to_string(),
                    status: SyncStatus::Error,
                    attempts,
                    error: Some(failure),
                })
            }
        }
    }

    async fn set_status(&self, file_id: &FileId, module: &str, status: SyncStatus) -> Result<()> {
        if let Err(e) = self.store.set(file_id, module, status).await {
            tracing::error!(
                file_id = %file_id,
                module = %module,
                status = %status,
                error = %e,
                "failed to persist module status"
            );
            return Err(e);
        }

        tracing::debug!(file_id = %file_id, module = %module, status = %status, "module status changed");
        self.emit_event(Event::ModuleStatusChanged {
            file_id: file_id.clone(),
            module: module.to_string(),
            status,
        });
        Ok(())
    }

    async fn refresh_after_batch(&self, credential: &Credential, file_id: &FileId) -> RefreshOutcome {
        let company_id = match self.cached_context(file_id).await {
            Some(context) => context.company_id,
            None => match self.gateway.fetch_file(credential, file_id).await {
                Ok(info) => info.company_id(),
                Err(e) => return self.refresh_skipped(file_id, unresolved_company(file_id, e)),
            },
        };

        match company_id {
            Some(company_id) => self.refresh_outcome(credential, file_id, &company_id).await,
            None => self.refresh_skipped(
                file_id,
                unresolved_company(file_id, "file is not connected to a company"),
            ),
        }
    }
}
