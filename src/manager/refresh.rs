//! Post-action refresh
//!
//! After a batch, a delete or an export, sync dates and record counts are
//! re-pulled from the service. A failed refresh is reported on its own and
//! never reverts the action that triggered it.

use super::SyncManager;
use crate::error::{DatabaseError, Error, RefreshFailure, RemoteOperation, Result};
use crate::types::{
    CompanyId, Credential, Event, FileId, RefreshOutcome, RefreshSnapshot, SyncDateRecord,
};

impl SyncManager {
    /// Re-pull sync dates for a file and record counts for its company
    ///
    /// The fresh dates replace the cached ones for the file and the summary
    /// replaces the cached one for the company. A failure of either call
    /// returns [`Error::Refresh`](crate::Error::Refresh).
    pub async fn refresh_after(
        &self,
        credential: &Credential,
        file_id: &FileId,
        company_id: &CompanyId,
    ) -> Result<RefreshSnapshot> {
        Ok(self.refresh(credential, file_id, company_id).await?)
    }

    /// [`refresh_after`](Self::refresh_after) for the company linked to a file
    ///
    /// Fails with [`Error::NotConnected`](crate::Error::NotConnected) when the
    /// file has no company.
    pub async fn refresh_file(
        &self,
        credential: &Credential,
        file_id: &FileId,
    ) -> Result<RefreshSnapshot> {
        let context = self.file_context(credential, file_id).await?;
        let company_id = context.company_id.ok_or_else(|| crate::Error::NotConnected {
            file_id: file_id.to_string(),
        })?;
        self.refresh_after(credential, file_id, &company_id).await
    }

    /// Refresh and fold the result into an outcome for reports
    pub(crate) async fn refresh_outcome(
        &self,
        credential: &Credential,
        file_id: &FileId,
        company_id: &CompanyId,
    ) -> RefreshOutcome {
        match self.refresh(credential, file_id, company_id).await {
            Ok(snapshot) => RefreshOutcome::Refreshed(snapshot),
            Err(failure) => RefreshOutcome::Failed(failure),
        }
    }

    /// Report a refresh that could not even start
    pub(crate) fn refresh_skipped(&self, file_id: &FileId, failure: RefreshFailure) -> RefreshOutcome {
        self.report_refresh_failure(file_id, &failure);
        RefreshOutcome::Failed(failure)
    }

    async fn refresh(
        &self,
        credential: &Credential,
        file_id: &FileId,
        company_id: &CompanyId,
    ) -> std::result::Result<RefreshSnapshot, RefreshFailure> {
        let sync_dates = match self.gateway.fetch_sync_dates(credential, file_id).await {
            Ok(dates) => dates,
            Err(e) => {
                let failure = RefreshFailure::from(e);
                self.report_refresh_failure(file_id, &failure);
                return Err(failure);
            }
        };
        self.remember_sync_dates(file_id, &sync_dates).await;
        self.emit_event(Event::SyncDatesRefreshed {
            file_id: file_id.clone(),
        });

        let summary = match self.gateway.fetch_summary(credential, company_id).await {
            Ok(summary) => summary,
            Err(e) => {
                let failure = RefreshFailure::from(e);
                self.report_refresh_failure(file_id, &failure);
                return Err(failure);
            }
        };
        self.cache
            .summaries
            .write()
            .await
            .insert(company_id.clone(), summary.clone());
        self.emit_event(Event::SummaryRefreshed {
            company_id: company_id.clone(),
        });

        tracing::debug!(
            file_id = %file_id,
            company_id = %company_id,
            modules = summary.0.len(),
            "refreshed sync dates and summary"
        );

        Ok(RefreshSnapshot {
            sync_dates,
            summary,
        })
    }

    /// Locally cached sync dates for a file
    ///
    /// The service owns these dates, so an undecodable cached record reads as
    /// empty (with a warning) and is replaced by the next fetch.
    pub(crate) async fn cached_sync_dates(
        &self,
        file_id: &FileId,
    ) -> Result<SyncDateRecord> {
        match self.store.sync_dates(file_id).await {
            Err(Error::Database(DatabaseError::CorruptState { key, reason })) => {
                tracing::warn!(
                    file_id = %file_id,
                    key = %key,
                    reason = %reason,
                    "ignoring corrupt cached sync dates"
                );
                Ok(SyncDateRecord::default())
            }
            other => other,
        }
    }

    /// Persist freshly fetched dates and mirror them into the cached file context
    ///
    /// The dates are already in hand, so a persistence failure is logged and
    /// does not fail the caller.
    pub(crate) async fn remember_sync_dates(
        &self,
        file_id: &FileId,
        sync_dates: &SyncDateRecord,
    ) {
        if let Err(e) = self.store.replace_sync_dates(file_id, sync_dates).await {
            tracing::error!(file_id = %file_id, error = %e, "failed to persist sync dates");
        }
        if let Some(context) = self.cache.files.write().await.get_mut(file_id) {
            context.sync_dates = sync_dates.clone();
        }
    }

    fn report_refresh_failure(&self, file_id: &FileId, failure: &RefreshFailure) {
        tracing::warn!(
            file_id = %file_id,
            operation = %failure.operation,
            error = %failure.message,
            "post-action refresh failed"
        );
        self.emit_event(Event::RefreshFailed {
            file_id: file_id.clone(),
            operation: failure.operation,
            error: failure.message.clone(),
        });
    }
}

/// Refresh failure for a file whose company link could not be resolved
pub(crate) fn unresolved_company(file_id: &FileId, reason: impl std::fmt::Display) -> RefreshFailure {
    RefreshFailure {
        operation: RemoteOperation::FetchFile,
        message: format!("cannot resolve company for file {}: {}", file_id, reason),
    }
}
