//! File metadata, company link and the per-file module table

use super::SyncManager;
use crate::error::Result;
use crate::types::{
    Credential, Event, FileContext, FileId, ModuleRow, Region, StatusRecord, SyncDateRecord,
};

impl SyncManager {
    /// Load a file and everything needed to act on it
    ///
    /// Fetches the file record, resolves the company display name (asking the
    /// company endpoint when the record lacks one), pulls the current sync
    /// dates and, for connected files, the record counts. The result is
    /// remembered for later actions on the same file.
    pub async fn open_file(&self, credential: &Credential, file_id: &FileId) -> Result<FileContext> {
        let info = self.gateway.fetch_file(credential, file_id).await?;
        let company_id = info.company_id();

        let company_name = match (&company_id, info.company_name()) {
            (None, _) => String::new(),
            (Some(_), Some(name)) => name.to_string(),
            (Some(_), None) => match self.gateway.fetch_company_name(credential, file_id).await {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(file_id = %file_id, error = %e, "company name unavailable");
                    String::new()
                }
            },
        };

        let region = info
            .destination_region
            .as_deref()
            .and_then(|code| match code.parse::<Region>() {
                Ok(region) => Some(region),
                Err(_) => {
                    tracing::debug!(file_id = %file_id, region = code, "unrecognised destination region");
                    None
                }
            });

        let sync_dates = match self.gateway.fetch_sync_dates(credential, file_id).await {
            Ok(dates) => {
                self.remember_sync_dates(file_id, &dates).await;
                dates
            }
            Err(e) => {
                tracing::warn!(file_id = %file_id, error = %e, "using cached sync dates");
                self.cached_sync_dates(file_id).await?
            }
        };

        if let Some(company_id) = &company_id {
            match self.gateway.fetch_summary(credential, company_id).await {
                Ok(summary) => {
                    self.cache
                        .summaries
                        .write()
                        .await
                        .insert(company_id.clone(), summary);
                }
                Err(e) => {
                    tracing::warn!(company_id = %company_id, error = %e, "record counts unavailable");
                }
            }
        }

        let context = FileContext {
            file_id: file_id.clone(),
            file_name: info.file_name,
            region,
            company_id,
            company_name,
            sync_dates,
        };

        tracing::info!(
            file_id = %file_id,
            connected = context.company_id.is_some(),
            "file opened"
        );

        self.cache
            .files
            .write()
            .await
            .insert(file_id.clone(), context.clone());

        Ok(context)
    }

    /// Context remembered by the last [`open_file`](Self::open_file), if any
    pub async fn cached_context(&self, file_id: &FileId) -> Option<FileContext> {
        self.cache.files.read().await.get(file_id).cloned()
    }

    /// Remembered context, or a fresh [`open_file`](Self::open_file)
    pub(crate) async fn file_context(
        &self,
        credential: &Credential,
        file_id: &FileId,
    ) -> Result<FileContext> {
        if let Some(context) = self.cached_context(file_id).await {
            return Ok(context);
        }
        self.open_file(credential, file_id).await
    }

    /// Authorization URL that links the file to a company
    pub async fn connect_url(&self, credential: &Credential, file_id: &FileId) -> Result<String> {
        Ok(self.gateway.connect_url(credential, file_id).await?)
    }

    /// Unlink the file from its company and forget the cached link
    pub async fn disconnect(&self, credential: &Credential, file_id: &FileId) -> Result<()> {
        self.gateway.disconnect(credential, file_id).await?;

        if let Some(context) = self.cache.files.write().await.remove(file_id) {
            if let Some(company_id) = context.company_id {
                self.cache.summaries.write().await.remove(&company_id);
            }
        }

        tracing::info!(file_id = %file_id, "file disconnected");
        self.emit_event(Event::Disconnected {
            file_id: file_id.clone(),
        });
        Ok(())
    }

    /// Persisted status of every module recorded for a file
    pub async fn statuses(&self, file_id: &FileId) -> Result<StatusRecord> {
        self.store.get_all(file_id).await
    }

    /// Whether a sync batch is running for a file
    pub fn is_syncing(&self, file_id: &FileId) -> bool {
        self.in_flight.is_running(file_id)
    }

    /// Module table for a file, in registry order
    ///
    /// Built from local state only: persisted statuses and sync dates, plus
    /// the last record counts fetched for the file's company. Counts are
    /// `None` until a summary has been fetched.
    pub async fn module_rows(&self, file_id: &FileId) -> Result<Vec<ModuleRow>> {
        let statuses = self.store.get_all(file_id).await?;
        let sync_dates: SyncDateRecord = self.cached_sync_dates(file_id).await?;

        let company_id = self
            .cache
            .files
            .read()
            .await
            .get(file_id)
            .and_then(|c| c.company_id.clone());
        let summary = match company_id {
            Some(company_id) => self.cache.summaries.read().await.get(&company_id).cloned(),
            None => None,
        };

        let rows = self
            .registry
            .list()
            .iter()
            .map(|module| {
                let count = summary.as_ref().map(|s| s.count(&module.key));
                ModuleRow {
                    key: module.key.clone(),
                    label: module.label.clone(),
                    status: statuses.status(&module.key),
                    last_synced: sync_dates.last_synced(&module.key),
                    count,
                    actionable: count.is_some_and(|c| c > 0),
                }
            })
            .collect();

        Ok(rows)
    }
}
