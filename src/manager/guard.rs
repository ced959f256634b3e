//! Per-file single-flight guard
//!
//! At most one sync batch runs per file. Acquiring a guard for a file that
//! already has one fails with [`Error::SyncInProgress`]; the slot is released
//! when the guard drops, including when the batch future is abandoned.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::types::FileId;

/// Set of files with a batch in flight
#[derive(Clone, Default)]
pub(crate) struct InFlight {
    files: Arc<Mutex<HashSet<FileId>>>,
}

impl InFlight {
    // The set is only touched for insert/remove, so a poisoned lock still holds a usable set
    fn lock(&self) -> MutexGuard<'_, HashSet<FileId>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim the file, failing fast if it is already claimed
    pub(crate) fn acquire(&self, file_id: &FileId) -> Result<FlightGuard> {
        if !self.lock().insert(file_id.clone()) {
            return Err(Error::SyncInProgress {
                file_id: file_id.to_string(),
            });
        }

        Ok(FlightGuard {
            files: self.files.clone(),
            file_id: file_id.clone(),
        })
    }

    /// Whether a batch currently holds the file
    pub(crate) fn is_running(&self, file_id: &FileId) -> bool {
        self.lock().contains(file_id)
    }
}

/// Releases the file on drop
pub(crate) struct FlightGuard {
    files: Arc<Mutex<HashSet<FileId>>>,
    file_id: FileId,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.file_id);
    }
}
