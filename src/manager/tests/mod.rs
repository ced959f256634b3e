use super::test_helpers::*;
use super::*;
use crate::error::{Error, RemoteFailureKind, RemoteOperation};
use crate::export::{AutoConfirm, Decline};
use crate::registry::{ModuleDescriptor, ModuleRegistry, Selection};
use crate::status_store::StatusStore;
use crate::types::{Event, ExportFormat, FileId, SyncStatus};
use std::sync::Arc;


fn file() -> FileId {
    FileId::from("f1")
}

fn selection(keys: &[&str]) -> Selection {
    keys.iter().copied().collect()
}

/// Drain every event currently buffered for a subscriber
fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
