//! Purge Module
//!
//! Resets the default collections between runs.
//!
//! ## Policy
//! - Datasets, request queues: the `default` collection is dropped entirely
//! - Key-value stores: the `default` store is kept and emptied, except for
//!   the `INPUT` record, which carries the run's input
//! - Named collections are never touched
//!
//! Purge is best-effort: failures are logged and counted, never returned.

use tracing::{info, warn};

use crate::error::Result;
use crate::key_value::{KeyValueStoreClient, INPUT_KEY};
use crate::memory_storage::MemoryStorage;
use crate::storage::{StorageKind, DEFAULT_COLLECTION_NAME};

/// What a purge run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub dataset_dropped: bool,
    pub request_queue_dropped: bool,
    /// Records removed from the default key-value store
    pub records_removed: usize,
    /// Steps that failed and were skipped
    pub failures: usize,
}

/// Purge the default collections of `storage`
pub fn purge(storage: &MemoryStorage) -> PurgeReport {
    let mut report = PurgeReport::default();

    if let Some(dropped) = best_effort(
        &mut report,
        StorageKind::Dataset,
        storage.datasets().drop_by_name(DEFAULT_COLLECTION_NAME),
    ) {
        report.dataset_dropped = dropped;
    }

    if let Some(dropped) = best_effort(
        &mut report,
        StorageKind::RequestQueue,
        storage.request_queues().drop_by_name(DEFAULT_COLLECTION_NAME),
    ) {
        report.request_queue_dropped = dropped;
    }

    if let Some(removed) = best_effort(
        &mut report,
        StorageKind::KeyValueStore,
        clear_default_store(storage),
    ) {
        report.records_removed = removed;
    }

    info!(
        dataset_dropped = report.dataset_dropped,
        request_queue_dropped = report.request_queue_dropped,
        records_removed = report.records_removed,
        failures = report.failures,
        "Purged default storages"
    );
    report
}

/// Empty the default key-value store except for INPUT
fn clear_default_store(storage: &MemoryStorage) -> Result<usize> {
    let stores = storage.key_value_stores();
    let id = match stores.get_by_name(DEFAULT_COLLECTION_NAME) {
        Ok(metadata) => metadata.id,
        Err(e) if e.is_not_found() => return Ok(0),
        Err(e) => return Err(e),
    };

    KeyValueStoreClient::new(stores, id).clear_except(&[INPUT_KEY])
}

fn best_effort<T>(report: &mut PurgeReport, kind: StorageKind, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) if e.is_not_found() => None,
        Err(e) => {
            warn!(kind = %kind, error = %e, "Purge step failed, continuing");
            report.failures += 1;
            None
        }
    }
}
