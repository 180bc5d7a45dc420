//! Tests for request queues
//!
//! These tests verify:
//! - Deduplication by unique key and deterministic request ids
//! - Queue head ordering (forefront first, then FIFO)
//! - Handling, updating and deleting requests
//! - Counters in metadata
//! - Reload from disk

use std::path::{Path, PathBuf};

use memstore::request_queue::{request_id, NewRequest, RequestQueueClient};
use memstore::{MemoryStorage, StorageConfig};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn open_storage(root: &Path) -> MemoryStorage {
    let config = StorageConfig::builder()
        .root_dir(root)
        .persist_storage(true)
        .write_metadata(true)
        .purge_on_start(false)
        .build();
    MemoryStorage::open(config).unwrap()
}

fn setup_queue(name: &str) -> (TempDir, RequestQueueClient, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let storage = open_storage(temp_dir.path());
    let meta = storage.request_queues().get_or_create(Some(name), None).unwrap();
    let dir = storage.request_queues_dir().join(name);
    (temp_dir, storage.request_queue(&meta.id), dir)
}

fn head_urls(client: &RequestQueueClient) -> Vec<String> {
    client
        .list_head(100)
        .unwrap()
        .into_iter()
        .map(|r| r.url)
        .collect()
}

// =============================================================================
// Add Tests
// =============================================================================

#[test]
fn test_add_request_writes_file_named_by_id() {
    let (_temp, client, dir) = setup_queue("files");

    let outcome = client
        .add_request(NewRequest::new("https://example.com/a"), false)
        .unwrap();

    assert_eq!(outcome.request_id, request_id("https://example.com/a"));
    assert!(!outcome.was_already_present);
    assert!(dir.join(format!("{}.json", outcome.request_id)).is_file());

    let stored = client.get_request(&outcome.request_id).unwrap().unwrap();
    assert_eq!(stored.unique_key, "https://example.com/a");
    assert_eq!(stored.method, "GET");
    assert!(stored.order_no.is_some());
}

#[test]
fn test_add_request_deduplicates_by_unique_key() {
    let (_temp, client, _dir) = setup_queue("dedup");

    let first = client
        .add_request(NewRequest::new("https://example.com/1").unique_key("same"), false)
        .unwrap();
    let second = client
        .add_request(
            NewRequest::new("https://example.com/2")
                .unique_key("same")
                .payload(json!({"ignored": true})),
            false,
        )
        .unwrap();

    assert_eq!(first.request_id, second.request_id);
    assert!(second.was_already_present);
    assert!(!second.was_already_handled);

    let stored = client.get_request(&first.request_id).unwrap().unwrap();
    assert_eq!(stored.url, "https://example.com/1");
    assert_eq!(stored.payload, None);
    assert_eq!(client.metadata().unwrap().counters.total_request_count, 1);
}

#[test]
fn test_empty_url_rejected() {
    let (_temp, client, _dir) = setup_queue("invalid");

    assert!(client.add_request(NewRequest::new(""), false).is_err());
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_head_orders_forefront_first_then_fifo() {
    let (_temp, client, _dir) = setup_queue("ordering");

    client.add_request(NewRequest::new("a"), false).unwrap();
    client.add_request(NewRequest::new("b"), false).unwrap();
    client.add_request(NewRequest::new("c"), true).unwrap();
    client.add_request(NewRequest::new("d"), true).unwrap();

    assert_eq!(head_urls(&client), vec!["d", "c", "a", "b"]);
    assert_eq!(client.list_head(2).unwrap().len(), 2);
}

// =============================================================================
// Handling Tests
// =============================================================================

#[test]
fn test_mark_handled_leaves_head_and_updates_counters() {
    let (_temp, client, _dir) = setup_queue("handled");
    let a = client.add_request(NewRequest::new("a"), false).unwrap();
    client.add_request(NewRequest::new("b"), false).unwrap();

    let outcome = client.mark_handled(&a.request_id).unwrap();

    assert!(outcome.was_already_present);
    assert!(!outcome.was_already_handled);
    assert_eq!(head_urls(&client), vec!["b"]);

    let stored = client.get_request(&a.request_id).unwrap().unwrap();
    assert!(stored.is_handled());
    assert_eq!(stored.order_no, None);

    let counters = client.metadata().unwrap().counters;
    assert_eq!(counters.total_request_count, 2);
    assert_eq!(counters.handled_request_count, 1);
    assert_eq!(counters.pending_request_count, 1);

    let again = client.add_request(NewRequest::new("a"), false).unwrap();
    assert!(again.was_already_present);
    assert!(again.was_already_handled);
}

#[test]
fn test_update_pending_request_keeps_position() {
    let (_temp, client, _dir) = setup_queue("update");
    let a = client.add_request(NewRequest::new("a"), false).unwrap();
    client.add_request(NewRequest::new("b"), false).unwrap();

    let mut request = client.get_request(&a.request_id).unwrap().unwrap();
    request.payload = Some(json!({"retry": 1}));
    client.update_request(request, false).unwrap();

    assert_eq!(head_urls(&client), vec!["a", "b"]);
    let stored = client.get_request(&a.request_id).unwrap().unwrap();
    assert_eq!(stored.payload, Some(json!({"retry": 1})));
}

#[test]
fn test_update_handled_request_requeues_it() {
    let (_temp, client, _dir) = setup_queue("requeue");
    let a = client.add_request(NewRequest::new("a"), false).unwrap();
    client.add_request(NewRequest::new("b"), false).unwrap();
    client.mark_handled(&a.request_id).unwrap();

    let mut request = client.get_request(&a.request_id).unwrap().unwrap();
    request.handled_at = None;
    let outcome = client.update_request(request, true).unwrap();

    assert!(outcome.was_already_handled);
    assert_eq!(head_urls(&client), vec!["a", "b"]);
}

#[test]
fn test_update_unknown_request_is_not_found() {
    let (_temp, client, _dir) = setup_queue("unknown");
    let a = client.add_request(NewRequest::new("a"), false).unwrap();
    let mut request = client.get_request(&a.request_id).unwrap().unwrap();
    request.id = "does-not-exist".to_string();

    assert!(client.update_request(request, false).unwrap_err().is_not_found());
}

#[test]
fn test_delete_request_removes_file() {
    let (_temp, client, dir) = setup_queue("delete");
    let a = client.add_request(NewRequest::new("a"), false).unwrap();
    let path = dir.join(format!("{}.json", a.request_id));
    assert!(path.is_file());

    client.delete_request(&a.request_id).unwrap();
    client.delete_request(&a.request_id).unwrap();

    assert!(!path.exists());
    assert!(client.get_request(&a.request_id).unwrap().is_none());
}

// =============================================================================
// Reload Tests
// =============================================================================

#[test]
fn test_reload_preserves_order_and_continues_numbering() {
    let temp_dir = TempDir::new().unwrap();
    {
        let storage = open_storage(temp_dir.path());
        let meta = storage.request_queues().get_or_create(Some("resume"), None).unwrap();
        let client = storage.request_queue(&meta.id);
        client.add_request(NewRequest::new("first"), false).unwrap();
        client.add_request(NewRequest::new("second"), false).unwrap();
        client.add_request(NewRequest::new("urgent"), true).unwrap();
        let done = client.add_request(NewRequest::new("done"), false).unwrap();
        client.mark_handled(&done.request_id).unwrap();
    }

    let storage = open_storage(temp_dir.path());
    let meta = storage.request_queues().get_by_name("resume").unwrap();
    let client = storage.request_queue(&meta.id);
    client.add_request(NewRequest::new("third"), false).unwrap();

    assert_eq!(head_urls(&client), vec!["urgent", "first", "second", "third"]);
    assert_eq!(meta.counters.handled_request_count, 1);
    assert_eq!(meta.counters.pending_request_count, 3);
}
