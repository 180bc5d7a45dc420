//! Tests for datasets
//!
//! These tests verify:
//! - Items are appended in order, one zero-padded file per item
//! - Paging by offset/limit, ascending and descending
//! - Reload from disk orders items numerically
//! - Byte-identical round trip of item files

use std::fs;
use std::path::Path;

use memstore::dataset::{DatasetClient, ListOptions};
use memstore::{MemoryStorage, StorageConfig};
use serde_json::{json, Value};
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

fn setup_dataset(name: &str) -> (TempDir, MemoryStorage, DatasetClient) {
    let temp_dir = TempDir::new().unwrap();
    let storage = open_storage(temp_dir.path());
    let meta = storage.datasets().get_or_create(Some(name), None).unwrap();
    let client = storage.dataset(&meta.id);
    (temp_dir, storage, client)
}

fn numbered(n: usize) -> Vec<Value> {
    (0..n).map(|i| json!({ "i": i })).collect()
}

// =============================================================================
// Push Tests
// =============================================================================

#[test]
fn test_push_and_list_in_order() {
    let (_temp, _storage, client) = setup_dataset("ordered");

    client.push_items(numbered(3)).unwrap();
    client.push_items([json!({"i": 3})]).unwrap();

    let page = client.list_items(ListOptions::default()).unwrap();
    assert_eq!(page.items, numbered(4));
    assert_eq!(page.total, 4);
    assert_eq!(page.count, 4);
    assert_eq!(client.metadata().unwrap().counters.item_count, 4);
}

#[test]
fn test_push_writes_one_padded_file_per_item() {
    let (_temp, storage, client) = setup_dataset("files");

    client.push_items(numbered(2)).unwrap();

    let dir = storage.datasets_dir().join("files");
    assert!(dir.join("000000001.json").is_file());
    assert!(dir.join("000000002.json").is_file());
    assert!(!dir.join("000000003.json").exists());
}

#[test]
fn test_push_value_flattens_arrays() {
    let (_temp, _storage, client) = setup_dataset("flatten");

    client.push_value(json!([1, 2])).unwrap();
    client.push_value(json!({"single": true})).unwrap();

    let page = client.list_items(ListOptions::default()).unwrap();
    assert_eq!(page.items, vec![json!(1), json!(2), json!({"single": true})]);
}

#[test]
fn test_get_item() {
    let (_temp, _storage, client) = setup_dataset("lookup");
    client.push_items(numbered(2)).unwrap();

    assert_eq!(client.get_item(1).unwrap(), Some(json!({"i": 1})));
    assert_eq!(client.get_item(2).unwrap(), None);
}

// =============================================================================
// Paging Tests
// =============================================================================

#[test]
fn test_list_with_offset_and_limit() {
    let (_temp, _storage, client) = setup_dataset("paged");
    client.push_items(numbered(10)).unwrap();

    let page = client
        .list_items(ListOptions {
            offset: 3,
            limit: Some(4),
            desc: false,
        })
        .unwrap();

    assert_eq!(page.items, numbered(7)[3..].to_vec());
    assert_eq!(page.count, 4);
    assert_eq!(page.total, 10);
    assert_eq!(page.offset, 3);
    assert_eq!(page.limit, Some(4));
}

#[test]
fn test_list_descending() {
    let (_temp, _storage, client) = setup_dataset("desc");
    client.push_items(numbered(5)).unwrap();

    let page = client
        .list_items(ListOptions {
            offset: 1,
            limit: Some(2),
            desc: true,
        })
        .unwrap();

    assert_eq!(page.items, vec![json!({"i": 3}), json!({"i": 2})]);
}

#[test]
fn test_list_offset_past_end_is_empty() {
    let (_temp, _storage, client) = setup_dataset("short");
    client.push_items(numbered(2)).unwrap();

    let page = client
        .list_items(ListOptions {
            offset: 5,
            ..Default::default()
        })
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total, 2);
}

// =============================================================================
// Reload Tests
// =============================================================================

#[test]
fn test_reload_orders_files_numerically() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("datasets").join("handmade");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("10.json"), b"\"ten\"").unwrap();
    fs::write(dir.join("2.json"), b"\"two\"").unwrap();
    fs::write(dir.join("1.json"), b"\"one\"").unwrap();

    let storage = open_storage(temp_dir.path());
    let meta = storage.datasets().get_by_name("handmade").unwrap();
    let page = storage.dataset(&meta.id).list_items(ListOptions::default()).unwrap();

    assert_eq!(page.items, vec![json!("one"), json!("two"), json!("ten")]);
}

#[test]
fn test_reload_then_push_continues_numbering() {
    let temp_dir = TempDir::new().unwrap();
    {
        let storage = open_storage(temp_dir.path());
        let meta = storage.datasets().get_or_create(Some("resumed"), None).unwrap();
        storage.dataset(&meta.id).push_items(numbered(2)).unwrap();
    }

    let storage = open_storage(temp_dir.path());
    let meta = storage.datasets().get_or_create(Some("resumed"), None).unwrap();
    storage.dataset(&meta.id).push_items([json!({"i": 2})]).unwrap();

    assert!(storage.datasets_dir().join("resumed").join("000000003.json").is_file());
    let page = storage.dataset(&meta.id).list_items(ListOptions::default()).unwrap();
    assert_eq!(page.items, numbered(3));
}

#[test]
fn test_item_file_round_trip() {
    let (_temp, storage, client) = setup_dataset("roundtrip");
    let item = json!({"title": "Ünïcode", "tags": ["a", "b"], "n": 1.5});

    client.push_items([item.clone()]).unwrap();

    let raw = fs::read(storage.datasets_dir().join("roundtrip").join("000000001.json")).unwrap();
    let decoded: Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(decoded, item);
    assert_eq!(client.get_item(0).unwrap(), Some(item));
}

#[test]
fn test_delete_dataset() {
    let (_temp, storage, client) = setup_dataset("gone");
    client.push_items(numbered(1)).unwrap();

    assert!(client.delete().unwrap());

    assert!(!storage.datasets_dir().join("gone").exists());
    assert!(client.list_items(ListOptions::default()).unwrap_err().is_not_found());
}
