//! Key-Value Store Module
//!
//! Keyed records with arbitrary bodies and a content type.
//!
//! ## Responsibilities
//! - Store one file per key, named `{key}.{extension}` (or `{key}` when the
//!   content type has no known extension)
//! - Encode JSON values as text, store everything else as raw bytes
//! - Keep exactly one physical file per key across content type changes
//! - Keep keys in insertion order for listing
//!
//! ## Record Metadata
//! With metadata writing enabled, `{key}.__metadata__.json` holds the exact
//! content type so it survives a reload even when the extension is ambiguous.

mod client;
pub mod content_type;

use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::storage::{fs, CollectionKind, CollectionMetadata, StorageKind};

pub use client::KeyValueStoreClient;

/// Metadata of a key-value store
pub type KeyValueStoreMetadata = CollectionMetadata<KeyValueStoreCounters>;

/// Key of the record that survives purge of the default store
pub const INPUT_KEY: &str = "INPUT";

const RECORD_METADATA_SUFFIX: &str = ".__metadata__.json";
const MAX_KEY_LEN: usize = 256;

/// Marker type plugging key-value stores into the collection manager
pub struct KeyValueStoreKind;

/// Key-value stores report no counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyValueStoreCounters {}

/// Records of one store
#[derive(Debug, Default)]
pub struct KeyValueRecords {
    entries: HashMap<String, StoredRecord>,
    /// Keys in insertion order
    order: Vec<String>,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    value: Bytes,
    content_type: String,
    /// File currently holding the body, so a content type change can remove it
    file_name: String,
}

/// Contents of `{key}.__metadata__.json`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordMetadata {
    key: String,
    content_type: String,
}

/// A record as returned to callers
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueRecord {
    pub key: String,
    pub value: Bytes,
    pub content_type: String,
}

impl KeyValueRecord {
    /// Decode the body as JSON
    pub fn as_json(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.value)?)
    }

    /// Borrow the body as UTF-8 text
    pub fn as_text(&self) -> Result<&str> {
        std::str::from_utf8(&self.value)
            .map_err(|e| StoreError::Serialization(format!("record '{}' is not UTF-8: {}", self.key, e)))
    }
}

/// Entry of `list_keys`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub key: String,
    pub size: usize,
}

/// Value accepted by `set_record`
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Json(Value),
    Text(String),
    Bytes(Bytes),
}

impl RecordValue {
    /// Content type used when the caller gives none
    pub fn default_content_type(&self) -> &'static str {
        match self {
            RecordValue::Json(_) => content_type::JSON,
            RecordValue::Text(_) => content_type::TEXT,
            RecordValue::Bytes(_) => content_type::OCTET_STREAM,
        }
    }

    /// Serialize for storage under `content_type`
    ///
    /// JSON values become pretty-printed JSON text; under a non-JSON content
    /// type a JSON string is stored as its raw text.
    pub fn encode(self, content_type: &str) -> Result<Bytes> {
        match self {
            RecordValue::Json(Value::String(s)) if !content_type::is_json(content_type) => {
                Ok(Bytes::from(s))
            }
            RecordValue::Json(value) => Ok(Bytes::from(serde_json::to_vec_pretty(&value)?)),
            RecordValue::Text(text) => Ok(Bytes::from(text)),
            RecordValue::Bytes(bytes) => Ok(bytes),
        }
    }
}

impl From<Value> for RecordValue {
    fn from(value: Value) -> Self {
        RecordValue::Json(value)
    }
}

impl From<String> for RecordValue {
    fn from(text: String) -> Self {
        RecordValue::Text(text)
    }
}

impl From<&str> for RecordValue {
    fn from(text: &str) -> Self {
        RecordValue::Text(text.to_string())
    }
}

impl From<Vec<u8>> for RecordValue {
    fn from(bytes: Vec<u8>) -> Self {
        RecordValue::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for RecordValue {
    fn from(bytes: Bytes) -> Self {
        RecordValue::Bytes(bytes)
    }
}

impl CollectionKind for KeyValueStoreKind {
    const KIND: StorageKind = StorageKind::KeyValueStore;
    type Records = KeyValueRecords;
    type Counters = KeyValueStoreCounters;

    fn counters(_records: &KeyValueRecords) -> KeyValueStoreCounters {
        KeyValueStoreCounters {}
    }

    /// Files are visited in name order; the filesystem keeps no insertion order
    ///
    /// Record metadata files are read first and claim the body file their
    /// key and content type map to. Only unclaimed files fall back to
    /// guessing the key from a known extension.
    fn load_records(dir: &Path) -> Result<KeyValueRecords> {
        let mut files = fs::record_files(dir)?;
        files.sort();

        let mut claimed: HashMap<String, RecordMetadata> = HashMap::new();
        for path in &files {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !file_name.ends_with(RECORD_METADATA_SUFFIX) {
                continue;
            }
            match fs::read_json::<RecordMetadata>(path) {
                Ok(meta) if validate_key(&meta.key).is_ok() => {
                    claimed.insert(record_file_name(&meta.key, &meta.content_type), meta);
                }
                Ok(meta) => debug!(file = file_name, key = %meta.key, "Record metadata names an invalid key"),
                Err(e) => warn!(file = ?path, error = %e, "Ignoring unreadable record metadata"),
            }
        }

        let mut records = KeyValueRecords::default();
        for path in files {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if file_name.ends_with(RECORD_METADATA_SUFFIX) {
                continue;
            }

            let (key, content_type) = match claimed.remove(file_name) {
                Some(meta) => (meta.key, meta.content_type),
                None => split_file_name(file_name),
            };
            if records.get(&key).is_some() {
                warn!(file = file_name, key = %key, "Skipping second file for the same key");
                continue;
            }

            let value = Bytes::from(std::fs::read(&path)?);
            records.insert(
                key,
                StoredRecord {
                    value,
                    content_type,
                    file_name: file_name.to_string(),
                },
            );
        }
        Ok(records)
    }
}

impl KeyValueRecords {
    fn get(&self, key: &str) -> Option<&StoredRecord> {
        self.entries.get(key)
    }

    /// Insert or overwrite; an overwritten key keeps its position
    fn insert(&mut self, key: String, record: StoredRecord) -> Option<StoredRecord> {
        let previous = self.entries.insert(key.clone(), record);
        if previous.is_none() {
            self.order.push(key);
        }
        previous
    }

    fn remove(&mut self, key: &str) -> Option<StoredRecord> {
        let removed = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    fn keys(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    /// Key other than `key` whose body lives in `file_name`
    fn file_owner(&self, file_name: &str, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, r)| r.file_name == file_name && k.as_str() != key)
            .map(|(k, _)| k.as_str())
    }
}

/// Reject keys that are not safe file names
///
/// Allowed: ASCII letters, digits and `!-_.'()`, 1 to 256 characters.
pub fn validate_key(key: &str) -> Result<()> {
    let valid_chars = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "!-_.'()".contains(c));

    if key.is_empty()
        || key.len() > MAX_KEY_LEN
        || !valid_chars
        || key == "."
        || key == ".."
        || key.contains("__metadata__")
        || key.ends_with(".tmp")
    {
        return Err(StoreError::InvalidArgument(format!(
            "invalid record key {:?}",
            key
        )));
    }
    Ok(())
}

/// `{key}.{extension}`, or the bare key when the content type has no extension
pub(crate) fn record_file_name(key: &str, content_type: &str) -> String {
    match content_type::extension_for(content_type) {
        Some(ext) => format!("{}.{}", key, ext),
        None => key.to_string(),
    }
}

pub(crate) fn record_metadata_file_name(key: &str) -> String {
    format!("{}{}", key, RECORD_METADATA_SUFFIX)
}

/// Recover key and content type from a record file name
///
/// A known extension is stripped; anything else is taken as a bare key.
fn split_file_name(file_name: &str) -> (String, String) {
    if let Some((stem, ext)) = file_name.rsplit_once('.') {
        if !stem.is_empty() {
            if let Some(content_type) = content_type::content_type_for_extension(ext) {
                return (stem.to_string(), content_type.to_string());
            }
        }
    }
    (file_name.to_string(), content_type::OCTET_STREAM.to_string())
}
