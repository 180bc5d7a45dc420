//! Key-value store client
//!
//! Record operations on one key-value store, addressed by id.

use std::fs as std_fs;
use std::sync::Arc;

use tracing::debug;

use crate::config::StorageConfig;
use crate::error::{Result, StoreError};
use crate::storage::{fs, Access, CollectionManager, CollectionState};

use super::{
    record_file_name, record_metadata_file_name, validate_key, KeyInfo, KeyValueRecord,
    KeyValueStoreKind, KeyValueStoreMetadata, RecordMetadata, RecordValue, StoredRecord,
};

/// Handle to one key-value store
#[derive(Clone)]
pub struct KeyValueStoreClient {
    manager: Arc<CollectionManager<KeyValueStoreKind>>,
    id: String,
}

impl KeyValueStoreClient {
    pub(crate) fn new(
        manager: Arc<CollectionManager<KeyValueStoreKind>>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current metadata
    pub fn metadata(&self) -> Result<KeyValueStoreMetadata> {
        self.manager.get_by_id(&self.id)
    }

    /// Write a record, or delete it when `value` is `None`
    ///
    /// Without an explicit `content_type` the value's variant decides it.
    /// Overwriting a key under a different extension removes the old file
    /// once the new one is written. A key whose file name is already used by
    /// another key is rejected.
    pub fn set_record(
        &self,
        key: &str,
        value: Option<RecordValue>,
        content_type: Option<&str>,
    ) -> Result<()> {
        let Some(value) = value else {
            return self.delete_record(key);
        };
        validate_key(key)?;

        let content_type = content_type
            .map(str::to_string)
            .unwrap_or_else(|| value.default_content_type().to_string());
        let body = value.encode(&content_type)?;
        let file_name = record_file_name(key, &content_type);

        self.manager.with_collection(&self.id, Access::Write, |state, config| {
            if let Some(owner) = state.records.file_owner(&file_name, key) {
                return Err(StoreError::InvalidArgument(format!(
                    "record file {:?} already holds key {:?}",
                    file_name, owner
                )));
            }

            if config.persist_storage {
                std_fs::create_dir_all(&state.dir)?;
                fs::write_atomic(&state.dir.join(&file_name), &body)?;

                if config.write_metadata {
                    fs::write_json_atomic(
                        &state.dir.join(record_metadata_file_name(key)),
                        &RecordMetadata {
                            key: key.to_string(),
                            content_type: content_type.clone(),
                        },
                    )?;
                }

                if let Some(old) = state.records.get(key) {
                    if old.file_name != file_name {
                        fs::remove_file_if_exists(&state.dir.join(&old.file_name))?;
                    }
                }
            }

            debug!(store = %state.id, key, content_type = %content_type, size = body.len(), "Set record");

            state.records.insert(
                key.to_string(),
                StoredRecord {
                    value: body,
                    content_type,
                    file_name,
                },
            );
            Ok(())
        })
    }

    /// Read a record; `Ok(None)` when the key is absent
    pub fn get_record(&self, key: &str) -> Result<Option<KeyValueRecord>> {
        self.manager.with_collection(&self.id, Access::Read, |state, _| {
            Ok(state.records.get(key).map(|r| KeyValueRecord {
                key: key.to_string(),
                value: r.value.clone(),
                content_type: r.content_type.clone(),
            }))
        })
    }

    /// Delete a record; absent keys are not an error
    pub fn delete_record(&self, key: &str) -> Result<()> {
        self.manager.with_collection(&self.id, Access::Write, |state, config| {
            remove_record(state, config, key).map(|_| ())
        })
    }

    /// Keys in insertion order, starting after `exclusive_start_key`
    ///
    /// A start key that is not in the store lists from the beginning.
    pub fn list_keys(
        &self,
        exclusive_start_key: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<KeyInfo>> {
        self.manager.with_collection(&self.id, Access::Read, |state, _| {
            let records = &state.records;
            let skip = exclusive_start_key
                .and_then(|start| records.keys().position(|k| k == start))
                .map_or(0, |pos| pos + 1);

            Ok(records
                .keys()
                .skip(skip)
                .take(limit.unwrap_or(usize::MAX))
                .filter_map(|key| {
                    records.get(key).map(|r| KeyInfo {
                        key: key.clone(),
                        size: r.value.len(),
                    })
                })
                .collect())
        })
    }

    /// Delete every record whose key is not in `keep`; returns how many went
    pub fn clear_except(&self, keep: &[&str]) -> Result<usize> {
        self.manager.with_collection(&self.id, Access::Write, |state, config| {
            let doomed: Vec<String> = state
                .records
                .keys()
                .filter(|k| !keep.contains(&k.as_str()))
                .cloned()
                .collect();

            for key in &doomed {
                remove_record(state, config, key)?;
            }
            Ok(doomed.len())
        })
    }

    /// Drop the store
    pub fn delete(&self) -> Result<bool> {
        self.manager.drop_collection(&self.id)
    }
}

/// Remove a record from memory and, when persisting, its body and metadata files
fn remove_record(
    state: &mut CollectionState<KeyValueStoreKind>,
    config: &StorageConfig,
    key: &str,
) -> Result<bool> {
    let Some(file_name) = state.records.get(key).map(|r| r.file_name.clone()) else {
        return Ok(false);
    };

    if config.persist_storage {
        fs::remove_file_if_exists(&state.dir.join(&file_name))?;
        fs::remove_file_if_exists(&state.dir.join(record_metadata_file_name(key)))?;
    }

    state.records.remove(key);
    debug!(store = %state.id, key, "Deleted record");
    Ok(true)
}
