//! Collection state and the per-kind record codec trait

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

use super::{fs, CollectionMetadata, StorageKind, METADATA_FILENAME};

/// What a storage kind plugs into the shared collection machinery
///
/// The manager owns directories, metadata and the registry; an implementor
/// only describes its in-memory record container, the counters it reports in
/// metadata, and how to rebuild the container from a collection directory.
pub trait CollectionKind: Send + Sync + 'static {
    const KIND: StorageKind;

    /// In-memory records of one collection
    type Records: Default + Send + 'static;

    /// Kind-specific counters flattened into the metadata
    type Counters: Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send;

    fn counters(records: &Self::Records) -> Self::Counters;

    /// Rebuild records from an existing collection directory
    fn load_records(dir: &Path) -> Result<Self::Records>;
}

/// Whether an operation reads or mutates a collection (drives timestamps)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// One collection: identity, timestamps, directory and records
pub struct CollectionState<K: CollectionKind> {
    pub(crate) id: String,
    pub(crate) name: Option<String>,
    created_at: DateTime<Utc>,
    accessed_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    pub(crate) dir: PathBuf,
    pub(crate) records: K::Records,
    /// Set when the collection was dropped while a caller still held it
    pub(crate) dropped: bool,
}

impl<K: CollectionKind> CollectionState<K> {
    pub(crate) fn new(id: String, name: Option<String>, dir: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            created_at: now,
            accessed_at: now,
            modified_at: now,
            dir,
            records: K::Records::default(),
            dropped: false,
        }
    }

    /// Load a collection persisted by an earlier run
    ///
    /// Identity comes from `__metadata__.json` when present. Otherwise the
    /// directory name becomes the id, and also the name unless it has the
    /// shape of a generated id (unnamed collections live under their id).
    pub(crate) fn load(dir: &Path) -> Result<Self> {
        let metadata_path = dir.join(METADATA_FILENAME);
        let dir_name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| StoreError::CorruptMetadata {
                path: dir.to_path_buf(),
                reason: "directory name is not valid UTF-8".to_string(),
            })?;

        let mut state = if metadata_path.is_file() {
            let stored: CollectionMetadata<serde_json::Map<String, serde_json::Value>> =
                fs::read_json(&metadata_path).map_err(|e| StoreError::CorruptMetadata {
                    path: metadata_path.clone(),
                    reason: e.to_string(),
                })?;
            Self {
                id: stored.id,
                name: stored.name,
                created_at: stored.created_at,
                accessed_at: stored.accessed_at,
                modified_at: stored.modified_at,
                dir: dir.to_path_buf(),
                records: K::Records::default(),
                dropped: false,
            }
        } else {
            let name = (!is_generated_id(&dir_name)).then(|| dir_name.clone());
            Self::new(dir_name, name, dir.to_path_buf())
        };

        state.records = K::load_records(dir)?;
        Ok(state)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Snapshot of the metadata with current counters
    pub fn metadata(&self) -> CollectionMetadata<K::Counters> {
        CollectionMetadata {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            accessed_at: self.accessed_at,
            modified_at: self.modified_at,
            counters: K::counters(&self.records),
        }
    }

    pub(crate) fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn touch(&mut self, access: Access) {
        let now = Utc::now();
        self.accessed_at = now;
        if access == Access::Write {
            self.modified_at = now;
        }
    }
}

/// Generate a collection id
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Whether `s` looks like an id from `new_id`
fn is_generated_id(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
