//! Collection Manager
//!
//! Manages every collection of one storage kind.
//!
//! ## Responsibilities
//! - Discover collections persisted by an earlier run on startup
//! - Create-or-fetch collections by name or id (idempotent per name)
//! - List collections in creation order
//! - Rename and drop collections, mirroring the change on disk
//! - Run record operations against one collection under its lock

use std::fs as std_fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::error::{Result, StoreError};

use super::collection::new_id;
use super::{
    fs, validate_collection_name, Access, CollectionKind, CollectionMetadata, CollectionState,
    METADATA_FILENAME,
};

/// Registry slot; `id` and `name` are duplicated here so lookups never need
/// the collection lock
struct Entry<K: CollectionKind> {
    id: String,
    name: Option<String>,
    state: Arc<Mutex<CollectionState<K>>>,
}

/// Manages the collections of one storage kind
///
/// ## Concurrency:
/// - `collections`: RwLock over the registry (creation order)
/// - each collection: its own Mutex, so record operations are serialized
///   per collection
/// - lock order is always registry → collection; record operations release
///   the registry before locking the collection
pub struct CollectionManager<K: CollectionKind> {
    /// Directory holding one subdirectory per collection
    kind_dir: PathBuf,

    config: Arc<StorageConfig>,

    collections: RwLock<Vec<Entry<K>>>,
}

impl<K: CollectionKind> CollectionManager<K> {
    /// Open the manager for `{root_dir}/{kind dir}`
    ///
    /// Existing collection directories are loaded into the registry. The
    /// kind directory itself is not created until the first persisted write.
    pub fn open(config: Arc<StorageConfig>) -> Result<Self> {
        let kind_dir = config.root_dir.join(K::KIND.dir_name());
        let collections = Self::discover(&kind_dir)?;

        if !collections.is_empty() {
            info!(
                kind = %K::KIND,
                count = collections.len(),
                "Discovered persisted collections"
            );
        }

        Ok(Self {
            kind_dir,
            config,
            collections: RwLock::new(collections),
        })
    }

    /// Return the named (or identified) collection, creating it if needed
    ///
    /// - `name` given and registered: its metadata (the same id every call)
    /// - `id` given and registered: its metadata
    /// - otherwise: a new collection with `id` (or a generated one)
    ///
    /// An explicit `id` that disagrees with the collection registered under
    /// `name` is a conflict.
    pub fn get_or_create(
        &self,
        name: Option<&str>,
        id: Option<&str>,
    ) -> Result<CollectionMetadata<K::Counters>> {
        if let Some(name) = name {
            validate_collection_name(K::KIND, name)?;
        }
        if let Some(id) = id {
            validate_collection_name(K::KIND, id)?;
        }

        let mut collections = self.collections.write();

        let existing = match (name, id) {
            (Some(name), _) => collections
                .iter()
                .find(|e| e.name.as_deref() == Some(name)),
            (None, Some(id)) => collections.iter().find(|e| e.id == id),
            (None, None) => None,
        };

        if let Some(entry) = existing {
            if let Some(id) = id {
                if entry.id != id {
                    return Err(StoreError::Conflict {
                        kind: K::KIND,
                        name: name.unwrap_or_default().to_string(),
                    });
                }
            }
            let mut state = entry.state.lock();
            state.touch(Access::Read);
            self.write_metadata(&state)?;
            return Ok(state.metadata());
        }

        if let Some(id) = id {
            if collections.iter().any(|e| e.id == id) {
                return Err(StoreError::Conflict {
                    kind: K::KIND,
                    name: id.to_string(),
                });
            }
        }

        let id = id.map(str::to_string).unwrap_or_else(new_id);
        let dir_name = name.unwrap_or(&id);
        let dir = self.kind_dir.join(dir_name);
        if self.dir_taken(&collections, &dir, None) {
            return Err(StoreError::Conflict {
                kind: K::KIND,
                name: dir_name.to_string(),
            });
        }
        let state = CollectionState::<K>::new(id.clone(), name.map(str::to_string), dir);

        if self.config.persist_storage {
            std_fs::create_dir_all(&state.dir)?;
        }
        self.write_metadata(&state)?;

        info!(kind = %K::KIND, id = %id, name = ?name, "Created collection");

        let metadata = state.metadata();
        collections.push(Entry {
            id,
            name: name.map(str::to_string),
            state: Arc::new(Mutex::new(state)),
        });
        Ok(metadata)
    }

    /// All collections in creation order
    pub fn list(&self) -> Vec<CollectionMetadata<K::Counters>> {
        let states: Vec<_> = self
            .collections
            .read()
            .iter()
            .map(|e| Arc::clone(&e.state))
            .collect();

        states.iter().map(|s| s.lock().metadata()).collect()
    }

    /// Metadata of the collection with `id`
    pub fn get_by_id(&self, id: &str) -> Result<CollectionMetadata<K::Counters>> {
        let state = self.lookup(id)?;
        let mut state = state.lock();
        if state.dropped {
            return Err(StoreError::not_found(K::KIND, id));
        }

        state.touch(Access::Read);
        self.write_metadata(&state)?;
        Ok(state.metadata())
    }

    /// Metadata of the collection named `name`
    pub fn get_by_name(&self, name: &str) -> Result<CollectionMetadata<K::Counters>> {
        let id = self
            .id_for_name(name)
            .ok_or_else(|| StoreError::not_found(K::KIND, name))?;
        self.get_by_id(&id)
    }

    /// Give the collection a new name, moving its directory when persisting
    pub fn rename(&self, id: &str, new_name: &str) -> Result<CollectionMetadata<K::Counters>> {
        validate_collection_name(K::KIND, new_name)?;

        let mut collections = self.collections.write();

        if collections
            .iter()
            .any(|e| e.name.as_deref() == Some(new_name) && e.id != id)
        {
            return Err(StoreError::Conflict {
                kind: K::KIND,
                name: new_name.to_string(),
            });
        }

        if !collections.iter().any(|e| e.id == id) {
            return Err(StoreError::not_found(K::KIND, id));
        }

        let new_dir = self.kind_dir.join(new_name);
        if self.dir_taken(&collections, &new_dir, Some(id)) {
            let own_dir = collections
                .iter()
                .find(|e| e.id == id)
                .is_some_and(|e| e.state.lock().dir == new_dir);
            if !own_dir {
                return Err(StoreError::Conflict {
                    kind: K::KIND,
                    name: new_name.to_string(),
                });
            }
        }

        let entry = collections
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::not_found(K::KIND, id))?;

        let mut state = entry.state.lock();

        if self.config.persist_storage && state.dir != new_dir {
            if state.dir.exists() {
                std_fs::rename(&state.dir, &new_dir)?;
            } else {
                std_fs::create_dir_all(&new_dir)?;
            }
        }

        debug!(kind = %K::KIND, id, old = ?state.name, new = new_name, "Renamed collection");

        state.name = Some(new_name.to_string());
        state.dir = new_dir;
        state.touch(Access::Write);
        entry.name = Some(new_name.to_string());

        self.write_metadata(&state)?;
        Ok(state.metadata())
    }

    /// Drop a collection and, when persisting, its directory
    ///
    /// Returns `Ok(false)` when no collection has this id.
    pub fn drop_collection(&self, id: &str) -> Result<bool> {
        let entry = {
            let mut collections = self.collections.write();
            match collections.iter().position(|e| e.id == id) {
                Some(pos) => collections.remove(pos),
                None => return Ok(false),
            }
        };

        let mut state = entry.state.lock();
        state.dropped = true;

        if self.config.persist_storage {
            fs::remove_dir_if_exists(&state.dir)?;
        }

        info!(kind = %K::KIND, id, name = ?state.name, "Dropped collection");
        Ok(true)
    }

    /// Drop the collection registered under `name`, if any
    pub fn drop_by_name(&self, name: &str) -> Result<bool> {
        match self.id_for_name(name) {
            Some(id) => self.drop_collection(&id),
            None => Ok(false),
        }
    }

    /// Directory holding this kind's collections
    pub fn kind_dir(&self) -> &Path {
        &self.kind_dir
    }

    /// Number of registered collections
    pub fn len(&self) -> usize {
        self.collections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `op` against one collection under its lock
    ///
    /// Only after `op` succeeds are timestamps bumped according to `access`
    /// and the metadata file rewritten (when enabled).
    pub(crate) fn with_collection<R, F>(&self, id: &str, access: Access, op: F) -> Result<R>
    where
        F: FnOnce(&mut CollectionState<K>, &StorageConfig) -> Result<R>,
    {
        let state = self.lookup(id)?;
        let mut state = state.lock();
        if state.dropped {
            return Err(StoreError::not_found(K::KIND, id));
        }

        let out = op(&mut *state, &*self.config)?;
        state.touch(access);
        self.write_metadata(&state)?;
        Ok(out)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn lookup(&self, id: &str) -> Result<Arc<Mutex<CollectionState<K>>>> {
        self.collections
            .read()
            .iter()
            .find(|e| e.id == id)
            .map(|e| Arc::clone(&e.state))
            .ok_or_else(|| StoreError::not_found(K::KIND, id))
    }

    /// Whether `dir` belongs to a registered collection other than `except_id`,
    /// or (when persisting) already exists on disk
    fn dir_taken(&self, collections: &[Entry<K>], dir: &Path, except_id: Option<&str>) -> bool {
        let registered = collections
            .iter()
            .filter(|e| Some(e.id.as_str()) != except_id)
            .any(|e| e.state.lock().dir == dir);

        registered || (self.config.persist_storage && dir.exists())
    }

    fn id_for_name(&self, name: &str) -> Option<String> {
        self.collections
            .read()
            .iter()
            .find(|e| e.name.as_deref() == Some(name))
            .map(|e| e.id.clone())
    }

    /// Write `__metadata__.json` when persistence and metadata are enabled
    fn write_metadata(&self, state: &CollectionState<K>) -> Result<()> {
        if !(self.config.persist_storage && self.config.write_metadata) {
            return Ok(());
        }
        std_fs::create_dir_all(&state.dir)?;
        fs::write_json_atomic(&state.dir.join(METADATA_FILENAME), &state.metadata())
    }

    /// Load every collection directory under `kind_dir`, oldest first
    ///
    /// Unreadable directories are skipped with a warning so one corrupt
    /// collection never blocks startup.
    fn discover(kind_dir: &Path) -> Result<Vec<Entry<K>>> {
        if !kind_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        for entry in std_fs::read_dir(kind_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();

        let mut states: Vec<CollectionState<K>> = Vec::new();
        for dir in dirs {
            let state = match CollectionState::<K>::load(&dir) {
                Ok(state) => state,
                Err(e) => {
                    warn!(kind = %K::KIND, dir = ?dir, error = %e, "Skipping unreadable collection");
                    continue;
                }
            };

            let clash = states
                .iter()
                .any(|s| s.id == state.id || (s.name.is_some() && s.name == state.name));
            if clash {
                warn!(kind = %K::KIND, dir = ?dir, id = %state.id, "Skipping duplicate collection");
                continue;
            }
            states.push(state);
        }

        states.sort_by_key(|s| s.created_at());

        Ok(states
            .into_iter()
            .map(|state| Entry {
                id: state.id.clone(),
                name: state.name.clone(),
                state: Arc::new(Mutex::new(state)),
            })
            .collect())
    }
}
