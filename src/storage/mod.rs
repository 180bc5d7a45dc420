//! Storage Module
//!
//! Directory layout and named-collection lifecycle shared by every storage kind.
//!
//! ## Responsibilities
//! - One directory per storage kind under the storage root
//! - One directory per collection, named after the collection (or its id)
//! - Create / get / list / rename / drop collections
//! - Rediscover collections persisted by an earlier run
//!
//! ## Layout
//! ```text
//! {root_dir}/
//! ├── datasets/
//! │   └── {name-or-id}/
//! │       ├── __metadata__.json
//! │       ├── 000000001.json
//! │       └── 000000002.json
//! ├── key_value_stores/
//! │   └── {name-or-id}/
//! │       ├── __metadata__.json
//! │       ├── INPUT.json
//! │       └── INPUT.__metadata__.json
//! └── request_queues/
//!     └── {name-or-id}/
//!         ├── __metadata__.json
//!         └── {request-id}.json
//! ```

use std::fmt;

mod collection;
pub(crate) mod fs;
mod manager;
mod metadata;

pub use collection::{Access, CollectionKind, CollectionState};
pub use manager::CollectionManager;
pub use metadata::CollectionMetadata;

/// Name of the per-collection metadata file
pub const METADATA_FILENAME: &str = "__metadata__.json";

/// Name of the implicit collection used when the caller gives no name
pub const DEFAULT_COLLECTION_NAME: &str = "default";

/// The three storage kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Dataset,
    KeyValueStore,
    RequestQueue,
}

impl StorageKind {
    /// Directory under the storage root holding collections of this kind
    pub fn dir_name(self) -> &'static str {
        match self {
            StorageKind::Dataset => "datasets",
            StorageKind::KeyValueStore => "key_value_stores",
            StorageKind::RequestQueue => "request_queues",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StorageKind::Dataset => "Dataset",
            StorageKind::KeyValueStore => "Key-value store",
            StorageKind::RequestQueue => "Request queue",
        };
        f.write_str(label)
    }
}

/// Check a collection name or id before it is used as a directory name
pub(crate) fn validate_collection_name(kind: StorageKind, name: &str) -> crate::Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);

    if bad {
        return Err(crate::StoreError::InvalidArgument(format!(
            "{} name {:?} cannot be used as a directory name",
            kind, name
        )));
    }
    Ok(())
}
