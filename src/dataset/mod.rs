//! Dataset Module
//!
//! Append-only sequences of JSON items.
//!
//! ## Responsibilities
//! - Append items in order, one file per item
//! - Page through items by offset/limit, ascending or descending
//! - Rebuild the item list from disk in numeric filename order
//!
//! ## File Naming
//! ```text
//! datasets/{name-or-id}/000000001.json   (first item)
//! datasets/{name-or-id}/000000002.json
//! ```
//! The number is the 1-based position, zero-padded to 9 digits.

mod client;

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::storage::{fs, CollectionKind, CollectionMetadata, StorageKind};

pub use client::DatasetClient;

/// Metadata of a dataset
pub type DatasetMetadata = CollectionMetadata<DatasetCounters>;

/// Marker type plugging datasets into the collection manager
pub struct DatasetKind;

/// Items of one dataset, in insertion order
#[derive(Debug, Default)]
pub struct DatasetRecords {
    items: Vec<Value>,
}

/// Dataset counters reported in metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetCounters {
    pub item_count: usize,
}

/// Paging options for `list_items`
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub offset: usize,
    pub limit: Option<usize>,
    /// Newest first
    pub desc: bool,
}

/// One page of dataset items
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetItemsPage {
    pub items: Vec<Value>,
    /// Total items in the dataset
    pub total: usize,
    pub offset: usize,
    pub limit: Option<usize>,
    /// Items in this page
    pub count: usize,
    pub desc: bool,
}

impl CollectionKind for DatasetKind {
    const KIND: StorageKind = StorageKind::Dataset;
    type Records = DatasetRecords;
    type Counters = DatasetCounters;

    fn counters(records: &DatasetRecords) -> DatasetCounters {
        DatasetCounters {
            item_count: records.items.len(),
        }
    }

    fn load_records(dir: &Path) -> Result<DatasetRecords> {
        let mut numbered: Vec<(u64, std::path::PathBuf)> = Vec::new();

        for path in fs::record_files(dir)? {
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match parse_item_number(&path) {
                Some(n) => numbered.push((n, path)),
                None => debug!(file = ?path, "Ignoring non-item file in dataset"),
            }
        }

        // Numeric, not lexicographic: "1000000000.json" sorts after "999999999.json"
        numbered.sort_by_key(|(n, _)| *n);

        let mut items = Vec::with_capacity(numbered.len());
        for (_, path) in numbered {
            items.push(fs::read_json(&path)?);
        }
        Ok(DatasetRecords { items })
    }
}

/// File name of the item at 0-based `index`
pub(crate) fn item_file_name(index: usize) -> String {
    format!("{:09}.json", index + 1)
}

/// "000000042.json" → Some(42)
fn parse_item_number(path: &Path) -> Option<u64> {
    path.file_stem()?.to_str()?.parse().ok()
}
