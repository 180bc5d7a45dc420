//! Dataset client
//!
//! Record operations on one dataset, addressed by id.

use std::fs as std_fs;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::storage::{fs, Access, CollectionManager};

use super::{item_file_name, DatasetItemsPage, DatasetKind, DatasetMetadata, ListOptions};

/// Handle to one dataset
///
/// Cheap to clone; every call looks the dataset up by id, so a dropped
/// dataset yields `NotFound`.
#[derive(Clone)]
pub struct DatasetClient {
    manager: Arc<CollectionManager<DatasetKind>>,
    id: String,
}

impl DatasetClient {
    pub(crate) fn new(manager: Arc<CollectionManager<DatasetKind>>, id: impl Into<String>) -> Self {
        Self {
            manager,
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current metadata
    pub fn metadata(&self) -> Result<DatasetMetadata> {
        self.manager.get_by_id(&self.id)
    }

    /// Append items in order
    ///
    /// Each item's index is the item count at the time it is appended.
    pub fn push_items<I>(&self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = Value>,
    {
        self.manager.with_collection(&self.id, Access::Write, |state, config| {
            if config.persist_storage {
                std_fs::create_dir_all(&state.dir)?;
            }

            let start = state.records.items.len();
            for item in items {
                let index = state.records.items.len();
                if config.persist_storage {
                    fs::write_json_atomic(&state.dir.join(item_file_name(index)), &item)?;
                }
                state.records.items.push(item);
            }

            debug!(
                dataset = %state.id,
                pushed = state.records.items.len() - start,
                "Pushed items"
            );
            Ok(())
        })
    }

    /// Append a single JSON value; a top-level array is pushed element-wise
    pub fn push_value(&self, value: Value) -> Result<()> {
        match value {
            Value::Array(items) => self.push_items(items),
            item => self.push_items([item]),
        }
    }

    /// One page of items
    ///
    /// With `desc`, items are reversed before `offset`/`limit` apply.
    pub fn list_items(&self, options: ListOptions) -> Result<DatasetItemsPage> {
        self.manager.with_collection(&self.id, Access::Read, |state, _| {
            let all = &state.records.items;
            let total = all.len();
            let take = options.limit.unwrap_or(usize::MAX);

            let items: Vec<Value> = if options.desc {
                all.iter().rev().skip(options.offset).take(take).cloned().collect()
            } else {
                all.iter().skip(options.offset).take(take).cloned().collect()
            };

            Ok(DatasetItemsPage {
                count: items.len(),
                items,
                total,
                offset: options.offset,
                limit: options.limit,
                desc: options.desc,
            })
        })
    }

    /// Item at 0-based `index`
    pub fn get_item(&self, index: usize) -> Result<Option<Value>> {
        self.manager.with_collection(&self.id, Access::Read, |state, _| {
            Ok(state.records.items.get(index).cloned())
        })
    }

    /// Drop the dataset
    pub fn delete(&self) -> Result<bool> {
        self.manager.drop_collection(&self.id)
    }
}
