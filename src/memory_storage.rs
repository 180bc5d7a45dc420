//! MemoryStorage
//!
//! Process-wide entry point that ties configuration, the three collection
//! managers and purge together.
//!
//! ## Startup
//! 1. Freeze the resolved config
//! 2. Open one manager per storage kind (rediscovers persisted collections)
//! 3. Purge default collections when `purge_on_start` is set
//! 4. Hand the instance to the caller

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::StorageConfig;
use crate::dataset::{DatasetClient, DatasetKind};
use crate::error::Result;
use crate::key_value::{KeyValueStoreClient, KeyValueStoreKind};
use crate::purge::{self, PurgeReport};
use crate::request_queue::{RequestQueueClient, RequestQueueKind};
use crate::storage::CollectionManager;

/// Local emulation of datasets, key-value stores and request queues
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct MemoryStorage {
    config: Arc<StorageConfig>,
    datasets: Arc<CollectionManager<DatasetKind>>,
    key_value_stores: Arc<CollectionManager<KeyValueStoreKind>>,
    request_queues: Arc<CollectionManager<RequestQueueKind>>,
}

impl MemoryStorage {
    /// Open storage with the given config
    ///
    /// When `purge_on_start` is set, default collections are purged before
    /// this returns, so callers always start from a clean run state.
    pub fn open(config: StorageConfig) -> Result<Self> {
        let config = Arc::new(config);

        info!(
            root = ?config.root_dir,
            persist = config.persist_storage,
            write_metadata = config.write_metadata,
            "Opening storage"
        );

        let storage = Self {
            datasets: Arc::new(CollectionManager::open(Arc::clone(&config))?),
            key_value_stores: Arc::new(CollectionManager::open(Arc::clone(&config))?),
            request_queues: Arc::new(CollectionManager::open(Arc::clone(&config))?),
            config,
        };

        if storage.config.purge_on_start {
            storage.purge();
        }

        Ok(storage)
    }

    /// Open at `path` with environment defaults for everything else
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(StorageConfig::builder().root_dir(path).build())
    }

    /// Reset default collections; see [`purge`](crate::purge)
    pub fn purge(&self) -> PurgeReport {
        purge::purge(self)
    }

    // =========================================================================
    // Collection Managers
    // =========================================================================

    pub fn datasets(&self) -> Arc<CollectionManager<DatasetKind>> {
        Arc::clone(&self.datasets)
    }

    pub fn key_value_stores(&self) -> Arc<CollectionManager<KeyValueStoreKind>> {
        Arc::clone(&self.key_value_stores)
    }

    pub fn request_queues(&self) -> Arc<CollectionManager<RequestQueueKind>> {
        Arc::clone(&self.request_queues)
    }

    // =========================================================================
    // Collection Clients
    // =========================================================================

    pub fn dataset(&self, id: &str) -> DatasetClient {
        DatasetClient::new(self.datasets(), id)
    }

    pub fn key_value_store(&self, id: &str) -> KeyValueStoreClient {
        KeyValueStoreClient::new(self.key_value_stores(), id)
    }

    pub fn request_queue(&self, id: &str) -> RequestQueueClient {
        RequestQueueClient::new(self.request_queues(), id)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn datasets_dir(&self) -> &Path {
        self.datasets.kind_dir()
    }

    pub fn key_value_stores_dir(&self) -> &Path {
        self.key_value_stores.kind_dir()
    }

    pub fn request_queues_dir(&self) -> &Path {
        self.request_queues.kind_dir()
    }
}
