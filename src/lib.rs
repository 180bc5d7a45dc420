//! # memstore
//!
//! A local, filesystem-backed emulation of cloud storage with:
//! - Datasets: append-only sequences of JSON items
//! - Key-value stores: keyed records with a content type
//! - Request queues: deduplicated, ordered work items
//! - Purge-on-start of the default collections between runs
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MemoryStorage                           │
//! │          (StorageConfig, purge on start, clients)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!        ┌──────────────┼──────────────────┐
//!        │              │                  │
//!        ▼              ▼                  ▼
//!  ┌───────────┐  ┌───────────────┐  ┌──────────────┐
//!  │  Dataset  │  │ KeyValueStore │  │ RequestQueue │
//!  │  (items)  │  │   (records)   │  │  (requests)  │
//!  └─────┬─────┘  └───────┬───────┘  └──────┬───────┘
//!        │                │                 │
//!        └────────────────┼─────────────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │  CollectionManager  │
//!              │ (registry + on-disk │
//!              │       mirror)       │
//!              └─────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod dataset;
pub mod key_value;
pub mod request_queue;
pub mod purge;
pub mod memory_storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::StorageConfig;
pub use memory_storage::MemoryStorage;
pub use purge::PurgeReport;
pub use storage::{CollectionMetadata, StorageKind};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of memstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
