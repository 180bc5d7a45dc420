//! Error types for memstore
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StorageKind;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for memstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("{kind} not found: {what}")]
    NotFound { kind: StorageKind, what: String },

    #[error("{kind} with name '{name}' already exists")]
    Conflict { kind: StorageKind, name: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt metadata at {path:?}: {reason}")]
    CorruptMetadata { path: PathBuf, reason: String },
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl StoreError {
    pub(crate) fn not_found(kind: StorageKind, what: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            what: what.into(),
        }
    }

    /// True for `NotFound`, used by callers that treat a missing target as a no-op
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
