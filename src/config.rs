//! Configuration for memstore
//!
//! The only place in the crate that reads the process environment. Every
//! explicit builder setting wins over the environment; unset options fall
//! back to environment-derived defaults.

use std::path::PathBuf;

// =============================================================================
// Environment Variables
// =============================================================================

/// Enables/disables writing collections to disk ("1"/"true" vs "0"/"false"/"")
pub const ENV_PERSIST_STORAGE: &str = "MEMSTORE_PERSIST_STORAGE";

/// Root directory for all storages
pub const ENV_LOCAL_STORAGE_DIR: &str = "MEMSTORE_LOCAL_STORAGE_DIR";

/// Whether default collections are purged when storage is opened
pub const ENV_PURGE_ON_START: &str = "MEMSTORE_PURGE_ON_START";

/// Debug signal; when present and non-empty, metadata files are written
pub const ENV_DEBUG: &str = "DEBUG";

const DEFAULT_ROOT_DIR: &str = "./storage";

/// Resolved storage configuration
///
/// Built once at startup and shared read-only by every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Root directory. Internal structure:
    ///   {root_dir}/
    ///     ├── datasets/
    ///     ├── key_value_stores/
    ///     └── request_queues/
    pub root_dir: PathBuf,

    /// Mirror every mutation to disk
    pub persist_storage: bool,

    /// Write `__metadata__.json` and record metadata files
    pub write_metadata: bool,

    /// Purge default collections when storage is opened
    pub purge_on_start: bool,
}

impl StorageConfig {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Resolve a config purely from the process environment
    pub fn from_env() -> Self {
        Self::builder().build()
    }
}

/// Builder for StorageConfig
///
/// Options left unset are resolved from the environment in `build`.
#[derive(Debug, Default, Clone)]
pub struct ConfigBuilder {
    root_dir: Option<PathBuf>,
    persist_storage: Option<bool>,
    write_metadata: Option<bool>,
    purge_on_start: Option<bool>,
}

impl ConfigBuilder {
    /// Set the root directory for all storages
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Enable or disable persistence to disk
    pub fn persist_storage(mut self, persist: bool) -> Self {
        self.persist_storage = Some(persist);
        self
    }

    /// Enable or disable metadata files
    pub fn write_metadata(mut self, write: bool) -> Self {
        self.write_metadata = Some(write);
        self
    }

    /// Enable or disable purging default collections on open
    pub fn purge_on_start(mut self, purge: bool) -> Self {
        self.purge_on_start = Some(purge);
        self
    }

    /// Resolve against the process environment
    pub fn build(self) -> StorageConfig {
        self.build_with_env(|name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary variable lookup
    pub fn build_with_env<F>(self, lookup: F) -> StorageConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let root_dir = self
            .root_dir
            .or_else(|| lookup(ENV_LOCAL_STORAGE_DIR).filter(|s| !s.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR));

        let persist_storage = self
            .persist_storage
            .unwrap_or_else(|| env_flag(&lookup, ENV_PERSIST_STORAGE, true));

        let write_metadata = self
            .write_metadata
            .unwrap_or_else(|| lookup(ENV_DEBUG).is_some_and(|v| !v.is_empty()));

        let purge_on_start = self
            .purge_on_start
            .unwrap_or_else(|| env_flag(&lookup, ENV_PURGE_ON_START, true));

        StorageConfig {
            root_dir,
            persist_storage,
            write_metadata,
            purge_on_start,
        }
    }
}

/// Parse a boolean environment flag
///
/// "1"/"true" → true, "0"/"false"/"" → false, absent → `default`.
fn env_flag<F>(lookup: &F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return default;
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => true,
        "0" | "false" | "" => false,
        other => {
            tracing::warn!(var = name, value = other, "Unrecognized boolean value, using default");
            default
        }
    }
}
