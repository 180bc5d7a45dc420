//! Collection metadata
//!
//! Serialized as `__metadata__.json`:
//! ```json
//! {
//!   "id": "4f0c...",
//!   "name": "default",
//!   "createdAt": "2024-01-01T00:00:00Z",
//!   "accessedAt": "2024-01-01T00:00:00Z",
//!   "modifiedAt": "2024-01-01T00:00:00Z",
//!   "itemCount": 3
//! }
//! ```
//! Kind-specific counters are flattened into the same object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptor of one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMetadata<C> {
    pub id: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(flatten)]
    pub counters: C,
}

impl<C> CollectionMetadata<C> {
    /// Name if set, otherwise the id (the collection's directory name)
    pub fn name_or_id(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
