//! Request Queue Module
//!
//! Deduplicated work queues of requests.
//!
//! ## Responsibilities
//! - Deduplicate requests by unique key
//! - Order pending requests: forefront requests first (newest forefront on
//!   top), then regular requests first-in first-out
//! - Track handled requests, which leave the ordering (`orderNo = null`)
//!
//! ## File Naming
//! ```text
//! request_queues/{name-or-id}/{request-id}.json
//! ```
//! The request id is derived from the unique key, so the same request always
//! lands in the same file.

mod client;

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Result;
use crate::storage::{fs, CollectionKind, CollectionMetadata, StorageKind};

pub use client::RequestQueueClient;

/// Metadata of a request queue
pub type RequestQueueMetadata = CollectionMetadata<RequestQueueCounters>;

const REQUEST_ID_LEN: usize = 15;

/// Marker type plugging request queues into the collection manager
pub struct RequestQueueKind;

/// A request stored in a queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRequest {
    pub id: String,
    pub unique_key: String,
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub payload: Option<Value>,
    /// Position in the queue; `None` once handled
    pub order_no: Option<i64>,
    #[serde(default)]
    pub handled_at: Option<DateTime<Utc>>,
}

impl QueueRequest {
    pub fn is_handled(&self) -> bool {
        self.handled_at.is_some()
    }
}

/// A request to enqueue
#[derive(Debug, Clone, PartialEq)]
pub struct NewRequest {
    pub url: String,
    /// Defaults to the URL
    pub unique_key: Option<String>,
    /// Defaults to GET
    pub method: Option<String>,
    pub payload: Option<Value>,
}

impl NewRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            unique_key: None,
            method: None,
            payload: None,
        }
    }

    pub fn unique_key(mut self, key: impl Into<String>) -> Self {
        self.unique_key = Some(key.into());
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Result of adding or updating a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequestOutcome {
    pub request_id: String,
    pub was_already_present: bool,
    pub was_already_handled: bool,
}

/// Request queue counters reported in metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestQueueCounters {
    pub total_request_count: usize,
    pub handled_request_count: usize,
    pub pending_request_count: usize,
}

/// Requests of one queue, keyed by id
#[derive(Debug)]
pub struct RequestQueueRecords {
    requests: HashMap<String, QueueRequest>,
    /// Magnitude of the next order number; never reused
    next_order: i64,
}

impl Default for RequestQueueRecords {
    fn default() -> Self {
        Self {
            requests: HashMap::new(),
            next_order: 1,
        }
    }
}

impl RequestQueueRecords {
    /// Allocate an order number: negative for forefront, positive otherwise
    fn allocate_order(&mut self, forefront: bool) -> i64 {
        let n = self.next_order;
        self.next_order += 1;
        if forefront {
            -n
        } else {
            n
        }
    }
}

impl CollectionKind for RequestQueueKind {
    const KIND: StorageKind = StorageKind::RequestQueue;
    type Records = RequestQueueRecords;
    type Counters = RequestQueueCounters;

    fn counters(records: &RequestQueueRecords) -> RequestQueueCounters {
        let total = records.requests.len();
        let handled = records.requests.values().filter(|r| r.is_handled()).count();
        RequestQueueCounters {
            total_request_count: total,
            handled_request_count: handled,
            pending_request_count: total - handled,
        }
    }

    fn load_records(dir: &Path) -> Result<RequestQueueRecords> {
        let mut records = RequestQueueRecords::default();

        for path in fs::record_files(dir)? {
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let request: QueueRequest = fs::read_json(&path)?;
            if let Some(order) = request.order_no {
                records.next_order = records.next_order.max(order.abs() + 1);
            }
            records.requests.insert(request.id.clone(), request);
        }

        debug!(dir = ?dir, count = records.requests.len(), "Loaded requests");
        Ok(records)
    }
}

/// Id of the request with `unique_key`: the first 15 hex digits of its SHA-256
pub fn request_id(unique_key: &str) -> String {
    let digest = Sha256::digest(unique_key.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(REQUEST_ID_LEN);
    hex
}

fn default_method() -> String {
    "GET".to_string()
}
