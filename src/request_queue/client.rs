//! Request queue client
//!
//! Request operations on one queue, addressed by id.

use std::fs as std_fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::config::StorageConfig;
use crate::error::{Result, StoreError};
use crate::storage::{fs, Access, CollectionManager, CollectionState, StorageKind};

use super::{
    request_id, AddRequestOutcome, NewRequest, QueueRequest, RequestQueueKind,
    RequestQueueMetadata,
};

/// Handle to one request queue
#[derive(Clone)]
pub struct RequestQueueClient {
    manager: Arc<CollectionManager<RequestQueueKind>>,
    id: String,
}

impl RequestQueueClient {
    pub(crate) fn new(
        manager: Arc<CollectionManager<RequestQueueKind>>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current metadata
    pub fn metadata(&self) -> Result<RequestQueueMetadata> {
        self.manager.get_by_id(&self.id)
    }

    /// Enqueue a request unless one with the same unique key exists
    ///
    /// An existing request is left untouched and reported as already present.
    pub fn add_request(&self, request: NewRequest, forefront: bool) -> Result<AddRequestOutcome> {
        if request.url.is_empty() {
            return Err(StoreError::InvalidArgument("request URL is empty".to_string()));
        }
        let unique_key = request.unique_key.unwrap_or_else(|| request.url.clone());
        let id = request_id(&unique_key);

        self.manager.with_collection(&self.id, Access::Write, |state, config| {
            if let Some(existing) = state.records.requests.get(&id) {
                return Ok(AddRequestOutcome {
                    request_id: id,
                    was_already_present: true,
                    was_already_handled: existing.is_handled(),
                });
            }

            let stored = QueueRequest {
                id: id.clone(),
                unique_key,
                url: request.url,
                method: request.method.unwrap_or_else(|| "GET".to_string()),
                payload: request.payload,
                order_no: Some(state.records.allocate_order(forefront)),
                handled_at: None,
            };

            persist_request(state, config, &stored)?;
            debug!(queue = %state.id, request = %id, forefront, "Added request");
            state.records.requests.insert(id.clone(), stored);

            Ok(AddRequestOutcome {
                request_id: id,
                was_already_present: false,
                was_already_handled: false,
            })
        })
    }

    /// Request with `id`, if present
    pub fn get_request(&self, id: &str) -> Result<Option<QueueRequest>> {
        self.manager.with_collection(&self.id, Access::Read, |state, _| {
            Ok(state.records.requests.get(id).cloned())
        })
    }

    /// Replace a stored request
    ///
    /// A handled request loses its order number. A pending request keeps its
    /// position unless it was handled before or `forefront` is set, in which
    /// case it is queued again.
    pub fn update_request(
        &self,
        mut request: QueueRequest,
        forefront: bool,
    ) -> Result<AddRequestOutcome> {
        self.manager.with_collection(&self.id, Access::Write, |state, config| {
            let existing = state
                .records
                .requests
                .get(&request.id)
                .ok_or_else(|| StoreError::not_found(StorageKind::RequestQueue, request.id.clone()))?;

            let was_already_handled = existing.is_handled();
            let kept_order = existing.order_no;

            request.order_no = if request.is_handled() {
                None
            } else if !forefront && !was_already_handled {
                kept_order
            } else {
                Some(state.records.allocate_order(forefront))
            };

            persist_request(state, config, &request)?;
            debug!(queue = %state.id, request = %request.id, handled = request.is_handled(), "Updated request");

            let outcome = AddRequestOutcome {
                request_id: request.id.clone(),
                was_already_present: true,
                was_already_handled,
            };
            state.records.requests.insert(request.id.clone(), request);
            Ok(outcome)
        })
    }

    /// Mark a request handled, taking it out of the queue head
    pub fn mark_handled(&self, id: &str) -> Result<AddRequestOutcome> {
        let mut request = self
            .get_request(id)?
            .ok_or_else(|| StoreError::not_found(StorageKind::RequestQueue, id))?;
        if request.handled_at.is_none() {
            request.handled_at = Some(Utc::now());
        }
        self.update_request(request, false)
    }

    /// Delete a request; absent ids are not an error
    pub fn delete_request(&self, id: &str) -> Result<()> {
        self.manager.with_collection(&self.id, Access::Write, |state, config| {
            if state.records.requests.remove(id).is_some() && config.persist_storage {
                fs::remove_file_if_exists(&request_path(state, id))?;
                debug!(queue = %state.id, request = id, "Deleted request");
            }
            Ok(())
        })
    }

    /// Up to `limit` pending requests in queue order
    pub fn list_head(&self, limit: usize) -> Result<Vec<QueueRequest>> {
        self.manager.with_collection(&self.id, Access::Read, |state, _| {
            let mut pending: Vec<&QueueRequest> = state
                .records
                .requests
                .values()
                .filter(|r| r.order_no.is_some())
                .collect();
            pending.sort_by_key(|r| r.order_no);

            Ok(pending.into_iter().take(limit).cloned().collect())
        })
    }

    /// Drop the queue
    pub fn delete(&self) -> Result<bool> {
        self.manager.drop_collection(&self.id)
    }
}

fn request_path(state: &CollectionState<RequestQueueKind>, id: &str) -> PathBuf {
    state.dir.join(format!("{}.json", id))
}

fn persist_request(
    state: &CollectionState<RequestQueueKind>,
    config: &StorageConfig,
    request: &QueueRequest,
) -> Result<()> {
    if !config.persist_storage {
        return Ok(());
    }
    std_fs::create_dir_all(&state.dir)?;
    fs::write_json_atomic(&request_path(state, &request.id), request)
}
