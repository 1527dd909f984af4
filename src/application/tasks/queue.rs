//! Task dispatch.
//!
//! [`TaskQueue`] is the single submission point: it registers a `PENDING`
//! record with the tracker, then enqueues the message onto the apalis
//! backend the worker consumes. If the enqueue fails the record is marked
//! `FAILURE` so pollers see the outcome instead of a task stuck in
//! `PENDING` forever.

use std::sync::Arc;

use apalis::prelude::{MemoryStorage, MessageQueue};
use metrics::counter;
use tracing::{debug, error};
use uuid::Uuid;

use super::tracker::TaskStatusTracker;
use super::types::{TaskHandle, TaskMessage, TaskSpec};
use crate::application::error::AppError;

#[derive(Clone)]
pub struct TaskQueue {
    queue: MemoryStorage<TaskMessage>,
    tracker: Arc<TaskStatusTracker>,
}

impl TaskQueue {
    pub fn new(tracker: Arc<TaskStatusTracker>) -> Self {
        Self {
            queue: MemoryStorage::new(),
            tracker,
        }
    }

    /// Backend handle for the worker builder.
    pub fn storage(&self) -> MemoryStorage<TaskMessage> {
        self.queue.clone()
    }

    pub fn tracker(&self) -> Arc<TaskStatusTracker> {
        self.tracker.clone()
    }

    /// Accept a task for background execution and return its handle.
    pub async fn dispatch(&self, spec: TaskSpec) -> Result<TaskHandle, AppError> {
        let task_id = Uuid::new_v4();
        self.tracker.create(task_id);

        let message = TaskMessage {
            task_id,
            spec: spec.clone(),
        };
        let mut queue = self.queue.clone();
        if queue.enqueue(message).await.is_err() {
            error!(%task_id, "task enqueue failed");
            self.tracker.mark_failed(task_id, "task could not be queued");
            return Err(AppError::unexpected("task could not be queued"));
        }

        counter!("ladle_task_dispatched_total", "action" => spec.action()).increment(1);
        debug!(%task_id, action = spec.action(), "task dispatched");
        Ok(TaskHandle { task_id })
    }
}
