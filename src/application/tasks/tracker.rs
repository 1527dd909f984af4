//! In-process task status registry.
//!
//! The dispatcher creates a `PENDING` record before enqueueing; the worker
//! advances it through `STARTED`/`PROGRESS` to a terminal `SUCCESS` or
//! `FAILURE`. Transitions are monotonic: a terminal state is final and a
//! stale update arriving out of order is dropped with a warning rather than
//! rewinding the record. Terminal records are pruned after a retention
//! window so pollers have time to read the outcome.

use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use super::types::{TaskRecord, TaskState, TaskStatus};

const SOURCE: &str = "tasks::tracker";

/// Poll interval used by [`TaskStatusTracker::wait_for_completion`].
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Retention for terminal records, mirroring a one-hour result expiry.
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WaitError {
    #[error("unknown task")]
    Unknown,
    #[error("task did not complete within the wait window")]
    TimedOut,
}

pub struct TaskStatusTracker {
    records: DashMap<Uuid, TaskRecord>,
    result_ttl: Duration,
}

impl Default for TaskStatusTracker {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_TTL)
    }
}

impl TaskStatusTracker {
    pub fn new(result_ttl: Duration) -> Self {
        Self {
            records: DashMap::new(),
            result_ttl,
        }
    }

    /// Register a fresh `PENDING` record.
    pub fn create(&self, task_id: Uuid) {
        self.records.insert(task_id, TaskRecord::pending(task_id));
    }

    pub fn mark_started(&self, task_id: Uuid) {
        self.transition(task_id, TaskState::Started, None, None, None);
    }

    /// Record intermediate progress, 0..=100.
    pub fn set_progress(&self, task_id: Uuid, percent: u8) {
        self.transition(
            task_id,
            TaskState::Progress,
            Some(percent.min(100)),
            None,
            None,
        );
    }

    pub fn mark_succeeded(&self, task_id: Uuid, result: serde_json::Value) {
        self.transition(task_id, TaskState::Success, Some(100), Some(result), None);
    }

    pub fn mark_failed(&self, task_id: Uuid, error: impl Into<String>) {
        self.transition(task_id, TaskState::Failure, None, None, Some(error.into()));
    }

    fn transition(
        &self,
        task_id: Uuid,
        next: TaskState,
        progress: Option<u8>,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) {
        let Some(mut record) = self.records.get_mut(&task_id) else {
            warn!(target: SOURCE, %task_id, state = next.as_str(), "transition for unknown task dropped");
            return;
        };

        if record.state.is_terminal() {
            warn!(
                target: SOURCE,
                %task_id,
                from = record.state.as_str(),
                to = next.as_str(),
                "transition after terminal state dropped"
            );
            return;
        }

        // PROGRESS may repeat at the same rank; anything else must advance.
        let regression = next.rank() < record.state.rank()
            || (next.rank() == record.state.rank() && next != TaskState::Progress);
        if regression {
            warn!(
                target: SOURCE,
                %task_id,
                from = record.state.as_str(),
                to = next.as_str(),
                "out-of-order transition dropped"
            );
            return;
        }

        record.state = next;
        if progress.is_some() {
            record.progress = progress;
        }
        if result.is_some() {
            record.result = result;
        }
        if error.is_some() {
            record.error = error;
        }
        record.updated_at = OffsetDateTime::now_utc();
    }

    /// Snapshot of a task's status, if the tracker knows it.
    pub fn status(&self, task_id: Uuid) -> Option<TaskStatus> {
        self.records
            .get(&task_id)
            .map(|record| TaskStatus::from(record.value()))
    }

    /// Poll until the task reaches a terminal state or `timeout` elapses.
    /// Both outcomes are an `Ok` snapshot; the caller inspects `successful`.
    pub async fn wait_for_completion(
        &self,
        task_id: Uuid,
        timeout: Duration,
    ) -> Result<TaskStatus, WaitError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.status(task_id) {
                None => return Err(WaitError::Unknown),
                Some(status) if status.ready => return Ok(status),
                Some(_) => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(WaitError::TimedOut);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Drop terminal records older than the retention window. Pending and
    /// running records are never pruned.
    pub fn prune_expired(&self) -> usize {
        let cutoff = OffsetDateTime::now_utc() - self.result_ttl;
        let before = self.records.len();
        self.records
            .retain(|_, record| !(record.state.is_terminal() && record.updated_at < cutoff));
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn tracker() -> TaskStatusTracker {
        TaskStatusTracker::default()
    }

    #[test]
    fn lifecycle_pending_to_success() {
        let tracker = tracker();
        let id = Uuid::new_v4();
        tracker.create(id);
        assert_eq!(tracker.status(id).unwrap().state, TaskState::Pending);

        tracker.mark_started(id);
        assert_eq!(tracker.status(id).unwrap().state, TaskState::Started);

        tracker.set_progress(id, 40);
        let status = tracker.status(id).unwrap();
        assert_eq!(status.state, TaskState::Progress);
        assert_eq!(status.progress, Some(40));

        tracker.mark_succeeded(id, json!({"saved_to": "x.json"}));
        let status = tracker.status(id).unwrap();
        assert!(status.ready && status.successful && !status.failed);
        assert_eq!(status.result.unwrap()["saved_to"], json!("x.json"));
    }

    #[test]
    fn terminal_state_is_final() {
        let tracker = tracker();
        let id = Uuid::new_v4();
        tracker.create(id);
        tracker.mark_started(id);
        tracker.mark_failed(id, "upstream timed out");

        tracker.mark_succeeded(id, json!({}));
        tracker.set_progress(id, 10);

        let status = tracker.status(id).unwrap();
        assert_eq!(status.state, TaskState::Failure);
        assert_eq!(status.error.as_deref(), Some("upstream timed out"));
    }

    #[test]
    fn out_of_order_transitions_are_dropped() {
        let tracker = tracker();
        let id = Uuid::new_v4();
        tracker.create(id);
        tracker.set_progress(id, 60);

        // A late STARTED must not rewind past PROGRESS.
        tracker.mark_started(id);
        let status = tracker.status(id).unwrap();
        assert_eq!(status.state, TaskState::Progress);
        assert_eq!(status.progress, Some(60));

        // Repeated progress is fine.
        tracker.set_progress(id, 80);
        assert_eq!(tracker.status(id).unwrap().progress, Some(80));
    }

    #[test]
    fn progress_is_clamped() {
        let tracker = tracker();
        let id = Uuid::new_v4();
        tracker.create(id);
        tracker.set_progress(id, 250);
        assert_eq!(tracker.status(id).unwrap().progress, Some(100));
    }

    #[test]
    fn unknown_task_has_no_status() {
        assert!(tracker().status(Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn wait_returns_once_terminal() {
        let tracker = std::sync::Arc::new(TaskStatusTracker::default());
        let id = Uuid::new_v4();
        tracker.create(id);

        let background = tracker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(80)).await;
            background.mark_started(id);
            background.mark_succeeded(id, json!({"ok": true}));
        });

        let status = tracker
            .wait_for_completion(id, Duration::from_secs(2))
            .await
            .expect("completion");
        assert!(status.successful);
    }

    #[tokio::test]
    async fn wait_times_out_on_stuck_task() {
        let tracker = tracker();
        let id = Uuid::new_v4();
        tracker.create(id);

        let outcome = tracker
            .wait_for_completion(id, Duration::from_millis(120))
            .await;
        assert_eq!(outcome, Err(WaitError::TimedOut));
    }

    #[tokio::test]
    async fn wait_for_unknown_task_errors_immediately() {
        let outcome = tracker()
            .wait_for_completion(Uuid::new_v4(), Duration::from_secs(1))
            .await;
        assert_eq!(outcome, Err(WaitError::Unknown));
    }

    #[test]
    fn prune_drops_only_stale_terminal_records() {
        let tracker = TaskStatusTracker::new(Duration::ZERO);
        let done = Uuid::new_v4();
        let running = Uuid::new_v4();
        tracker.create(done);
        tracker.create(running);
        tracker.mark_started(running);
        tracker.mark_started(done);
        tracker.mark_succeeded(done, json!({}));

        // Zero retention: the terminal record is immediately stale. The
        // running one survives regardless of age.
        std::thread::sleep(Duration::from_millis(5));
        let pruned = tracker.prune_expired();
        assert_eq!(pruned, 1);
        assert!(tracker.status(done).is_none());
        assert!(tracker.status(running).is_some());
    }
}
