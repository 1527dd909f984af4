//! Task vocabulary shared by the dispatcher, tracker, and worker.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// What a background task does. Serialized into the queue message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskSpec {
    /// Look up recipes by name on TheMealDB.
    SearchRecipeByName { name: String },
    /// Fetch one random recipe from TheMealDB.
    RandomMeal,
    /// Search products on Open Food Facts.
    SearchProduct { query: String },
    /// Trivial task used by the health endpoint to prove the worker loop is
    /// consuming.
    HealthCheck,
}

impl TaskSpec {
    /// External API the task talks to. Used in audit file names.
    pub fn api(&self) -> &'static str {
        match self {
            Self::SearchRecipeByName { .. } | Self::RandomMeal => "themealdb",
            Self::SearchProduct { .. } => "openfoodfacts",
            Self::HealthCheck => "internal",
        }
    }

    /// Action label, the second audit file name component.
    pub fn action(&self) -> &'static str {
        match self {
            Self::SearchRecipeByName { .. } => "search_by_name",
            Self::RandomMeal => "random_meal",
            Self::SearchProduct { .. } => "search_product",
            Self::HealthCheck => "health_check",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::SearchRecipeByName { name } => format!("search TheMealDB for '{name}'"),
            Self::RandomMeal => "fetch a random meal from TheMealDB".to_string(),
            Self::SearchProduct { query } => format!("search Open Food Facts for '{query}'"),
            Self::HealthCheck => "worker health check".to_string(),
        }
    }
}

/// Lifecycle states. `Success` and `Failure` are terminal; transitions never
/// move backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Started,
    Progress,
    Success,
    Failure,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Started => "STARTED",
            Self::Progress => "PROGRESS",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    /// Ordering used by the tracker's monotonic-transition guard.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Started => 1,
            Self::Progress => 2,
            Self::Success | Self::Failure => 3,
        }
    }
}

/// Returned to the submitter: the handle to poll with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: Uuid,
}

/// Queue message: identity plus what to do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMessage {
    pub task_id: Uuid,
    pub spec: TaskSpec,
}

/// Tracker record for one task.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub task_id: Uuid,
    pub state: TaskState,
    pub progress: Option<u8>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub updated_at: OffsetDateTime,
}

impl TaskRecord {
    pub fn pending(task_id: Uuid) -> Self {
        Self {
            task_id,
            state: TaskState::Pending,
            progress: None,
            result: None,
            error: None,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Status snapshot as reported over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: Uuid,
    pub state: TaskState,
    pub ready: bool,
    pub successful: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&TaskRecord> for TaskStatus {
    fn from(record: &TaskRecord) -> Self {
        Self {
            task_id: record.task_id,
            state: record.state,
            ready: record.state.is_terminal(),
            successful: record.state == TaskState::Success,
            failed: record.state == TaskState::Failure,
            progress: record.progress,
            result: record.result.clone(),
            error: record.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Started.is_terminal());
        assert!(!TaskState::Progress.is_terminal());
        assert!(TaskState::Success.is_terminal());
        assert!(TaskState::Failure.is_terminal());
    }

    #[test]
    fn state_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&TaskState::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&TaskState::Success).unwrap(),
            "\"SUCCESS\""
        );
    }

    #[test]
    fn spec_labels() {
        let spec = TaskSpec::SearchRecipeByName {
            name: "soup".to_string(),
        };
        assert_eq!(spec.api(), "themealdb");
        assert_eq!(spec.action(), "search_by_name");

        let spec = TaskSpec::SearchProduct {
            query: "milk".to_string(),
        };
        assert_eq!(spec.api(), "openfoodfacts");
        assert_eq!(spec.action(), "search_product");
    }

    #[test]
    fn status_from_record_reflects_outcome() {
        let mut record = TaskRecord::pending(Uuid::new_v4());
        let status = TaskStatus::from(&record);
        assert!(!status.ready);

        record.state = TaskState::Failure;
        record.error = Some("upstream timed out".to_string());
        let status = TaskStatus::from(&record);
        assert!(status.ready);
        assert!(status.failed);
        assert!(!status.successful);
        assert_eq!(status.error.as_deref(), Some("upstream timed out"));
    }
}
