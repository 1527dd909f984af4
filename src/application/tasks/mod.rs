//! Background task dispatch, tracking, and execution.

pub mod queue;
pub mod tracker;
pub mod types;
pub mod worker;

pub use queue::TaskQueue;
pub use tracker::{TaskStatusTracker, WaitError};
pub use types::{TaskHandle, TaskMessage, TaskSpec, TaskState, TaskStatus};
pub use worker::{WorkerContext, process_external_api_task};
