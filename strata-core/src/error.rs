//! Core error types for Strata

use thiserror::Error;

use crate::id::TaskId;

/// Errors returned synchronously by manager operations.
///
/// Execution-time failures never show up here; they are carried as a
/// [`crate::FailureCause`] inside the task's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// The id is already tracked (running, or retained as an outcome)
    #[error("Duplicate task: {0}")]
    DuplicateTask(TaskId),

    /// The id is not tracked in the state the operation needs.
    /// Covers ids never submitted, evicted from retention and erased.
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    /// Every worker is busy and the admission queue is full
    #[error("Worker pool queue is full ({capacity} waiting)")]
    QueueFull { capacity: usize },

    /// Submission after shutdown began
    #[error("Manager is shutting down")]
    ShuttingDown,

    /// Constructed outside a tokio runtime
    #[error("No tokio runtime available")]
    NoRuntime,
}

impl ManagerError {
    /// Whether the error is an admission/lookup miss the coordinator may
    /// treat as idempotent success
    pub fn is_not_found(&self) -> bool {
        matches!(self, ManagerError::NotFound(_))
    }
}

/// Result type alias for manager operations
pub type ManagerResult<T> = std::result::Result<T, ManagerError>;

/// Errors pushing a completion report to the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// Connection-level failure, worth another attempt
    #[error("Report transport error: {0}")]
    Transport(String),

    /// The coordinator refused the report
    #[error("Report rejected by coordinator: {0}")]
    Rejected(String),
}

impl ReportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReportError::Transport(_))
    }
}

/// Parsing errors for core types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid task id: {0}")]
    InvalidTaskId(String),
}
