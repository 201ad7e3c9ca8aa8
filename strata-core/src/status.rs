//! Terminal status and outcome types shared by both managers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an execution was asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// Coordinator asked for it
    UserCancel,
    /// Watchdog found the execution past its liveness threshold
    Timeout,
    /// Enough rows were produced upstream
    LimitReached,
    /// Another fragment of the same query failed
    InternalError,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::UserCancel => "user_cancel",
            CancelReason::Timeout => "timeout",
            CancelReason::LimitReached => "limit_reached",
            CancelReason::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause carried by a failed terminal status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FailureCause {
    /// The runnable returned an error
    Execution(String),
    /// The runnable panicked; the payload text is kept
    Panicked(String),
    /// The runnable stopped because cancellation was requested
    Cancelled(CancelReason),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Execution(msg) => write!(f, "execution failed: {}", msg),
            FailureCause::Panicked(msg) => write!(f, "execution panicked: {}", msg),
            FailureCause::Cancelled(reason) => write!(f, "cancelled ({})", reason),
        }
    }
}

/// Final status of a fragment or export task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Succeeded,
    Failed(FailureCause),
}

impl TerminalStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TerminalStatus::Succeeded)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TerminalStatus::Failed(FailureCause::Cancelled(_)))
    }

    /// Failure cause, if any
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            TerminalStatus::Succeeded => None,
            TerminalStatus::Failed(cause) => Some(cause),
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalStatus::Succeeded => f.write_str("succeeded"),
            TerminalStatus::Failed(cause) => write!(f, "failed: {}", cause),
        }
    }
}

/// Outcome retained for a finished task: status plus the produced artifacts
/// (export file paths, in production order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub status: TerminalStatus,
    pub artifacts: Vec<String>,
}

impl TaskOutcome {
    pub fn new(status: TerminalStatus, artifacts: Vec<String>) -> Self {
        Self { status, artifacts }
    }

    pub fn succeeded(artifacts: Vec<String>) -> Self {
        Self::new(TerminalStatus::Succeeded, artifacts)
    }

    pub fn failed(cause: FailureCause) -> Self {
        Self::new(TerminalStatus::Failed(cause), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_a_failure() {
        let status = TerminalStatus::Failed(FailureCause::Cancelled(CancelReason::Timeout));
        assert!(!status.is_success());
        assert!(status.is_cancelled());
        assert_eq!(status.to_string(), "failed: cancelled (timeout)");
    }

    #[test]
    fn test_execution_failure_is_not_cancelled() {
        let status = TerminalStatus::Failed(FailureCause::Execution("disk full".to_string()));
        assert!(!status.is_cancelled());
        assert_eq!(
            status.cause(),
            Some(&FailureCause::Execution("disk full".to_string()))
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = TaskOutcome::failed(FailureCause::Cancelled(CancelReason::UserCancel));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"]["failed"]["kind"], "cancelled");
        assert_eq!(json["status"]["failed"]["detail"], "user_cancel");
        assert!(json["artifacts"].as_array().unwrap().is_empty());
    }
}
