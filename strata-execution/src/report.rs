//! Pushing terminal outcomes to the coordinator

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use strata_config::ReportConfig;
use strata_core::{ReportError, TaskId, TaskOutcome, TerminalStatus};
use tracing::{info, warn};

/// Which manager produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Fragment,
    Export,
}

/// Completion message sent once per finished execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionReport {
    pub id: TaskId,
    pub kind: ReportKind,
    pub status: TerminalStatus,
    pub artifacts: Vec<String>,
}

impl CompletionReport {
    pub fn new(id: TaskId, kind: ReportKind, outcome: &TaskOutcome) -> Self {
        Self {
            id,
            kind,
            status: outcome.status.clone(),
            artifacts: outcome.artifacts.clone(),
        }
    }
}

/// Outbound channel to the coordinator
#[async_trait]
pub trait CoordinatorReporter: Send + Sync {
    async fn report(&self, report: &CompletionReport) -> Result<(), ReportError>;
}

#[async_trait]
impl<T: CoordinatorReporter + ?Sized> CoordinatorReporter for Arc<T> {
    async fn report(&self, report: &CompletionReport) -> Result<(), ReportError> {
        (**self).report(report).await
    }
}

/// Reporter that only records reports in the log.
///
/// Used when no coordinator endpoint is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

#[async_trait]
impl CoordinatorReporter for TracingReporter {
    async fn report(&self, report: &CompletionReport) -> Result<(), ReportError> {
        info!(
            task_id = %report.id,
            kind = ?report.kind,
            status = %report.status,
            artifacts = report.artifacts.len(),
            "completion report"
        );
        Ok(())
    }
}

/// Retries transport failures of the wrapped reporter with a fixed pause
/// between attempts. Rejections are returned immediately.
#[derive(Debug)]
pub struct RetryingReporter<R> {
    inner: R,
    config: ReportConfig,
}

impl<R> RetryingReporter<R> {
    pub fn new(inner: R, config: ReportConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<R: CoordinatorReporter> CoordinatorReporter for RetryingReporter<R> {
    async fn report(&self, report: &CompletionReport) -> Result<(), ReportError> {
        let mut attempt = 1;
        loop {
            match self.inner.report(report).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    warn!(
                        task_id = %report.id,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "report failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_interval).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Flaky {
        calls: AtomicU32,
        failures: u32,
        error: ReportError,
    }

    #[async_trait]
    impl CoordinatorReporter for Flaky {
        async fn report(&self, _report: &CompletionReport) -> Result<(), ReportError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(self.error.clone())
            } else {
                Ok(())
            }
        }
    }

    fn config(max_attempts: u32) -> ReportConfig {
        ReportConfig {
            max_attempts,
            retry_interval: Duration::from_millis(1),
        }
    }

    fn sample() -> CompletionReport {
        CompletionReport::new(
            TaskId::new(1, 2),
            ReportKind::Export,
            &TaskOutcome::succeeded(vec!["/out/part-0".to_string()]),
        )
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried() {
        let reporter = RetryingReporter::new(
            Flaky {
                calls: AtomicU32::new(0),
                failures: 2,
                error: ReportError::Transport("connection reset".into()),
            },
            config(3),
        );

        assert!(reporter.report(&sample()).await.is_ok());
        assert_eq!(reporter.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let reporter = RetryingReporter::new(
            Flaky {
                calls: AtomicU32::new(0),
                failures: 10,
                error: ReportError::Transport("connection refused".into()),
            },
            config(3),
        );

        let result = reporter.report(&sample()).await;
        assert!(matches!(result, Err(ReportError::Transport(_))));
        assert_eq!(reporter.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let reporter = RetryingReporter::new(
            Flaky {
                calls: AtomicU32::new(0),
                failures: 10,
                error: ReportError::Rejected("unknown query".into()),
            },
            config(5),
        );

        let result = reporter.report(&sample()).await;
        assert_eq!(result, Err(ReportError::Rejected("unknown query".into())));
        assert_eq!(reporter.inner.calls.load(Ordering::SeqCst), 1);
    }
}
