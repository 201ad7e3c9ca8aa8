//! Per-fragment runtime state

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use strata_core::{CancelReason, TaskId, TaskOutcome, TerminalStatus};
use tokio_util::sync::CancellationToken;

use crate::runnable::{ExecutionContext, Runnable};

/// Admission request for one plan fragment
#[derive(Clone)]
pub struct FragmentRequest {
    pub id: TaskId,
    /// Overrides the configured liveness threshold for this fragment
    pub timeout: Option<Duration>,
    pub runnable: Arc<dyn Runnable>,
}

impl FragmentRequest {
    pub fn new(id: TaskId, runnable: Arc<dyn Runnable>) -> Self {
        Self {
            id,
            timeout: None,
            runnable,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for FragmentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentRequest")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// A registered fragment: its runnable, cancellation state, admission
/// time and, once finished, its outcome.
///
/// Shared between the registry, the worker running it and the watchdog;
/// whichever drops it last frees it.
pub struct FragmentExecution {
    id: TaskId,
    runnable: Arc<dyn Runnable>,
    token: CancellationToken,
    cancel_reason: Mutex<Option<CancelReason>>,
    admitted_at: Instant,
    admitted_wall: DateTime<Utc>,
    timeout: Duration,
    outcome: Mutex<Option<TaskOutcome>>,
}

impl FragmentExecution {
    pub fn new(id: TaskId, runnable: Arc<dyn Runnable>, timeout: Duration) -> Self {
        Self {
            id,
            runnable,
            token: CancellationToken::new(),
            cancel_reason: Mutex::new(None),
            admitted_at: Instant::now(),
            admitted_wall: Utc::now(),
            timeout,
            outcome: Mutex::new(None),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn runnable(&self) -> &Arc<dyn Runnable> {
        &self.runnable
    }

    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.id, self.token.clone())
    }

    pub fn admitted_at(&self) -> DateTime<Utc> {
        self.admitted_wall
    }

    pub fn elapsed(&self) -> Duration {
        self.admitted_at.elapsed()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the execution has outlived its timeout as of `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.admitted_at) > self.timeout
    }

    /// Request cancellation. Only the first call takes effect; it records
    /// the reason, trips the token and notifies the runnable. Returns
    /// whether this call was the first.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        {
            let mut slot = self.cancel_reason.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(reason);
        }
        self.token.cancel();
        self.runnable.on_cancel(reason);
        true
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        *self.cancel_reason.lock()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_reason.lock().is_some()
    }

    pub(crate) fn complete(&self, outcome: TaskOutcome) {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
        }
    }

    /// Terminal outcome, once the runnable has returned
    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.outcome.lock().clone()
    }

    pub fn status(&self) -> Option<TerminalStatus> {
        self.outcome.lock().as_ref().map(|o| o.status.clone())
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.lock().is_some()
    }
}

impl fmt::Debug for FragmentExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentExecution")
            .field("id", &self.id)
            .field("admitted_at", &self.admitted_wall)
            .field("timeout", &self.timeout)
            .field("cancel_reason", &self.cancel_reason())
            .field("outcome", &self.outcome())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Noop {
        cancels: AtomicUsize,
    }

    #[async_trait]
    impl Runnable for Noop {
        async fn execute(&self, _ctx: &ExecutionContext) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn on_cancel(&self, _reason: CancelReason) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_first_cancel_reason_wins() {
        let runnable = Arc::new(Noop::default());
        let execution =
            FragmentExecution::new(TaskId::new(1, 1), runnable.clone(), Duration::from_secs(60));
        let ctx = execution.context();

        assert!(execution.cancel(CancelReason::LimitReached));
        assert!(!execution.cancel(CancelReason::Timeout));
        assert!(!execution.cancel(CancelReason::UserCancel));

        assert_eq!(execution.cancel_reason(), Some(CancelReason::LimitReached));
        assert!(ctx.is_cancelled());
        assert_eq!(runnable.cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_expiry_uses_own_timeout() {
        let execution = FragmentExecution::new(
            TaskId::new(1, 2),
            Arc::new(Noop::default()),
            Duration::from_millis(100),
        );
        let start = Instant::now();

        assert!(!execution.is_expired(start));
        assert!(execution.is_expired(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_outcome_is_set_once() {
        let execution = FragmentExecution::new(
            TaskId::new(1, 3),
            Arc::new(Noop::default()),
            Duration::from_secs(1),
        );
        assert!(!execution.is_finished());

        execution.complete(TaskOutcome::succeeded(vec!["a".into()]));
        execution.complete(TaskOutcome::succeeded(vec!["b".into()]));

        assert_eq!(execution.outcome().unwrap().artifacts, vec!["a".to_string()]);
        assert_eq!(execution.status(), Some(TerminalStatus::Succeeded));
    }
}
