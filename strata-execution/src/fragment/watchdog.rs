//! Periodic sweep that cancels fragments past their liveness threshold

use std::time::{Duration, Instant};

use strata_core::CancelReason;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::manager::Registry;

pub(crate) fn spawn(
    registry: Registry,
    interval: Duration,
    stop: CancellationToken,
    handle: &Handle,
) -> JoinHandle<()> {
    handle.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(interval_ms = interval.as_millis() as u64, "fragment watchdog started");

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    sweep(&registry, Instant::now());
                }
            }
        }

        debug!("fragment watchdog stopped");
    })
}

/// Cancel every registered, not yet cancelled fragment expired as of `now`.
/// Returns how many were cancelled.
pub(crate) fn sweep(registry: &Registry, now: Instant) -> usize {
    // Collect under the lock, cancel outside it: on_cancel is foreign code.
    let expired: Vec<_> = registry
        .lock()
        .values()
        .filter(|e| !e.is_cancelled() && e.is_expired(now))
        .cloned()
        .collect();

    let mut cancelled = 0;
    for execution in expired {
        if execution.cancel(CancelReason::Timeout) {
            warn!(
                task_id = %execution.id(),
                elapsed_ms = execution.elapsed().as_millis() as u64,
                timeout_ms = execution.timeout().as_millis() as u64,
                "cancelling fragment past its liveness threshold"
            );
            cancelled += 1;
        }
    }
    cancelled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::FragmentExecution;
    use crate::runnable::{ExecutionContext, Runnable};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use strata_core::TaskId;

    struct Idle;

    #[async_trait]
    impl Runnable for Idle {
        async fn execute(&self, _ctx: &ExecutionContext) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn register(registry: &Registry, id: TaskId, timeout: Duration) -> Arc<FragmentExecution> {
        let execution = Arc::new(FragmentExecution::new(id, Arc::new(Idle), timeout));
        registry.lock().insert(id, execution.clone());
        execution
    }

    #[test]
    fn test_sweep_cancels_only_expired() {
        let registry: Registry = Arc::new(Mutex::new(HashMap::new()));
        let short = register(&registry, TaskId::new(0, 1), Duration::from_millis(10));
        let long = register(&registry, TaskId::new(0, 2), Duration::from_secs(3600));

        let later = Instant::now() + Duration::from_secs(1);
        assert_eq!(sweep(&registry, later), 1);
        assert_eq!(short.cancel_reason(), Some(CancelReason::Timeout));
        assert_eq!(long.cancel_reason(), None);

        // Already cancelled fragments are skipped on the next pass
        assert_eq!(sweep(&registry, later), 0);
    }

    #[test]
    fn test_sweep_keeps_earlier_reason() {
        let registry: Registry = Arc::new(Mutex::new(HashMap::new()));
        let execution = register(&registry, TaskId::new(0, 3), Duration::from_millis(1));
        execution.cancel(CancelReason::UserCancel);

        assert_eq!(sweep(&registry, Instant::now() + Duration::from_secs(1)), 0);
        assert_eq!(execution.cancel_reason(), Some(CancelReason::UserCancel));
    }
}
