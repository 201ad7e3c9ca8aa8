//! Tracks export tasks from admission to a retained terminal outcome

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use strata_caching::{CacheResult, CacheStats, LruCache};
use strata_config::ExportConfig;
use strata_core::{
    FailureCause, ManagerError, ManagerResult, TaskId, TaskOutcome, TerminalStatus,
};
use tracing::{debug, error, info, warn};

use crate::fragment::{FragmentExecution, FragmentManager, FragmentRequest};
use crate::report::{CompletionReport, CoordinatorReporter, ReportKind};

/// Start request for an export; the task id is the fragment's id
#[derive(Debug, Clone)]
pub struct ExportTaskRequest {
    pub fragment: FragmentRequest,
}

impl ExportTaskRequest {
    pub fn new(fragment: FragmentRequest) -> Self {
        Self { fragment }
    }

    pub fn id(&self) -> TaskId {
        self.fragment.id
    }
}

/// What the coordinator sees when it polls an export
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "outcome")]
pub enum ExportTaskState {
    Running,
    Succeeded(TaskOutcome),
    Failed(TaskOutcome),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportCacheStats {
    pub success: CacheStats,
    pub failed: CacheStats,
}

/// An id lives in at most one of `running`, `success` and `failed`.
/// Running entries carry the attempt that started them so a late
/// completion of an erased attempt can't land in a restarted task.
struct ExportState {
    running: HashMap<TaskId, u64>,
    success: LruCache<TaskId, TaskOutcome>,
    failed: LruCache<TaskId, TaskOutcome>,
    next_attempt: u64,
}

struct Inner {
    state: Mutex<ExportState>,
    reporter: Arc<dyn CoordinatorReporter>,
}

impl Inner {
    /// Move a running task into the retention cache matching its status.
    /// With `attempt` set, only that attempt may be committed.
    fn finish(&self, id: TaskId, attempt: Option<u64>, outcome: TaskOutcome) -> ManagerResult<()> {
        let mut state = self.state.lock();
        match state.running.get(&id) {
            Some(&current) if attempt.map_or(true, |a| a == current) => {}
            _ => return Err(ManagerError::NotFound(id)),
        }
        state.running.remove(&id);

        let succeeded = outcome.status.is_success();
        let evicted = if succeeded {
            state.success.put(id, outcome)
        } else {
            state.failed.put(id, outcome)
        };
        if let Some((evicted, _)) = evicted {
            debug!(task_id = %evicted, succeeded, "evicted retained export outcome");
        }
        Ok(())
    }

    async fn finalize(&self, execution: Arc<FragmentExecution>, attempt: Option<u64>) {
        let id = execution.id();
        let outcome = execution.outcome().unwrap_or_else(|| {
            TaskOutcome::failed(FailureCause::Execution(
                "export finished without an outcome".to_string(),
            ))
        });
        let report = CompletionReport::new(id, ReportKind::Export, &outcome);

        // Commit before reporting so a poll triggered by the report sees it.
        if self.finish(id, attempt, outcome).is_err() {
            warn!(task_id = %id, "export no longer running, dropping its outcome");
            return;
        }
        info!(task_id = %id, status = %report.status, files = report.artifacts.len(), "export task finished");

        if let Err(e) = self.reporter.report(&report).await {
            error!(task_id = %id, error = %e, "failed to report export completion");
        }
    }
}

/// Runs export tasks through the fragment manager and keeps bounded
/// histories of succeeded and failed outcomes for the coordinator to poll.
pub struct ExportTaskManager {
    inner: Arc<Inner>,
    fragments: Arc<FragmentManager>,
}

impl ExportTaskManager {
    pub fn new(
        config: &ExportConfig,
        fragments: Arc<FragmentManager>,
        reporter: Arc<dyn CoordinatorReporter>,
    ) -> CacheResult<Self> {
        let state = ExportState {
            running: HashMap::new(),
            success: LruCache::new(config.success_cache_capacity)?,
            failed: LruCache::new(config.failure_cache_capacity)?,
            next_attempt: 0,
        };
        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                reporter,
            }),
            fragments,
        })
    }

    /// Admit an export. Refused with `DuplicateTask` while the id is
    /// running or still has a retained outcome; erase it first to reuse it.
    pub fn start_task(&self, request: ExportTaskRequest) -> ManagerResult<()> {
        let id = request.id();

        // Held across the fragment submission: an id visible in `running`
        // always has a registered fragment for cancel and erase to reach.
        // The finish callback only takes this lock after the fragment has
        // left the registry, so the order export -> registry never inverts.
        let mut state = self.inner.state.lock();
        if state.running.contains_key(&id)
            || state.success.contains(&id)
            || state.failed.contains(&id)
        {
            debug!(task_id = %id, "duplicate export task");
            return Err(ManagerError::DuplicateTask(id));
        }
        let attempt = state.next_attempt + 1;

        let inner = self.inner.clone();
        let submitted = self.fragments.submit_with_callback(
            request.fragment,
            Box::new(move |execution: Arc<FragmentExecution>| {
                async move { inner.finalize(execution, Some(attempt)).await }.boxed()
            }),
        );
        if let Err(e) = submitted {
            warn!(task_id = %id, error = %e, "export task not admitted");
            return Err(e);
        }

        state.next_attempt = attempt;
        state.running.insert(id, attempt);
        drop(state);

        info!(task_id = %id, attempt, "export task started");
        Ok(())
    }

    /// Cancel a running export. It still reaches a terminal state (failed,
    /// cancelled) through its finish callback.
    pub fn cancel_task(&self, id: TaskId) -> ManagerResult<()> {
        if !self.inner.state.lock().running.contains_key(&id) {
            return Err(ManagerError::NotFound(id));
        }
        match self.fragments.cancel(id) {
            Ok(()) => Ok(()),
            // Fragment already left the registry; its outcome is being committed
            Err(e) if e.is_not_found() => {
                debug!(task_id = %id, "export fragment already finished");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Forget an export in whatever state it is. A running export is also
    /// cancelled and its eventual outcome discarded.
    pub fn erase_task(&self, id: TaskId) -> ManagerResult<()> {
        let was_running = {
            let mut state = self.inner.state.lock();
            if state.running.remove(&id).is_some() {
                true
            } else if state.success.remove(&id).is_some() || state.failed.remove(&id).is_some() {
                false
            } else {
                return Err(ManagerError::NotFound(id));
            }
        };

        if was_running {
            if let Err(e) = self.fragments.cancel(id) {
                debug!(task_id = %id, error = %e, "erased export had no live fragment");
            }
        }
        info!(task_id = %id, was_running, "export task erased");
        Ok(())
    }

    /// Commit a terminal outcome for a running export
    pub fn finish_task(
        &self,
        id: TaskId,
        status: TerminalStatus,
        files: Vec<String>,
    ) -> ManagerResult<()> {
        self.inner.finish(id, None, TaskOutcome::new(status, files))
    }

    /// Polling a retained outcome refreshes its recency
    pub fn get_task_state(&self, id: TaskId) -> ManagerResult<ExportTaskState> {
        let mut state = self.inner.state.lock();
        if state.running.contains_key(&id) {
            return Ok(ExportTaskState::Running);
        }
        // Only the cache holding the id is touched, so polls don't skew the
        // other cache's hit rate.
        if state.success.contains(&id) {
            if let Some(outcome) = state.success.get(&id) {
                return Ok(ExportTaskState::Succeeded(outcome.clone()));
            }
        } else if state.failed.contains(&id) {
            if let Some(outcome) = state.failed.get(&id) {
                return Ok(ExportTaskState::Failed(outcome.clone()));
            }
        }
        Err(ManagerError::NotFound(id))
    }

    /// Commit a finished fragment's outcome and report it. Normally invoked
    /// by the finish callback installed in `start_task`.
    pub async fn finalize_task(&self, execution: Arc<FragmentExecution>) {
        self.inner.finalize(execution, None).await
    }

    pub fn running_count(&self) -> usize {
        self.inner.state.lock().running.len()
    }

    pub fn cache_stats(&self) -> ExportCacheStats {
        let state = self.inner.state.lock();
        ExportCacheStats {
            success: state.success.stats(),
            failed: state.failed.stats(),
        }
    }
}

impl std::fmt::Debug for ExportTaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ExportTaskManager")
            .field("running", &state.running.len())
            .field("succeeded", &state.success.len())
            .field("failed", &state.failed.len())
            .finish()
    }
}
