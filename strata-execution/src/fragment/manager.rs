//! Registry of running plan fragments

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use strata_config::FragmentConfig;
use strata_core::{
    CancelReason, FailureCause, ManagerError, ManagerResult, TaskId, TaskOutcome,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::execution::{FragmentExecution, FragmentRequest};
use super::watchdog;
use crate::pool::WorkerPool;
use crate::report::{CompletionReport, CoordinatorReporter, ReportKind};

pub(crate) type Registry = Arc<Mutex<HashMap<TaskId, Arc<FragmentExecution>>>>;

/// Invoked exactly once per admitted fragment, after it has left the
/// registry. Never called with the registry lock held, so it may call
/// back into the manager.
pub type FinishCallback = Box<dyn FnOnce(Arc<FragmentExecution>) -> BoxFuture<'static, ()> + Send>;

/// Coordinator liveness check over a set of fragment ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchExecInfosRequest {
    pub ids: Vec<TaskId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum FragmentExecState {
    Running,
    /// Cancellation requested, runnable has not returned yet
    Cancelling(CancelReason),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentExecInfo {
    pub id: TaskId,
    pub state: FragmentExecState,
    pub admitted_at: Option<DateTime<Utc>>,
    pub elapsed: Option<Duration>,
}

impl FragmentExecInfo {
    fn not_found(id: TaskId) -> Self {
        Self {
            id,
            state: FragmentExecState::NotFound,
            admitted_at: None,
            elapsed: None,
        }
    }

    fn of(execution: &FragmentExecution) -> Self {
        let state = match execution.cancel_reason() {
            Some(reason) => FragmentExecState::Cancelling(reason),
            None => FragmentExecState::Running,
        };
        Self {
            id: execution.id(),
            state,
            admitted_at: Some(execution.admitted_at()),
            elapsed: Some(execution.elapsed()),
        }
    }
}

/// Admits plan fragments onto the worker pool, tracks them while they run
/// and cancels them on request or when they outlive their liveness
/// threshold.
pub struct FragmentManager {
    config: FragmentConfig,
    registry: Registry,
    pool: WorkerPool,
    reporter: Arc<dyn CoordinatorReporter>,
    handle: Handle,
    stop: CancellationToken,
    watchdog: Mutex<Option<JoinHandle<()>>>,
}

impl FragmentManager {
    /// Must be called from within a tokio runtime; the pool and the
    /// watchdog are spawned onto it.
    pub fn new(
        config: FragmentConfig,
        reporter: Arc<dyn CoordinatorReporter>,
    ) -> ManagerResult<Self> {
        let handle = Handle::try_current().map_err(|_| ManagerError::NoRuntime)?;
        let pool = WorkerPool::new(config.worker_threads, config.queue_capacity, handle.clone());

        Ok(Self {
            config,
            registry: Arc::new(Mutex::new(HashMap::new())),
            pool,
            reporter,
            handle,
            stop: CancellationToken::new(),
            watchdog: Mutex::new(None),
        })
    }

    /// Start the liveness watchdog. Calling it again is a no-op.
    pub fn start(&self) {
        let mut watchdog = self.watchdog.lock();
        if watchdog.is_some() || self.stop.is_cancelled() {
            return;
        }
        *watchdog = Some(watchdog::spawn(
            self.registry.clone(),
            self.config.sweep_interval,
            self.stop.clone(),
            &self.handle,
        ));
        info!(
            workers = self.config.worker_threads,
            queue_capacity = self.config.queue_capacity,
            "fragment manager started"
        );
    }

    /// Admit a fragment whose completion is pushed to the coordinator
    pub fn submit(&self, request: FragmentRequest) -> ManagerResult<()> {
        let reporter = self.reporter.clone();
        self.submit_with_callback(
            request,
            Box::new(move |execution: Arc<FragmentExecution>| {
                async move {
                    let Some(outcome) = execution.outcome() else {
                        return;
                    };
                    let report =
                        CompletionReport::new(execution.id(), ReportKind::Fragment, &outcome);
                    if let Err(e) = reporter.report(&report).await {
                        error!(task_id = %execution.id(), error = %e, "failed to report fragment completion");
                    }
                }
                .boxed()
            }),
        )
    }

    /// Admit a fragment with a caller-supplied completion callback.
    ///
    /// Fails with `DuplicateTask` if the id is already registered and with
    /// `QueueFull` / `ShuttingDown` if the pool refuses it; in every error
    /// case nothing is left registered and the callback is dropped uncalled.
    pub fn submit_with_callback(
        &self,
        request: FragmentRequest,
        callback: FinishCallback,
    ) -> ManagerResult<()> {
        let id = request.id;
        let timeout = request.timeout.unwrap_or(self.config.liveness_threshold);
        let execution = Arc::new(FragmentExecution::new(id, request.runnable, timeout));

        {
            let mut registry = self.registry.lock();
            if registry.contains_key(&id) {
                debug!(task_id = %id, "duplicate fragment submission");
                return Err(ManagerError::DuplicateTask(id));
            }

            // Offer under the lock so a refused fragment is never visible.
            let job = exec_actual(self.registry.clone(), execution.clone(), callback);
            if let Err(e) = self.pool.offer(job) {
                warn!(task_id = %id, error = %e, "fragment refused by worker pool");
                return Err(e);
            }
            registry.insert(id, execution);
        }

        info!(task_id = %id, timeout_ms = timeout.as_millis() as u64, "fragment admitted");
        Ok(())
    }

    /// Request cooperative cancellation by the coordinator
    pub fn cancel(&self, id: TaskId) -> ManagerResult<()> {
        self.cancel_with_reason(id, CancelReason::UserCancel)
    }

    /// Request cancellation with an explicit reason. Idempotent: repeated
    /// calls succeed and the first reason is kept.
    pub fn cancel_with_reason(&self, id: TaskId, reason: CancelReason) -> ManagerResult<()> {
        let execution = self
            .registry
            .lock()
            .get(&id)
            .cloned()
            .ok_or(ManagerError::NotFound(id))?;

        if execution.cancel(reason) {
            info!(task_id = %id, reason = %reason, "fragment cancellation requested");
        } else {
            debug!(task_id = %id, "fragment already cancelling");
        }
        Ok(())
    }

    /// One entry per requested id, in request order
    pub fn fetch_exec_infos(&self, request: &FetchExecInfosRequest) -> Vec<FragmentExecInfo> {
        let registry = self.registry.lock();
        request
            .ids
            .iter()
            .map(|id| match registry.get(id) {
                Some(execution) => FragmentExecInfo::of(execution),
                None => FragmentExecInfo::not_found(*id),
            })
            .collect()
    }

    pub fn running_count(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Human-readable dump of the registry for status pages
    pub fn debug_string(&self) -> String {
        let mut executions: Vec<_> = self.registry.lock().values().cloned().collect();
        executions.sort_by_key(|e| e.admitted_at());

        let mut out = format!(
            "FragmentManager: {} running, {} active workers, {} queued\n",
            executions.len(),
            self.pool.active(),
            self.pool.queued()
        );
        for execution in executions {
            let _ = writeln!(
                out,
                "  {} admitted_at={} elapsed={}ms timeout={}ms{}",
                execution.id(),
                execution
                    .admitted_at()
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
                execution.elapsed().as_millis(),
                execution.timeout().as_millis(),
                execution
                    .cancel_reason()
                    .map(|r| format!(" cancelling={}", r))
                    .unwrap_or_default()
            );
        }
        out
    }

    /// Stop the watchdog, refuse new fragments and wait for admitted ones
    /// to finish
    pub async fn shutdown(&self) {
        self.stop.cancel();
        let watchdog = self.watchdog.lock().take();
        if let Some(watchdog) = watchdog {
            if let Err(e) = watchdog.await {
                error!(error = %e, "fragment watchdog ended abnormally");
            }
        }
        self.pool.shutdown().await;
        info!("fragment manager stopped");
    }
}

impl Drop for FragmentManager {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

impl std::fmt::Debug for FragmentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentManager")
            .field("config", &self.config)
            .field("running", &self.running_count())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

/// Worker body: run the fragment, record its outcome, deregister it, then
/// hand it to the callback.
async fn exec_actual(
    registry: Registry,
    execution: Arc<FragmentExecution>,
    callback: FinishCallback,
) {
    let id = execution.id();
    let started = Instant::now();
    debug!(task_id = %id, "fragment started");

    let ctx = execution.context();
    let result = AssertUnwindSafe(execution.runnable().execute(&ctx))
        .catch_unwind()
        .await;

    let outcome = match result {
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(task_id = %id, panic = %message, "fragment panicked");
            TaskOutcome::failed(FailureCause::Panicked(message))
        }
        // A cancelled fragment's output is incomplete, whatever it returned.
        Ok(returned) => match (execution.cancel_reason(), returned) {
            (Some(reason), _) => TaskOutcome::failed(FailureCause::Cancelled(reason)),
            (None, Ok(artifacts)) => TaskOutcome::succeeded(artifacts),
            (None, Err(e)) => TaskOutcome::failed(FailureCause::Execution(format!("{:#}", e))),
        },
    };

    info!(
        task_id = %id,
        status = %outcome.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "fragment finished"
    );
    execution.complete(outcome);

    {
        let mut registry = registry.lock();
        if registry
            .get(&id)
            .is_some_and(|current| Arc::ptr_eq(current, &execution))
        {
            registry.remove(&id);
        }
    }

    // Both building the callback's future and polling it may panic.
    let finished = match std::panic::catch_unwind(AssertUnwindSafe(|| callback(execution))) {
        Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
        Err(payload) => Err(payload),
    };
    if let Err(payload) = finished {
        error!(
            task_id = %id,
            panic = %panic_message(payload.as_ref()),
            "fragment finish callback panicked"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
