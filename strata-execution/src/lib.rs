//! Execution lifecycle for Strata backends
//!
//! [`FragmentManager`] admits plan fragments onto a bounded worker pool,
//! tracks them in a registry while they run and cancels them on request or
//! when a watchdog finds them past their liveness threshold.
//! [`ExportTaskManager`] runs export tasks through it and retains recent
//! outcomes for polling. Both push completions to the coordinator through a
//! [`CoordinatorReporter`].

pub mod env;
pub mod error;
pub mod export;
pub mod fragment;
pub mod pool;
pub mod report;
pub mod runnable;

pub use env::ExecEnv;
pub use error::EnvError;
pub use export::{ExportCacheStats, ExportTaskManager, ExportTaskRequest, ExportTaskState};
pub use fragment::{
    FetchExecInfosRequest, FinishCallback, FragmentExecInfo, FragmentExecState,
    FragmentExecution, FragmentManager, FragmentRequest,
};
pub use pool::WorkerPool;
pub use report::{
    CompletionReport, CoordinatorReporter, ReportKind, RetryingReporter, TracingReporter,
};
pub use runnable::{ExecutionContext, Runnable};

pub use strata_core::{
    CancelReason, FailureCause, ManagerError, ManagerResult, ReportError, TaskId, TaskOutcome,
    TerminalStatus,
};
