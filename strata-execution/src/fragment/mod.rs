//! Plan fragment admission, execution and liveness tracking

mod execution;
mod manager;
mod watchdog;

pub use execution::{FragmentExecution, FragmentRequest};
pub use manager::{
    FetchExecInfosRequest, FinishCallback, FragmentExecInfo, FragmentExecState, FragmentManager,
};
