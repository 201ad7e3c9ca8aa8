//! The opaque unit of work driven by the managers

use async_trait::async_trait;
use strata_core::{CancelReason, TaskId};
use tokio_util::sync::CancellationToken;

/// Handle a runnable uses to learn its identity and observe cancellation.
///
/// Cancellation is cooperative: nothing interrupts `execute`, the runnable
/// is expected to check [`is_cancelled`](ExecutionContext::is_cancelled) at
/// its own safe points or race its work against
/// [`cancelled`](ExecutionContext::cancelled).
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    id: TaskId,
    token: CancellationToken,
}

impl ExecutionContext {
    pub fn new(id: TaskId, token: CancellationToken) -> Self {
        Self { id, token }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Capability the managers need from an execution engine.
///
/// The plan interpreter behind a fragment (or the writer behind an export)
/// implements this; the managers never look further inside.
#[async_trait]
pub trait Runnable: Send + Sync {
    /// Drive the work to completion and return the produced artifact ids
    /// (for exports, the written file paths).
    async fn execute(&self, ctx: &ExecutionContext) -> anyhow::Result<Vec<String>>;

    /// Called once, right after cancellation is first requested
    fn on_cancel(&self, _reason: CancelReason) {}
}
