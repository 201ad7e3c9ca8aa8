#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use strata_config::FragmentConfig;
use strata_execution::{
    CancelReason, CompletionReport, CoordinatorReporter, ExecutionContext, ReportError,
    Runnable,
};
use tokio::sync::{Notify, Semaphore};

pub fn init_tracing() {
    let _ = strata_logging::init_simple_tracing("debug");
}

pub fn fragment_config() -> FragmentConfig {
    FragmentConfig {
        worker_threads: 4,
        queue_capacity: 16,
        sweep_interval: Duration::from_millis(20),
        liveness_threshold: Duration::from_secs(30),
    }
}

/// Poll `cond` until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

/// Finishes immediately with the given artifacts
pub struct Immediate(pub Vec<String>);

#[async_trait]
impl Runnable for Immediate {
    async fn execute(&self, _ctx: &ExecutionContext) -> anyhow::Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Blocks until the gate opens or cancellation is requested
pub struct Gated {
    pub gate: Arc<Semaphore>,
    pub started: Arc<Notify>,
    pub artifacts: Vec<String>,
    pub cancels: Arc<AtomicUsize>,
}

impl Gated {
    pub fn new(artifacts: &[&str]) -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            started: Arc::new(Notify::new()),
            artifacts: artifacts.iter().map(|a| a.to_string()).collect(),
            cancels: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn open(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl Runnable for Gated {
    async fn execute(&self, ctx: &ExecutionContext) -> anyhow::Result<Vec<String>> {
        self.started.notify_one();
        tokio::select! {
            permit = self.gate.acquire() => {
                permit?.forget();
                Ok(self.artifacts.clone())
            }
            _ = ctx.cancelled() => anyhow::bail!("interrupted"),
        }
    }

    fn on_cancel(&self, _reason: CancelReason) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Works in small steps, checking for cancellation between them
pub struct Stepper {
    pub steps: usize,
    pub step: Duration,
}

#[async_trait]
impl Runnable for Stepper {
    async fn execute(&self, ctx: &ExecutionContext) -> anyhow::Result<Vec<String>> {
        for i in 0..self.steps {
            if ctx.is_cancelled() {
                return Ok(vec![format!("partial-{}", i)]);
            }
            tokio::time::sleep(self.step).await;
        }
        Ok(vec!["complete".to_string()])
    }
}

pub struct Failing(pub &'static str);

#[async_trait]
impl Runnable for Failing {
    async fn execute(&self, _ctx: &ExecutionContext) -> anyhow::Result<Vec<String>> {
        anyhow::bail!(self.0)
    }
}

pub struct Panicking;

#[async_trait]
impl Runnable for Panicking {
    async fn execute(&self, _ctx: &ExecutionContext) -> anyhow::Result<Vec<String>> {
        panic!("boom in operator");
    }
}

/// Records every report it receives
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<CompletionReport>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<CompletionReport> {
        self.reports.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub async fn wait_for(&self, count: usize) -> Vec<CompletionReport> {
        assert!(
            wait_until(Duration::from_secs(5), || self.len() >= count).await,
            "expected {} reports, got {}",
            count,
            self.len()
        );
        self.reports()
    }
}

#[async_trait]
impl CoordinatorReporter for RecordingReporter {
    async fn report(&self, report: &CompletionReport) -> Result<(), ReportError> {
        self.reports.lock().push(report.clone());
        Ok(())
    }
}
