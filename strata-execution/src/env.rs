//! Process-wide execution environment

use std::sync::Arc;

use strata_config::StrataConfig;
use tracing::info;

use crate::error::EnvError;
use crate::export::ExportTaskManager;
use crate::fragment::FragmentManager;
use crate::report::{CoordinatorReporter, RetryingReporter};

/// Owns both managers and the shared reporter. Built once at startup
/// from the loaded configuration and shut down in reverse order.
#[derive(Debug)]
pub struct ExecEnv {
    fragments: Arc<FragmentManager>,
    exports: ExportTaskManager,
}

impl ExecEnv {
    /// Validate `config`, wrap `reporter` with retries and start the
    /// fragment watchdog. Must be called within a tokio runtime.
    pub fn from_config(
        config: &StrataConfig,
        reporter: Arc<dyn CoordinatorReporter>,
    ) -> Result<Self, EnvError> {
        config.validate_all()?;

        let reporter: Arc<dyn CoordinatorReporter> =
            Arc::new(RetryingReporter::new(reporter, config.report.clone()));

        let fragments = Arc::new(FragmentManager::new(
            config.fragment.clone(),
            reporter.clone(),
        )?);
        let exports = ExportTaskManager::new(&config.export, fragments.clone(), reporter)?;
        fragments.start();

        info!("execution environment ready");
        Ok(Self { fragments, exports })
    }

    pub fn fragment_manager(&self) -> &Arc<FragmentManager> {
        &self.fragments
    }

    pub fn export_task_manager(&self) -> &ExportTaskManager {
        &self.exports
    }

    /// Stop admitting work and wait for everything in flight to finish
    pub async fn shutdown(&self) {
        info!(
            running_fragments = self.fragments.running_count(),
            running_exports = self.exports.running_count(),
            "shutting down execution environment"
        );
        self.fragments.shutdown().await;
    }
}
