//! Coordinator report delivery configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};

/// Retry behaviour for completion reports pushed to the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Attempts per report, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts
    #[serde(with = "humantime_serde", default = "default_retry_interval")]
    pub retry_interval: Duration,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_interval: default_retry_interval(),
        }
    }
}

impl Validatable for ReportConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.max_attempts, "max_attempts", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "report"
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_interval() -> Duration {
    Duration::from_millis(500)
}
