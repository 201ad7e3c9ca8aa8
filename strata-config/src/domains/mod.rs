//! Domain-specific configuration modules

pub mod export;
pub mod fragment;
pub mod logging;
pub mod report;

use crate::error::ConfigResult;
use serde::{Deserialize, Serialize};

/// Main Strata configuration combining all domains
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    /// Fragment execution pool and watchdog
    #[serde(default)]
    pub fragment: fragment::FragmentConfig,

    /// Export outcome retention
    #[serde(default)]
    pub export: export::ExportConfig,

    /// Coordinator completion reports
    #[serde(default)]
    pub report: report::ReportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl StrataConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        crate::validation::validate_config(self)
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = StrataConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
