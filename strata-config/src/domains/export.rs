//! Export task retention configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};

/// Capacities of the two outcome caches kept by the export manager.
///
/// Successes and failures are bounded separately so a burst of one kind
/// cannot push the other out before the coordinator polls it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    #[serde(default = "default_cache_capacity")]
    pub success_cache_capacity: usize,

    #[serde(default = "default_cache_capacity")]
    pub failure_cache_capacity: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            success_cache_capacity: default_cache_capacity(),
            failure_cache_capacity: default_cache_capacity(),
        }
    }
}

impl Validatable for ExportConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.success_cache_capacity,
            "success_cache_capacity",
            self.domain_name(),
        )?;
        validate_positive(
            self.failure_cache_capacity,
            "failure_cache_capacity",
            self.domain_name(),
        )?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "export"
    }
}

fn default_cache_capacity() -> usize {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_config_validation() {
        let mut config = ExportConfig::default();
        assert!(config.validate().is_ok());

        config.failure_cache_capacity = 0;
        assert!(config.validate().is_err());
    }
}
