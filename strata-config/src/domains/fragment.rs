//! Fragment execution configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_nonzero_duration, validate_positive, Validatable};

/// Worker pool and watchdog tuning for the fragment manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentConfig {
    /// Number of fragments executing concurrently
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Fragments allowed to wait for a free worker before submissions are refused
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How often the watchdog scans the registry
    #[serde(with = "humantime_serde", default = "default_sweep_interval")]
    pub sweep_interval: Duration,

    /// Age after which a fragment without its own timeout is cancelled
    #[serde(with = "humantime_serde", default = "default_liveness_threshold")]
    pub liveness_threshold: Duration,
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            queue_capacity: default_queue_capacity(),
            sweep_interval: default_sweep_interval(),
            liveness_threshold: default_liveness_threshold(),
        }
    }
}

impl Validatable for FragmentConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.worker_threads, "worker_threads", self.domain_name())?;
        validate_positive(self.queue_capacity, "queue_capacity", self.domain_name())?;
        validate_nonzero_duration(self.sweep_interval, "sweep_interval", self.domain_name())?;
        validate_nonzero_duration(
            self.liveness_threshold,
            "liveness_threshold",
            self.domain_name(),
        )?;

        if self.sweep_interval > self.liveness_threshold {
            log::warn!(
                "fragment.sweep_interval ({:?}) exceeds liveness_threshold ({:?}); stale fragments will be cancelled late",
                self.sweep_interval,
                self.liveness_threshold
            );
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "fragment"
    }
}

fn default_worker_threads() -> usize {
    64
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_liveness_threshold() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_config_defaults() {
        let config = FragmentConfig::default();
        assert_eq!(config.worker_threads, 64);
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert_eq!(config.liveness_threshold, Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fragment_config_validation() {
        let mut config = FragmentConfig::default();
        config.worker_threads = 0;
        assert!(config.validate().is_err());

        let mut config = FragmentConfig::default();
        config.sweep_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_humantime_durations() {
        let config: FragmentConfig =
            serde_yaml::from_str("sweep_interval: 250ms\nliveness_threshold: 2m\n").unwrap();
        assert_eq!(config.sweep_interval, Duration::from_millis(250));
        assert_eq!(config.liveness_threshold, Duration::from_secs(120));
        assert_eq!(config.worker_threads, 64);
    }
}
