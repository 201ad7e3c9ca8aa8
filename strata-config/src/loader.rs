//! Configuration loading and environment variable handling

use log::debug;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::export::ExportConfig;
use crate::domains::fragment::FragmentConfig;
use crate::domains::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::domains::report::ReportConfig;
use crate::domains::StrataConfig;
use crate::error::{ConfigError, ConfigResult};

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "STRATA".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<StrataConfig> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let mut config: StrataConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<StrataConfig> {
        let mut config = StrataConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<StrataConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut StrataConfig) -> ConfigResult<()> {
        self.apply_fragment_overrides(&mut config.fragment)?;
        self.apply_export_overrides(&mut config.export)?;
        self.apply_report_overrides(&mut config.report)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_fragment_overrides(&self, config: &mut FragmentConfig) -> ConfigResult<()> {
        if let Some(threads) = self.parse_env_var("FRAGMENT_WORKER_THREADS")? {
            config.worker_threads = threads;
        }

        if let Some(capacity) = self.parse_env_var("FRAGMENT_QUEUE_CAPACITY")? {
            config.queue_capacity = capacity;
        }

        if let Some(interval) = self.duration_env_var("FRAGMENT_SWEEP_INTERVAL")? {
            config.sweep_interval = interval;
        }

        if let Some(threshold) = self.duration_env_var("FRAGMENT_LIVENESS_THRESHOLD")? {
            config.liveness_threshold = threshold;
        }

        Ok(())
    }

    fn apply_export_overrides(&self, config: &mut ExportConfig) -> ConfigResult<()> {
        if let Some(capacity) = self.parse_env_var("EXPORT_SUCCESS_CACHE_CAPACITY")? {
            config.success_cache_capacity = capacity;
        }

        if let Some(capacity) = self.parse_env_var("EXPORT_FAILURE_CACHE_CAPACITY")? {
            config.failure_cache_capacity = capacity;
        }

        Ok(())
    }

    fn apply_report_overrides(&self, config: &mut ReportConfig) -> ConfigResult<()> {
        if let Some(attempts) = self.parse_env_var("REPORT_MAX_ATTEMPTS")? {
            config.max_attempts = attempts;
        }

        Ok(())
    }

    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Read and parse a prefixed variable; unset yields `None`
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Read a prefixed variable in humantime form ("500ms", "2m")
    fn duration_env_var(&self, name: &str) -> ConfigResult<Option<Duration>> {
        match self.get_env_var(name) {
            Ok(raw) => humantime::parse_duration(&raw)
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
