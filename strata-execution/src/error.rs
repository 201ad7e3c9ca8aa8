//! Error types for wiring an execution environment

use strata_caching::CacheError;
use strata_config::ConfigError;
use strata_core::ManagerError;
use thiserror::Error;

/// Failures while constructing an [`crate::ExecEnv`]
#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Manager error: {0}")]
    Manager(#[from] ManagerError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}
