//! Structured logging setup for Strata
//!
//! Every crate in the workspace emits `tracing` events; this crate installs
//! the global subscriber according to the `logging` configuration domain.

pub mod init;

pub use init::{init_logging_from_config, init_simple_tracing};
pub use strata_config::domains::logging::{LogFormat, LogLevel, LoggingConfig};
