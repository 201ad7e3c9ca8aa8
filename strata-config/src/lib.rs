//! Domain-driven configuration management for Strata
//!
//! Configuration is split by functional domain (fragment pool and watchdog,
//! export retention, coordinator reporting, logging), each with its own
//! defaults and validation, loadable from YAML with environment overrides.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    export::ExportConfig, fragment::FragmentConfig, logging::LoggingConfig, report::ReportConfig,
    StrataConfig,
};
