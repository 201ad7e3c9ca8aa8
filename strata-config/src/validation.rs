//! Configuration validation traits and utilities

use std::time::Duration;

use crate::domains::StrataConfig;
use crate::error::{ConfigError, ConfigResult};

/// Trait for validatable configuration
pub trait Validatable {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;

    /// Helper to create a domain-specific validation error
    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Validate a positive number
pub fn validate_positive<T>(value: T, field_name: &str, domain: &str) -> ConfigResult<()>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value <= T::default() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0, got {}", field_name, value),
        });
    }
    Ok(())
}

/// Validate a duration is non-zero
pub fn validate_nonzero_duration(value: Duration, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.is_zero() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be a non-zero duration", field_name),
        });
    }
    Ok(())
}

/// Validate a complete configuration object
pub fn validate_config(config: &StrataConfig) -> ConfigResult<()> {
    config.fragment.validate()?;
    config.export.validate()?;
    config.report.validate()?;
    config.logging.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(1usize, "workers", "fragment").is_ok());

        let err = validate_positive(0usize, "workers", "fragment").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Domain configuration error in fragment: workers must be greater than 0, got 0"
        );
    }

    #[test]
    fn test_validate_nonzero_duration() {
        assert!(validate_nonzero_duration(Duration::from_millis(1), "interval", "fragment").is_ok());
        assert!(validate_nonzero_duration(Duration::ZERO, "interval", "fragment").is_err());
    }
}
