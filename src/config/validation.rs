//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds >= 1, timeouts > 0)
//! - Detect duplicate or unnamed dependencies
//! - Check the health bind address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{BreakerSettings, GuardConfig};

/// A single semantic problem in a config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be at least 1")]
    ZeroThreshold { field: String },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: String },

    #[error("dependencies[{index}].name must not be empty")]
    EmptyName { index: usize },

    #[error("dependency `{0}` is declared more than once")]
    DuplicateDependency(String),

    #[error("health.bind_address `{0}` is not a valid socket address")]
    InvalidBindAddress(String),
}

/// Validate a parsed config, collecting every problem.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_settings("defaults", &config.defaults, &mut errors);

    let mut seen = HashSet::new();
    for (index, dependency) in config.dependencies.iter().enumerate() {
        let name = dependency.name.trim();
        if name.is_empty() {
            errors.push(ValidationError::EmptyName { index });
        } else if !seen.insert(name) {
            errors.push(ValidationError::DuplicateDependency(name.to_string()));
        }

        let prefix = format!("dependencies.{}", dependency.name);
        check_settings(&prefix, &dependency.resolve(&config.defaults), &mut errors);
    }

    if config.health.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.health.bind_address.clone(),
        ));
    }
    if config.health.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "health.request_timeout_secs".into(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_settings(prefix: &str, settings: &BreakerSettings, errors: &mut Vec<ValidationError>) {
    if settings.threshold == 0 {
        errors.push(ValidationError::ZeroThreshold {
            field: format!("{prefix}.threshold"),
        });
    }
    if settings.timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: format!("{prefix}.timeout_ms"),
        });
    }
    if settings.reset_timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: format!("{prefix}.reset_timeout_ms"),
        });
    }
}
