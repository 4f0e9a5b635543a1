//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::BreakerConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Health surface settings.
    pub health: HealthConfig,

    /// Breaker settings for dependencies without overrides.
    pub defaults: BreakerSettings,

    /// Guarded dependencies, one breaker each.
    pub dependencies: Vec<DependencyConfig>,
}

/// Breaker settings as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Call timeout in milliseconds.
    pub timeout_ms: u64,

    /// Consecutive failures before the breaker opens.
    pub threshold: u32,

    /// Time an open breaker waits before probing, in milliseconds.
    pub reset_timeout_ms: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 3000,
            threshold: 5,
            reset_timeout_ms: 60_000,
        }
    }
}

impl BreakerSettings {
    pub fn to_breaker_config(&self) -> BreakerConfig {
        BreakerConfig::new(
            Duration::from_millis(self.timeout_ms),
            self.threshold,
            Duration::from_millis(self.reset_timeout_ms),
        )
    }
}

/// A guarded dependency. Unset fields fall back to `[defaults]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DependencyConfig {
    /// Unique dependency identifier.
    pub name: String,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub threshold: Option<u32>,

    #[serde(default)]
    pub reset_timeout_ms: Option<u64>,
}

impl DependencyConfig {
    /// Settings with this dependency's overrides applied over `defaults`.
    pub fn resolve(&self, defaults: &BreakerSettings) -> BreakerSettings {
        BreakerSettings {
            timeout_ms: self.timeout_ms.unwrap_or(defaults.timeout_ms),
            threshold: self.threshold.unwrap_or(defaults.threshold),
            reset_timeout_ms: self.reset_timeout_ms.unwrap_or(defaults.reset_timeout_ms),
        }
    }
}

/// Health surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Serve the health endpoints.
    pub enabled: bool,

    /// Bind address (e.g., "127.0.0.1:8081").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
            request_timeout_secs: 5,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Pretty for development, JSON for log aggregation.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
