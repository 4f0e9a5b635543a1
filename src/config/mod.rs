//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → BreakerRegistry::from_config builds one breaker per dependency
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breakers keep their settings for the
//!   process lifetime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BreakerSettings, DependencyConfig, GuardConfig, HealthConfig, LogFormat, ObservabilityConfig,
};
pub use validation::{validate_config, ValidationError};
