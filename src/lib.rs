//! Circuit breakers for calls to unreliable dependencies.
//!
//! One [`CircuitBreaker`] guards one dependency. Call sites hand it a primary
//! operation and, optionally, a fallback; the breaker decides whether to run
//! the primary, serve the fallback, or fail fast, and tracks consecutive
//! failures to trip open and later probe for recovery.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GuardConfig;
pub use lifecycle::Shutdown;
pub use resilience::{
    immediate, BreakerConfig, BreakerError, BreakerRegistry, BreakerSnapshot, CircuitBreaker,
    CircuitState, Operation,
};
