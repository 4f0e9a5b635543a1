//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a dependency:
//!     → registry.rs (look up the dependency's breaker)
//!     → circuit_breaker.rs (admit, probe, or fail fast)
//!     → timeouts.rs (race the operation against the call timeout)
//!     → circuit_breaker.rs (record outcome, transition if needed)
//!     → fallback operation.rs (when skipped or failed, if supplied)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every guarded call has a deadline
//! - No retries; retry policy belongs to the caller
//! - Circuit breaker prevents cascading failures
//! - Outcomes are explicit `BreakerError` variants, not panics

pub mod circuit_breaker;
pub mod error;
pub mod operation;
pub mod registry;
pub mod timeouts;

pub use circuit_breaker::{
    BreakerConfig, BreakerSnapshot, BreakerStatsSnapshot, CircuitBreaker, CircuitState,
};
pub use error::BreakerError;
pub use operation::{immediate, Operation};
pub use registry::BreakerRegistry;
