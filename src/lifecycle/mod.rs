//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → BreakerRegistry → bind health listener → serve
//!
//! Shutdown (shutdown.rs):
//!     Trigger → health server stops accepting → in-flight requests drain
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then breakers, then listener
//! - Breaker state is in-memory only; a restart starts every breaker closed

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
