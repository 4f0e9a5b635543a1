//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health, /health/breakers, /health/breakers/{name}
//!     → handlers.rs
//!     → BreakerRegistry::snapshots (read-only)
//!     → JSON response
//! ```
//!
//! # Design Decisions
//! - Read-only: nothing here mutates breaker state
//! - Any breaker not closed marks the service degraded (503)
//! - Hosts can mount the router or run it standalone via lifecycle::startup

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::HealthConfig;
use crate::resilience::BreakerRegistry;
use self::handlers::*;

/// Build the health router over `registry`.
#[allow(deprecated)]
pub fn router(registry: Arc<BreakerRegistry>, config: &HealthConfig) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/health/breakers", get(list_breakers))
        .route("/health/breakers/{name}", get(get_breaker))
        .with_state(registry)
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
}
