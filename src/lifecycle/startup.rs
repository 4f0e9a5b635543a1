//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the breaker registry from a validated config
//! - Bind the health listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when breakers exist)

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::{GuardConfig, HealthConfig};
use crate::health;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::resilience::BreakerRegistry;

/// Run the guard until a termination signal arrives.
pub async fn run(config: GuardConfig) -> Result<(), std::io::Error> {
    let registry = Arc::new(BreakerRegistry::from_config(&config));
    for snapshot in registry.snapshots() {
        tracing::info!(
            breaker = %snapshot.name,
            threshold = snapshot.threshold,
            timeout_ms = snapshot.timeout_ms,
            reset_timeout_ms = snapshot.reset_timeout_ms,
            "Guarding dependency"
        );
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    if !config.health.enabled {
        tracing::info!("Health surface disabled");
        shutdown.wait().await;
        return Ok(());
    }

    let listener = TcpListener::bind(&config.health.bind_address).await?;
    serve(listener, registry, &config.health, shutdown).await
}

/// Serve the health router on `listener` until `shutdown` triggers.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<BreakerRegistry>,
    config: &HealthConfig,
    shutdown: Shutdown,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, dependencies = registry.len(), "Health server starting");

    let app = health::router(registry, config);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.wait())
        .await?;

    tracing::info!("Health server stopped");
    Ok(())
}
