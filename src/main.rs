//! circuit-guard
//!
//! Loads the breaker configuration for a service's dependencies and serves
//! the read-only health surface reporting each breaker's state.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────┐
//!   guard.toml ─────▶│ config (load, validate)                       │
//!                    │      │                                        │
//!                    │      ▼                                        │
//!                    │ BreakerRegistry ── one CircuitBreaker per dep │
//!                    │      │                   ▲                    │
//!                    │      ▼                   │ call/fallback      │
//!   GET /health ────▶│ health router       service call sites       │
//!                    │                                               │
//!                    │ observability (tracing, metrics) · lifecycle  │
//!                    └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use circuit_guard::config::{load_config, validate_config, ConfigError, GuardConfig};
use circuit_guard::lifecycle::startup;
use circuit_guard::observability::logging;
use circuit_guard::resilience::BreakerRegistry;

#[derive(Parser)]
#[command(name = "circuit-guard")]
#[command(about = "Circuit breaker configuration and health surface", long_about = None)]
struct Cli {
    /// Path to the TOML config file. Built-in defaults are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `health.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Print the resolved breaker settings as JSON and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.health.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    if cli.check {
        let registry = BreakerRegistry::from_config(&config);
        println!("{}", serde_json::to_string_pretty(&registry.snapshots())?);
        return Ok(());
    }

    logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        dependencies = config.dependencies.len(),
        health_enabled = config.health.enabled,
        bind_address = %config.health.bind_address,
        "circuit-guard starting"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
