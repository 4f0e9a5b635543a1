//! One breaker per named dependency.

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::GuardConfig;
use crate::resilience::circuit_breaker::{
    duration_ms, BreakerConfig, BreakerSnapshot, CircuitBreaker,
};

/// Concurrent map of dependency name to its breaker.
///
/// Breakers are never replaced once registered, so every call site guarding
/// the same dependency shares one failure count.
#[derive(Debug)]
pub struct BreakerRegistry {
    defaults: BreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Empty registry; breakers created on demand use `defaults`.
    pub fn new(defaults: BreakerConfig) -> Self {
        Self {
            defaults,
            breakers: DashMap::new(),
        }
    }

    /// Registry with every configured dependency pre-registered.
    pub fn from_config(config: &GuardConfig) -> Self {
        let registry = Self::new(config.defaults.to_breaker_config());

        for dependency in &config.dependencies {
            let settings = dependency.resolve(&config.defaults);
            registry.register(&dependency.name, settings.to_breaker_config());
        }

        registry
    }

    /// Register `name` with explicit settings. An existing breaker is kept
    /// and returned unchanged.
    pub fn register(&self, name: &str, config: BreakerConfig) -> Arc<CircuitBreaker> {
        let entry = self.breakers.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(
                breaker = name,
                threshold = config.threshold,
                timeout_ms = duration_ms(config.timeout),
                reset_timeout_ms = duration_ms(config.reset_timeout),
                "Breaker registered"
            );
            Arc::new(CircuitBreaker::new(name, config))
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Existing breaker for `name`, or a new one built from the defaults.
    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        self.register(name, self.defaults)
    }

    /// Snapshots of every breaker, sorted by name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}
