//! Metrics collection.
//!
//! # Responsibilities
//! - Define breaker metrics (calls, rejections, fallbacks, transitions)
//! - Record them through the `metrics` facade
//!
//! # Metrics
//! - `circuit_breaker_calls_total` (counter): admitted calls by breaker, outcome
//! - `circuit_breaker_rejections_total` (counter): fail-fast calls by breaker
//! - `circuit_breaker_fallbacks_total` (counter): fallbacks served by breaker, reason
//! - `circuit_breaker_transitions_total` (counter): transitions by breaker, from, to
//! - `circuit_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! # Design Decisions
//! - No recorder is installed here; the host picks an exporter
//! - Without a recorder every call is a no-op

use metrics::{counter, gauge};

use crate::resilience::CircuitState;

pub fn record_call(breaker: &str, outcome: &'static str) {
    counter!(
        "circuit_breaker_calls_total",
        "breaker" => breaker.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_rejection(breaker: &str) {
    counter!("circuit_breaker_rejections_total", "breaker" => breaker.to_string()).increment(1);
}

pub fn record_fallback(breaker: &str, reason: &'static str) {
    counter!(
        "circuit_breaker_fallbacks_total",
        "breaker" => breaker.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_transition(breaker: &str, from: CircuitState, to: CircuitState) {
    counter!(
        "circuit_breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
    record_state(breaker, to);
}

pub fn record_state(breaker: &str, state: CircuitState) {
    gauge!("circuit_breaker_state", "breaker" => breaker.to_string()).set(state.as_gauge());
}
