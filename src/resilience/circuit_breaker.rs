//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast or get the fallback
//! - Half-Open: a single probe is testing whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Half-Open: first call at or after next_attempt_at
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails (new reset window)
//! ```
//!
//! # Design Decisions
//! - Per-dependency circuit breaker (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - Single probe in Half-Open; concurrent callers are rejected like Open
//! - All state lives in one mutex-guarded record, never locked across `.await`
//!
//! # Example
//!
//! ```rust,ignore
//! use circuit_guard::resilience::{BreakerConfig, CircuitBreaker};
//!
//! let breaker = CircuitBreaker::new("token-verifier", BreakerConfig::default());
//!
//! let claims = breaker
//!     .call_with_fallback(|| verifier.verify(token), || async { Ok(Claims::anonymous()) })
//!     .await?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::observability::metrics;
use crate::resilience::error::BreakerError;
use crate::resilience::operation::Operation;
use crate::resilience::timeouts::with_timeout;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected until the reset window elapses.
    Open,
    /// One probe call is in flight.
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding for the state gauge (0=closed, 1=half-open, 2=open).
    pub fn as_gauge(self) -> f64 {
        match self {
            Self::Closed => 0.0,
            Self::HalfOpen => 1.0,
            Self::Open => 2.0,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Immutable breaker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// In-flight calls exceeding this are treated as failed.
    pub timeout: Duration,
    /// Consecutive failures that trip the breaker. Values below 1 act as 1.
    pub threshold: u32,
    /// How long an open breaker waits before admitting a probe.
    pub reset_timeout: Duration,
}

impl BreakerConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);
    pub const DEFAULT_THRESHOLD: u32 = 5;
    pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_millis(60_000);

    pub const fn new(timeout: Duration, threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            timeout,
            threshold,
            reset_timeout,
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_TIMEOUT,
            Self::DEFAULT_THRESHOLD,
            Self::DEFAULT_RESET_TIMEOUT,
        )
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    next_attempt_at: Option<Instant>,
    /// Bumped on every transition; outcomes from an earlier closed period
    /// carry a stale value.
    generation: u64,
}

/// How a call was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Admitted while closed, in the given generation.
    Normal(u64),
    Probe,
}

#[derive(Debug, Default)]
struct BreakerStats {
    calls: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
    rejections: AtomicU64,
    fallbacks: AtomicU64,
    transitions: AtomicU64,
}

impl BreakerStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> BreakerStatsSnapshot {
        BreakerStatsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            transitions: self.transitions.load(Ordering::Relaxed),
        }
    }
}

/// Lifetime counters for one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerStatsSnapshot {
    /// Calls admitted to the primary operation (probes included).
    pub calls: u64,
    pub successes: u64,
    /// Failed primary calls, timeouts included.
    pub failures: u64,
    pub timeouts: u64,
    /// Calls refused without invoking the primary operation.
    pub rejections: u64,
    pub fallbacks: u64,
    pub transitions: u64,
}

/// Read-only view of a breaker for health and metrics collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub threshold: u32,
    pub timeout_ms: u64,
    pub reset_timeout_ms: u64,
    /// Time left before a probe is admitted; only set while open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_in_ms: Option<u64>,
    pub stats: BreakerStatsSnapshot,
}

/// Circuit breaker guarding one dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Dependency name for logging and metrics.
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerState>,
    stats: BreakerStats,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        let config = BreakerConfig {
            threshold: config.threshold.max(1),
            ..config
        };
        let name = name.into();
        metrics::record_state(&name, CircuitState::Closed);

        Self {
            name,
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                next_attempt_at: None,
                generation: 0,
            }),
            stats: BreakerStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Current state. An open breaker whose window has elapsed still reports
    /// `Open` until a call arrives to probe.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive failures since the last reset.
    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Earliest instant an open breaker admits a probe.
    pub fn next_attempt_at(&self) -> Option<Instant> {
        let inner = self.lock();
        match inner.state {
            CircuitState::Open => inner.next_attempt_at,
            CircuitState::Closed | CircuitState::HalfOpen => None,
        }
    }

    /// Guarded call without a fallback.
    ///
    /// Returns the primary's value, or [`BreakerError::CircuitOpen`],
    /// [`BreakerError::Remote`] or [`BreakerError::Timeout`].
    pub async fn call<T, E, P>(&self, primary: P) -> Result<T, BreakerError<E>>
    where
        P: Operation<T, E>,
    {
        let Some(admission) = self.admit() else {
            return Err(self.reject());
        };
        let permit = Permit::new(self, admission);
        BreakerStats::bump(&self.stats.calls);

        match with_timeout(self.config.timeout, primary.execute()).await {
            Ok(value) => {
                permit.succeed();
                Ok(value)
            }
            Err(err) => {
                permit.fail(&err);
                Err(err)
            }
        }
    }

    /// Guarded call that substitutes `fallback` whenever the primary is
    /// skipped or fails. A failing fallback is returned as
    /// [`BreakerError::Fallback`] and does not count against the breaker.
    pub async fn call_with_fallback<T, E, P, F>(
        &self,
        primary: P,
        fallback: F,
    ) -> Result<T, BreakerError<E>>
    where
        P: Operation<T, E>,
        F: Operation<T, E>,
    {
        match self.call(primary).await {
            Ok(value) => Ok(value),
            Err(err) => {
                let reason = err.kind();
                drop(err);
                BreakerStats::bump(&self.stats.fallbacks);
                metrics::record_fallback(&self.name, reason);
                tracing::debug!(breaker = %self.name, reason, "Serving fallback");
                fallback.execute().await.map_err(BreakerError::Fallback)
            }
        }
    }

    /// Read-only snapshot for health reporting.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = Instant::now();
        let inner = self.lock();
        let retry_in_ms = match inner.state {
            CircuitState::Open => inner
                .next_attempt_at
                .map(|at| duration_ms(at.saturating_duration_since(now))),
            CircuitState::Closed | CircuitState::HalfOpen => None,
        };

        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            threshold: self.config.threshold,
            timeout_ms: duration_ms(self.config.timeout),
            reset_timeout_ms: duration_ms(self.config.reset_timeout),
            retry_in_ms,
            stats: self.stats.snapshot(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide whether the primary may run. `None` means fail fast.
    fn admit(&self) -> Option<Admission> {
        let now = Instant::now();
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => Some(Admission::Normal(inner.generation)),
            CircuitState::Open => {
                let due = inner.next_attempt_at.map_or(true, |at| now >= at);
                if due {
                    self.transition(&mut inner, CircuitState::HalfOpen, now);
                    Some(Admission::Probe)
                } else {
                    None
                }
            }
            // A probe is already in flight.
            CircuitState::HalfOpen => None,
        }
    }

    fn reject<E>(&self) -> BreakerError<E> {
        BreakerStats::bump(&self.stats.rejections);
        metrics::record_rejection(&self.name);
        tracing::debug!(breaker = %self.name, "Call rejected, circuit open");
        BreakerError::CircuitOpen {
            name: self.name.clone(),
        }
    }

    fn on_success(&self, admission: Admission) {
        BreakerStats::bump(&self.stats.successes);
        metrics::record_call(&self.name, "success");

        let now = Instant::now();
        let mut inner = self.lock();
        match (admission, inner.state) {
            (Admission::Probe, CircuitState::HalfOpen) => {
                self.transition(&mut inner, CircuitState::Closed, now);
            }
            (Admission::Normal(generation), CircuitState::Closed)
                if generation == inner.generation =>
            {
                inner.failure_count = 0;
            }
            (_, state) => {
                tracing::debug!(breaker = %self.name, state = %state, "Late success ignored");
            }
        }
    }

    fn on_failure(&self, admission: Admission, timed_out: bool) {
        BreakerStats::bump(&self.stats.failures);
        if timed_out {
            BreakerStats::bump(&self.stats.timeouts);
        }
        metrics::record_call(&self.name, if timed_out { "timeout" } else { "failure" });

        let now = Instant::now();
        let mut inner = self.lock();
        match (admission, inner.state) {
            (Admission::Probe, CircuitState::HalfOpen) => {
                tracing::warn!(breaker = %self.name, timed_out, "Probe failed");
                self.transition(&mut inner, CircuitState::Open, now);
            }
            (Admission::Normal(generation), CircuitState::Closed)
                if generation == inner.generation =>
            {
                inner.failure_count = inner.failure_count.saturating_add(1);
                tracing::debug!(
                    breaker = %self.name,
                    failures = inner.failure_count,
                    threshold = self.config.threshold,
                    timed_out,
                    "Call failed"
                );
                if inner.failure_count >= self.config.threshold {
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            (_, state) => {
                tracing::debug!(breaker = %self.name, state = %state, "Late failure ignored");
            }
        }
    }

    /// The probe's future was dropped before it settled. Reopen without a new
    /// window so the next caller may probe straight away.
    fn abandon_probe(&self) {
        let now = Instant::now();
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open;
            inner.next_attempt_at = Some(now);
            inner.generation += 1;
            BreakerStats::bump(&self.stats.transitions);
            metrics::record_transition(&self.name, CircuitState::HalfOpen, CircuitState::Open);
            tracing::warn!(breaker = %self.name, "Probe abandoned before settling");
        }
    }

    /// Apply a transition. Caller holds the state lock.
    fn transition(&self, inner: &mut BreakerState, to: CircuitState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.generation += 1;

        match to {
            CircuitState::Open => {
                inner.next_attempt_at = Some(now + self.config.reset_timeout);
                tracing::warn!(
                    breaker = %self.name,
                    from = %from,
                    failures = inner.failure_count,
                    retry_in_ms = duration_ms(self.config.reset_timeout),
                    "Circuit breaker opened"
                );
            }
            CircuitState::HalfOpen => {
                inner.next_attempt_at = None;
                tracing::info!(breaker = %self.name, from = %from, "Circuit breaker probing");
            }
            CircuitState::Closed => {
                inner.failure_count = 0;
                inner.next_attempt_at = None;
                tracing::info!(breaker = %self.name, from = %from, "Circuit breaker closed");
            }
        }

        BreakerStats::bump(&self.stats.transitions);
        metrics::record_transition(&self.name, from, to);
    }
}

/// Admission held for the duration of one primary call.
///
/// Dropping an unsettled probe permit reopens the breaker.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, admission: Admission) -> Self {
        Self {
            breaker,
            admission,
            settled: false,
        }
    }

    fn succeed(mut self) {
        self.settled = true;
        self.breaker.on_success(self.admission);
    }

    fn fail<E>(mut self, err: &BreakerError<E>) {
        self.settled = true;
        self.breaker
            .on_failure(self.admission, matches!(err, BreakerError::Timeout(_)));
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.admission == Admission::Probe {
            self.breaker.abandon_probe();
        }
    }
}

pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use tokio::time;

    fn config(threshold: u32, reset_ms: u64) -> BreakerConfig {
        BreakerConfig::new(
            Duration::from_millis(3000),
            threshold,
            Duration::from_millis(reset_ms),
        )
    }

    async fn fail(breaker: &CircuitBreaker) -> BreakerError<String> {
        breaker
            .call(|| async { Err::<(), _>("boom".to_string()) })
            .await
            .unwrap_err()
    }

    #[test]
    fn test_default_config() {
        let config = BreakerConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(3000));
        assert_eq!(config.threshold, 5);
        assert_eq!(config.reset_timeout, Duration::from_millis(60_000));
    }

    #[test]
    fn test_initial_state_is_closed() {
        let breaker = CircuitBreaker::new("test", BreakerConfig::default());
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
        assert!(breaker.next_attempt_at().is_none());
    }

    #[test]
    fn test_zero_threshold_acts_as_one() {
        let breaker = CircuitBreaker::new("test", config(0, 1000));
        assert_eq!(breaker.config().threshold, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trips_after_threshold_failures() {
        let breaker = CircuitBreaker::new("test", config(3, 1000));

        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 2);

        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.failure_count(), 3);
        assert_eq!(
            breaker.next_attempt_at(),
            Some(Instant::now() + Duration::from_millis(1000))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new("test", config(3, 1000));

        fail(&breaker).await;
        fail(&breaker).await;
        let value = breaker.call(|| async { Ok::<_, String>(42) }).await;
        assert_eq!(value.ok(), Some(42));
        assert_eq!(breaker.failure_count(), 0);

        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_without_invoking_primary() {
        let breaker = CircuitBreaker::new("test", config(1, 1000));
        let calls = AtomicU32::new(0);
        let counter = &calls;
        fail(&breaker).await;

        time::advance(Duration::from_millis(999)).await;
        let result = breaker
            .call(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await;

        assert!(matches!(result, Err(BreakerError::CircuitOpen { ref name }) if name == "test"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(breaker.snapshot().stats.rejections, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_admitted_exactly_at_next_attempt() {
        let breaker = CircuitBreaker::new("test", config(1, 1000));
        fail(&breaker).await;

        time::advance(Duration::from_millis(1000)).await;
        let result = breaker.call(|| async { Ok::<_, String>("up") }).await;

        assert_eq!(result.ok(), Some("up"));
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_restarts_window() {
        let breaker = CircuitBreaker::new("test", config(2, 1000));
        fail(&breaker).await;
        fail(&breaker).await;

        time::advance(Duration::from_millis(1500)).await;
        fail(&breaker).await;

        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.failure_count(), 2);
        assert_eq!(
            breaker.next_attempt_at(),
            Some(Instant::now() + Duration::from_millis(1000))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let breaker = CircuitBreaker::new(
            "slow",
            BreakerConfig::new(Duration::from_millis(50), 2, Duration::from_secs(1)),
        );

        let result = breaker
            .call(|| async {
                time::sleep(Duration::from_secs(10)).await;
                Ok::<_, String>(())
            })
            .await;

        assert!(matches!(result, Err(BreakerError::Timeout(_))));
        assert_eq!(breaker.failure_count(), 1);
        let stats = breaker.snapshot().stats;
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.timeouts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_failure_is_not_counted() {
        let breaker = CircuitBreaker::new("test", config(3, 1000));

        let result = breaker
            .call_with_fallback(
                || async { Err::<u8, _>("primary down".to_string()) },
                || async { Err("no cached copy".to_string()) },
            )
            .await;

        assert!(matches!(result, Err(BreakerError::Fallback(ref e)) if e == "no cached copy"));
        assert_eq!(breaker.failure_count(), 1);
        assert_eq!(breaker.snapshot().stats.fallbacks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_probe_reopens_immediately() {
        let breaker = CircuitBreaker::new("test", config(1, 1000));
        fail(&breaker).await;
        time::advance(Duration::from_millis(1000)).await;

        let abandoned = time::timeout(
            Duration::from_millis(10),
            breaker.call(|| std::future::pending::<Result<(), String>>()),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(breaker.state(), CircuitState::Open);

        let result = breaker.call(|| async { Ok::<_, String>(()) }).await;
        assert!(result.is_ok());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcomes_from_before_a_trip_are_ignored_after_recovery() {
        let breaker = Arc::new(CircuitBreaker::new("test", config(2, 1000)));

        let slow_failure = tokio::spawn({
            let breaker = Arc::clone(&breaker);
            async move {
                breaker
                    .call(|| async {
                        time::sleep(Duration::from_millis(2000)).await;
                        Err::<(), _>("slow".to_string())
                    })
                    .await
            }
        });
        let slow_success = tokio::spawn({
            let breaker = Arc::clone(&breaker);
            async move {
                breaker
                    .call(|| async {
                        time::sleep(Duration::from_millis(2500)).await;
                        Ok::<_, String>(())
                    })
                    .await
            }
        });
        // Both slow calls are admitted while closed.
        tokio::task::yield_now().await;
        assert_eq!(breaker.snapshot().stats.calls, 2);

        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        time::advance(Duration::from_millis(1001)).await;
        breaker.call(|| async { Ok::<_, String>(()) }).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);

        // A failure in the new closed period that the slow success must not erase.
        fail(&breaker).await;
        assert_eq!(breaker.failure_count(), 1);

        assert!(slow_failure.await.unwrap().unwrap_err().is_remote_failure());
        assert!(slow_success.await.unwrap().is_ok());

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 1);
        let stats = breaker.snapshot().stats;
        assert_eq!(stats.failures, 4);
        assert_eq!(stats.successes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_reports_retry_window() {
        let breaker = CircuitBreaker::new("datastore", config(1, 1000));
        fail(&breaker).await;
        time::advance(Duration::from_millis(400)).await;

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.name, "datastore");
        assert_eq!(snapshot.state, CircuitState::Open);
        assert_eq!(snapshot.retry_in_ms, Some(600));
        assert_eq!(snapshot.reset_timeout_ms, 1000);
        assert_eq!(snapshot.stats.transitions, 1);
    }

    #[test]
    fn test_state_serializes_screaming_snake() {
        let json = serde_json::to_string(&CircuitState::HalfOpen).unwrap();
        assert_eq!(json, "\"HALF_OPEN\"");
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
    }
}
