//! Outcome taxonomy for guarded calls.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by a guarded call.
///
/// `E` is the guarded dependency's own error type. It is carried unchanged in
/// [`BreakerError::Remote`] and [`BreakerError::Fallback`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker refused to attempt the call and no fallback was supplied.
    #[error("circuit `{name}` is open")]
    CircuitOpen { name: String },

    /// The primary operation failed.
    #[error("remote call failed: {0}")]
    Remote(#[source] E),

    /// The primary operation did not settle within the call timeout.
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    /// The fallback itself failed.
    #[error("fallback failed: {0}")]
    Fallback(#[source] E),
}

impl<E> BreakerError<E> {
    /// True for outcomes that count against the failure threshold.
    pub fn is_remote_failure(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::Timeout(_))
    }

    /// True when the breaker refused the call without attempting it.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Short label used in logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Remote(_) => "remote_failure",
            Self::Timeout(_) => "timeout",
            Self::Fallback(_) => "fallback_failure",
        }
    }

    /// The dependency's error, when there is one.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Remote(e) | Self::Fallback(e) => Some(e),
            Self::CircuitOpen { .. } | Self::Timeout(_) => None,
        }
    }
}
