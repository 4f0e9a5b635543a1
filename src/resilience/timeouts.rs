//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race a guarded operation against the breaker's call timeout
//! - Map the three outcomes (value, error, elapsed) onto [`BreakerError`]
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from remote errors
//! - Losing the race drops the operation's future; the remote side may keep
//!   running, callers needing real cancellation pass a cancellable operation

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::resilience::error::BreakerError;

/// Await `fut` for at most `limit`.
pub async fn with_timeout<T, E, Fut>(limit: Duration, fut: Fut) -> Result<T, BreakerError<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    match time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(BreakerError::Remote(e)),
        Err(_) => Err(BreakerError::Timeout(limit)),
    }
}
