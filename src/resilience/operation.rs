//! Pluggable primary and fallback operations.
//!
//! Any `FnOnce() -> impl Future<Output = Result<T, E>>` is an [`Operation`],
//! so call sites usually pass an `async` closure or `|| async { .. }` block.
//! Synchronous substitutes go through [`immediate`].

use std::future::{self, Future, Ready};

/// A one-shot unit of work with a uniform invoke-and-get-result contract.
pub trait Operation<T, E> {
    type Future: Future<Output = Result<T, E>>;

    /// Start the operation. Consumes it; a guarded call runs it at most once.
    fn execute(self) -> Self::Future;
}

impl<F, Fut, T, E> Operation<T, E> for F
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    type Future = Fut;

    fn execute(self) -> Fut {
        self()
    }
}

/// Adapt a synchronous computation (e.g. a cached value) into an [`Operation`].
pub fn immediate<F, T, E>(f: F) -> impl FnOnce() -> Ready<Result<T, E>>
where
    F: FnOnce() -> Result<T, E>,
{
    move || future::ready(f())
}
