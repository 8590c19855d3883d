//! Bounded retry with linear backoff for hierarchy-cache reads.
//!
//! The cache is eventually consistent: a document missing on the first read
//! may appear a moment later. Misses and read errors are both retried.
//! Delays grow linearly: `step`, `2 * step`, `3 * step`, ...

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Call `f` up to `max_attempts` times until it yields `Ok(Some(_))`.
///
/// Returns `None` once every attempt missed or failed. Never sleeps after
/// the final attempt.
pub(crate) async fn retry_linear<F, Fut, T, E>(
    max_attempts: u32,
    step: Duration,
    key: &str,
    f: F,
) -> Option<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: Display,
{
    for attempt in 1..=max_attempts {
        match f().await {
            Ok(Some(found)) => return Some(found),
            Ok(None) => {
                tracing::debug!(key, attempt, max_attempts, "hierarchy cache miss");
            }
            Err(e) => {
                tracing::warn!(key, attempt, max_attempts, "hierarchy cache read failed: {e}");
            }
        }
        if attempt < max_attempts {
            tokio::time::sleep(step * attempt).await;
        }
    }
    None
}
