//! Retry-with-backoff combinator.
//!
//! One reusable combinator replaces the ad-hoc attempt-counting loops that
//! tend to accumulate around flaky API calls. The delay after a failed
//! attempt is `base_delay * attempt_number` (d, 2d, 3d, ...).

use nameforge_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;

/// Run `op` up to `max_attempts` times, sleeping `base_delay * attempt`
/// after each failure.
///
/// The operation receives the 1-based attempt number. Returns the first
/// success, or the last error once attempts are exhausted.
pub async fn with_retry<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> AppResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut last_err = None;

    for attempt in 1..=max_attempts.max(1) {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(attempt, max_attempts, error = %e, "Attempt failed");
                last_err = Some(e);
                tokio::time::sleep(base_delay * attempt).await;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| AppError::Other("retry exhausted".to_string())))
}
