//! Retry utilities for job-site requests.
//!
//! Provides exponential backoff with jitter for transient HTTP failures.
//! Non-retriable errors (4xx other than 429, parse failures) are propagated
//! immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Upper bound on a single backoff sleep.
const MAX_DELAY_MS: u64 = 30_000;

/// Returns `true` if `err` is a transient condition worth another attempt.
///
/// Retriable errors:
/// - [`ScraperError::RateLimited`] (HTTP 429).
/// - [`ScraperError::Http`] for timeouts and connection failures.
/// - [`ScraperError::UnexpectedStatus`] with a 5xx status.
fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } => true,
        ScraperError::Http(e) => e.is_timeout() || e.is_connect(),
        ScraperError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        _ => false,
    }
}

/// Executes `operation`, retrying transient errors up to `max_retries`
/// additional times.
///
/// The sleep before retry `n` (1-based) is `backoff_base_ms * 2^(n-1)`,
/// capped at 30 s, scaled by a random factor in `[0.75, 1.25)`.
///
/// | Retry | Sleep with `backoff_base_ms = 500` |
/// |-------|-------------------------------------|
/// | 1     | 500 ms ± 25 %                       |
/// | 2     | 1 000 ms ± 25 %                     |
/// | 3     | 2 000 ms ± 25 %                     |
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(20));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient job-site error, retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
