//! Exponential back-off with jitter for backend requests.
//!
//! Only transient failures are retried: rate limiting, network-level errors
//! and 5xx responses. A 404 or an unparseable body will not improve on a
//! second attempt and is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ClientError;

const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` for errors worth retrying after a back-off delay.
pub(crate) fn is_retriable(err: &ClientError) -> bool {
    match err {
        ClientError::RateLimited { .. } => true,
        ClientError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        ClientError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        ClientError::NotFound { .. }
        | ClientError::Deserialize { .. }
        | ClientError::InvalidBaseUrl { .. } => false,
    }
}

/// Delay before retry number `attempt` (1-based): `base × 2^(attempt-1)`
/// with ±25 % jitter, never shorter than a server-supplied `Retry-After`,
/// capped at 60 s.
fn backoff_delay_ms(attempt: u32, backoff_base_ms: u64, err: &ClientError) -> u64 {
    let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;

    let floor = match err {
        ClientError::RateLimited {
            retry_after_secs, ..
        } => retry_after_secs.saturating_mul(1_000),
        _ => 0,
    };
    jittered.max(floor).min(MAX_DELAY_MS)
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transient errors. With `max_retries = 3` the operation runs at most four
/// times; the last error is returned once retries are exhausted.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
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
                let delay_ms = backoff_delay_ms(attempt, backoff_base_ms, &err);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient backend error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
