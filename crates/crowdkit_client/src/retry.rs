//! Retry with exponential backoff.

use crate::config::RetryConfig;
use crate::error::{ClientError, ClientResult};
use crate::sleep::Sleeper;
use std::future::Future;
use tracing::{debug, warn};

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// the policy runs out of attempts.
///
/// The closure receives the 0-indexed attempt number and must rebuild the
/// exact same request each time; the idempotency token is the caller's to keep.
/// Exhaustion returns the last error.
pub async fn execute_with_retry<S, T, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut attempt: F,
) -> ClientResult<T>
where
    S: Sleeper,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut last_error: Option<ClientError> = None;

    for n in 0..max_attempts {
        if let Some(error) = &last_error {
            let delay = config.delay_for_attempt(n);
            warn!(
                request = label,
                attempt = n + 1,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying request"
            );
            S::sleep_for(delay).await;
        }

        match attempt(n).await {
            Ok(value) => {
                if n > 0 {
                    debug!(request = label, attempts = n + 1, "request succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                if config.should_retry(&e) && n + 1 < max_attempts {
                    last_error = Some(e);
                    continue;
                }
                return Err(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| ClientError::Protocol("no request attempts made".into())))
}
