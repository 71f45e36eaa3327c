// src/retry.rs
//! Exponential backoff around a single fallible async call.
//!
//! Only transient failures (connect errors, timeouts, errors tagged [`Transient`])
//! are retried or degraded. Anything else returns at once.

use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use metrics::counter;
use tracing::warn;

use crate::config::RetryConfig;
use crate::metrics::FETCH_RETRIES;

/// Marker for failures worth another attempt (rate limits, 5xx, dropped connections).
#[derive(Debug)]
pub struct Transient(pub String);

impl fmt::Display for Transient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Transient {}

pub fn transient(msg: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(Transient(msg.into()))
}

/// True when any error in the chain is a connect/timeout failure or a [`Transient`].
pub fn is_transient(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if cause.downcast_ref::<Transient>().is_some() {
            return true;
        }
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            return e.is_connect() || e.is_timeout();
        }
        if let Some(e) = cause.downcast_ref::<io::Error>() {
            return matches!(
                e.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::BrokenPipe
            );
        }
        false
    })
}

/// Run `op` up to `max_attempts` times, sleeping `unit * multiplier^attempt` between tries.
///
/// Returns `Ok(Some(v))` on success. A non-transient error is returned immediately.
/// After the last transient failure returns `Ok(None)` when `graceful_degradation`
/// is on, otherwise the last error.
pub async fn retry_with_backoff<T, F, Fut>(
    what: &str,
    config: &RetryConfig,
    mut op: F,
) -> anyhow::Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(Some(v)),
            Err(e) if !is_transient(&e) => {
                warn!(target: "retry", what, error = %e, "non-retryable failure");
                return Err(e.context(format!("{what} failed")));
            }
            Err(e) if attempt + 1 < attempts => {
                let delay = backoff_delay(config, attempt);
                warn!(
                    target: "retry",
                    what,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed; retrying"
                );
                counter!(FETCH_RETRIES).increment(1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if config.graceful_degradation {
                    warn!(
                        target: "retry",
                        what,
                        attempts,
                        error = %e,
                        "all attempts failed; degrading to empty result"
                    );
                    return Ok(None);
                }
                return Err(e.context(format!("{what} failed after {attempts} attempt(s)")));
            }
        }
    }
}

/// Delay before retry number `attempt` (0-based).
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let factor = u64::from(config.backoff_multiplier.max(1)).saturating_pow(attempt);
    Duration::from_millis(config.backoff_unit_ms.saturating_mul(factor))
}
