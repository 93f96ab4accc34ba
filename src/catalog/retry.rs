//! Bounded exponential-backoff retry wrapper for one outbound call. The delay
//! before attempt k (k >= 2) is `base_delay * 2^(k-2)`; no jitter. The final
//! attempt's error is propagated unchanged.

use crate::catalog::error::ErrorClass;
use anyhow::{anyhow, Result};
use std::future::Future;
use std::time::Duration;
use tokio::task::yield_now;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RetryBackoff {
    base_delay: Duration,
    max_attempts: usize,
    cancellation: Option<CancellationToken>,
}

impl RetryBackoff {
    pub fn new(base_delay: Duration, max_attempts: usize) -> Self {
        Self {
            base_delay,
            max_attempts,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Attempts `operation` up to the configured ceiling, sleeping between
/// attempts. `classify` decides whether a failure is worth repeating;
/// `ErrorClass::Permanent` aborts immediately with the original error.
pub async fn retry_with_backoff<T, F, Fut, C>(
    config: RetryBackoff,
    mut operation: F,
    mut classify: C,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
    C: FnMut(&anyhow::Error) -> ErrorClass,
{
    let mut attempt = 0;

    loop {
        if let Some(token) = &config.cancellation {
            if token.is_cancelled() {
                return Err(anyhow!("retry cancelled"));
            }
        }

        attempt += 1;

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if let ErrorClass::Permanent = classify(&err) {
                    return Err(err);
                }
                if attempt >= config.max_attempts {
                    return Err(err);
                }

                let delay = backoff_delay(config.base_delay, attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "catalog call failed; retrying after backoff"
                );
                sleep_with_cancellation(delay, config.cancellation.as_ref()).await?;
            }
        }
    }
}

/// Delay slept after `failed_attempt` fails, i.e. before attempt
/// `failed_attempt + 1`.
fn backoff_delay(base_delay: Duration, failed_attempt: usize) -> Duration {
    let exponent = failed_attempt.saturating_sub(1).min(31) as u32;
    let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
    base_delay.saturating_mul(multiplier)
}

async fn sleep_with_cancellation(
    delay: Duration,
    cancellation: Option<&CancellationToken>,
) -> Result<()> {
    if delay.is_zero() {
        yield_now().await;
        return Ok(());
    }

    if let Some(token) = cancellation {
        tokio::select! {
            _ = token.cancelled() => Err(anyhow!("retry cancelled")),
            _ = sleep(delay) => Ok(()),
        }
    } else {
        sleep(delay).await;
        Ok(())
    }
}
