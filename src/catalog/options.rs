//! Configurable knobs for the catalog client along with validation helpers so
//! callers can reason about throttling, timeouts, and retry limits.

use anyhow::{bail, Result};
use std::time::Duration;

/// Minimum spacing between consecutive outbound calls: 4 calls per second.
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 250;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_ATTEMPTS: usize = 5;
const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct CatalogClientOptions {
    pub request_timeout: Duration,
    pub min_interval: Duration,
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for CatalogClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            min_interval: Duration::from_millis(DEFAULT_MIN_INTERVAL_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl CatalogClientOptions {
    /// `min_interval` and `base_delay` may be zero (no throttling, immediate
    /// retries); the timeout and attempt ceiling must not be.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }
        if self.max_attempts == 0 {
            bail!("max_attempts must be greater than 0");
        }
        Ok(())
    }
}
