//! Throttling-aware retry for upstream calls.
//!
//! Only [`UpstreamError::Throttled`] (HTTP 429 / 403) is retried. Every other
//! error is returned on the spot so the caller can classify it.

use std::future::Future;
use std::time::Duration;

use crate::error::UpstreamError;

/// Exponential backoff schedule bounded by a total attempt count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound on any single delay.
    pub cap: Duration,
}

impl BackoffPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base: Duration, cap: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base,
            cap,
        }
    }

    /// Delay before retry number `retry` (1-based): `min(base * 2^(retry-1), cap)`.
    ///
    /// | retry | base = 1 s, cap = 30 s |
    /// |-------|------------------------|
    /// | 1     | 1 s                    |
    /// | 2     | 2 s                    |
    /// | 5     | 16 s                   |
    /// | 6+    | 30 s                   |
    #[must_use]
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.cap, |d| d.min(self.cap))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(30, Duration::from_secs(1), Duration::from_secs(30))
    }
}

/// Runs `operation` until it succeeds, fails with a non-throttling error, or
/// `policy.max_attempts` attempts have been made.
///
/// On exhaustion the last [`UpstreamError::Throttled`] is returned, so callers
/// can tell "gave up waiting" apart from a terminal failure.
///
/// # Errors
///
/// Returns the first non-throttling error, or the last throttling error once
/// attempts run out.
pub async fn retry_throttled<T, F, Fut>(
    policy: &BackoffPolicy,
    mut operation: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_throttled() || attempt >= policy.max_attempts {
                    return Err(err);
                }
                let delay = policy.delay_before_retry(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "upstream throttled; backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
