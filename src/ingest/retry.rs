// src/ingest/retry.rs
use anyhow::Result;
use metrics::counter;
use std::future::Future;
use std::time::Duration;

use crate::ingest::rate_limit::RateLimiter;

/// Attempts per operation, first call included.
pub const MAX_ATTEMPTS: u32 = 3;

/// Marks an error as not worth retrying (bad credentials, unparseable body).
/// Anything else is treated as transient.
#[derive(Debug, thiserror::Error)]
#[error("permanent failure: {0}")]
pub struct Permanent(pub String);

pub fn permanent(msg: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(Permanent(msg.into()))
}

pub fn is_permanent(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<Permanent>())
}

/// Exponential backoff: `base * 2^attempt`, clamped to `[floor, ceiling]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub floor: Duration,
    pub ceiling: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            floor: Duration::from_secs(4),
            ceiling: Duration::from_secs(10),
        }
    }
}

impl Backoff {
    /// Delay after the `attempt`-th failure (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let raw = self.base.saturating_mul(factor);
        let ceiling = self.ceiling.max(self.floor);
        raw.clamp(self.floor, ceiling)
    }
}

/// Run `op` up to [`MAX_ATTEMPTS`] times. The limiter, if any, is acquired
/// before every attempt, retries included.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    backoff: &Backoff,
    limiter: Option<&RateLimiter>,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        if let Some(rl) = limiter {
            rl.acquire().await;
        }
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                attempt += 1;
                if is_permanent(&e) {
                    return Err(e.context(format!("{label}: not retried")));
                }
                if attempt >= MAX_ATTEMPTS {
                    return Err(e.context(format!("{label}: giving up after {attempt} attempts")));
                }
                let delay = backoff.delay(attempt - 1);
                tracing::warn!(
                    target: "retry",
                    op = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, backing off"
                );
                counter!("monitor_retries_total").increment(1);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
