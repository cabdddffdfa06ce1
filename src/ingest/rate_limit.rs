// src/ingest/rate_limit.rs
use anyhow::{bail, Result};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces calls to one source at least `1 / calls_per_second` apart.
///
/// The async mutex is held across the sleep so concurrent callers queue up
/// (tokio's mutex wakes waiters in FIFO order).
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

/// Longest spacing a limiter will enforce (one call per day).
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 3600);

impl RateLimiter {
    /// A non-positive or non-finite rate means "no spacing". Rates slower than
    /// one call per [`MAX_INTERVAL`] are clamped to it.
    pub fn new(calls_per_second: f64) -> Self {
        let min_interval = if calls_per_second.is_finite() && calls_per_second > 0.0 {
            Duration::try_from_secs_f64(1.0 / calls_per_second)
                .map(|d| d.min(MAX_INTERVAL))
                .unwrap_or(MAX_INTERVAL)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Like [`RateLimiter::new`] but rejects rates that `new` would clamp.
    pub fn try_new(calls_per_second: f64) -> Result<Self> {
        if calls_per_second.is_finite() && calls_per_second > 0.0 {
            let too_slow = Duration::try_from_secs_f64(1.0 / calls_per_second)
                .map_or(true, |d| d > MAX_INTERVAL);
            if too_slow {
                bail!("calls_per_second {calls_per_second} is below one call per day");
            }
        }
        Ok(Self::new(calls_per_second))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub async fn acquire(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            match prev.checked_add(self.min_interval) {
                Some(ready_at) if Instant::now() < ready_at => {
                    tokio::time::sleep_until(ready_at).await
                }
                Some(_) => {}
                None => tokio::time::sleep(self.min_interval).await,
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_from_rate() {
        assert_eq!(RateLimiter::new(2.0).min_interval(), Duration::from_millis(500));
        assert_eq!(RateLimiter::new(0.1).min_interval(), Duration::from_secs(10));
        assert_eq!(RateLimiter::new(0.0).min_interval(), Duration::ZERO);
        assert_eq!(RateLimiter::new(f64::NAN).min_interval(), Duration::ZERO);
    }

    #[test]
    fn tiny_rates_clamp_instead_of_panicking() {
        assert_eq!(RateLimiter::new(1e-300).min_interval(), MAX_INTERVAL);
        assert_eq!(RateLimiter::new(f64::MIN_POSITIVE).min_interval(), MAX_INTERVAL);
        assert_eq!(RateLimiter::new(1e-6).min_interval(), MAX_INTERVAL);
    }

    #[test]
    fn try_new_rejects_what_new_would_clamp() {
        assert!(RateLimiter::try_new(1e-300).is_err());
        assert!(RateLimiter::try_new(1e-6).is_err());
        assert!(RateLimiter::try_new(0.1).is_ok());
        assert_eq!(RateLimiter::try_new(0.0).unwrap().min_interval(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn first_acquire_is_immediate() {
        let rl = RateLimiter::new(0.5);
        let t0 = Instant::now();
        rl.acquire().await;
        assert!(t0.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_when_caller_is_already_slow() {
        let rl = RateLimiter::new(1.0);
        rl.acquire().await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        let t0 = Instant::now();
        rl.acquire().await;
        assert!(t0.elapsed() < Duration::from_millis(1));
    }
}
