use crate::error::{Cancelled, Result, ScanError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Aggregate request pacing for a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RateLimit {
    #[default]
    Unlimited,
    /// Minimum gap between any two consecutive requests
    Interval(Duration),
}

/// Longest gap between two requests a run accepts
pub const MAX_INTERVAL: Duration = Duration::from_secs(60 * 60);

impl RateLimit {
    pub fn per_second(rate: f64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ScanError::InvalidConfig(format!(
                "request rate must be a positive number, got {}",
                rate
            )));
        }

        match Duration::try_from_secs_f64(1.0 / rate) {
            Ok(interval) if interval <= MAX_INTERVAL => Ok(Self::from_interval(interval)),
            _ => Err(ScanError::InvalidConfig(format!(
                "request rate {} is below one request per {:?}",
                rate, MAX_INTERVAL
            ))),
        }
    }

    /// Pacing from a delay in seconds between requests. Zero disables pacing.
    pub fn from_secs_f64(delay: f64) -> Result<Self> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(ScanError::InvalidConfig(format!(
                "delay must be a non-negative number of seconds, got {}",
                delay
            )));
        }

        match Duration::try_from_secs_f64(delay) {
            Ok(interval) if interval <= MAX_INTERVAL => Ok(Self::from_interval(interval)),
            _ => Err(ScanError::InvalidConfig(format!(
                "delay of {} seconds exceeds {:?}",
                delay, MAX_INTERVAL
            ))),
        }
    }

    /// A zero interval means no pacing at all.
    pub fn from_interval(interval: Duration) -> Self {
        if interval.is_zero() {
            RateLimit::Unlimited
        } else {
            RateLimit::Interval(interval)
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        match self {
            RateLimit::Unlimited => None,
            RateLimit::Interval(interval) => Some(*interval),
        }
    }
}

/// Interval gate shared by every worker of a run.
///
/// Each caller reserves the next free slot while holding the lock and then
/// sleeps until that slot without it, so slots are handed out `interval`
/// apart no matter how many workers are waiting.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Duration>,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            interval: limit.interval(),
            next_slot: Mutex::new(None),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(RateLimit::Unlimited)
    }

    /// Wait until a request may be issued.
    pub async fn acquire(&self, cancel: &CancellationToken) -> std::result::Result<(), Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        let Some(interval) = self.interval else {
            return Ok(());
        };

        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            // Unrepresentable slots park later callers until cancellation
            *next_slot = Some(slot.checked_add(interval).unwrap_or_else(far_future));
            slot
        };

        trace!("Permit reserved in {:?}", slot.saturating_duration_since(Instant::now()));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            _ = sleep_until(slot) => Ok(()),
        }
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_per_second_converts_to_interval() {
        let limit = RateLimit::per_second(4.0).unwrap();
        assert_eq!(limit, RateLimit::Interval(Duration::from_millis(250)));
    }

    #[test]
    fn test_per_second_rejects_bad_rates() {
        assert!(RateLimit::per_second(0.0).is_err());
        assert!(RateLimit::per_second(-3.0).is_err());
        assert!(RateLimit::per_second(f64::NAN).is_err());
        assert!(RateLimit::per_second(f64::INFINITY).is_err());
    }

    #[test]
    fn test_tiny_rates_are_rejected_not_panicking() {
        assert!(matches!(RateLimit::per_second(1e-300), Err(ScanError::InvalidConfig(_))));
        assert!(matches!(RateLimit::per_second(1e-4), Err(ScanError::InvalidConfig(_))));
        assert!(RateLimit::per_second(1.0 / 60.0).is_ok());
    }

    #[test]
    fn test_delay_in_seconds() {
        assert_eq!(RateLimit::from_secs_f64(0.0).unwrap(), RateLimit::Unlimited);
        assert_eq!(
            RateLimit::from_secs_f64(0.5).unwrap(),
            RateLimit::Interval(Duration::from_millis(500))
        );
        assert!(RateLimit::from_secs_f64(-1.0).is_err());
        assert!(RateLimit::from_secs_f64(f64::INFINITY).is_err());
        assert!(matches!(RateLimit::from_secs_f64(1e30), Err(ScanError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_interval_is_unlimited() {
        assert_eq!(RateLimit::from_interval(Duration::ZERO), RateLimit::Unlimited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permits_are_spaced_across_callers() {
        let interval = Duration::from_millis(100);
        let limiter = Arc::new(RateLimiter::new(RateLimit::Interval(interval)));
        let cancel = CancellationToken::new();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move {
                let mut grants = Vec::new();
                for _ in 0..3 {
                    limiter.acquire(&cancel).await.unwrap();
                    grants.push(Instant::now());
                }
                grants
            }));
        }

        let mut grants = Vec::new();
        for task in tasks {
            grants.extend(task.await.unwrap());
        }
        grants.sort();

        assert_eq!(grants.len(), 24);
        for pair in grants.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= interval, "permits only {:?} apart", gap);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_permit_is_immediate() {
        let limiter = RateLimiter::new(RateLimit::Interval(Duration::from_secs(5)));
        let cancel = CancellationToken::new();
        let start = Instant::now();

        limiter.acquire(&cancel).await.unwrap();

        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_releases_blocked_waiters() {
        let limiter = Arc::new(RateLimiter::new(RateLimit::Interval(Duration::from_secs(60))));
        let cancel = CancellationToken::new();

        limiter.acquire(&cancel).await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { limiter.acquire(&cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        let start = Instant::now();
        cancel.cancel();

        assert_eq!(waiter.await.unwrap(), Err(Cancelled));
        assert!(Instant::now() - start < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unlimited_still_observes_cancellation() {
        let limiter = RateLimiter::unlimited();
        let cancel = CancellationToken::new();

        assert!(limiter.acquire(&cancel).await.is_ok());
        cancel.cancel();
        assert_eq!(limiter.acquire(&cancel).await, Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_parks_waiters_until_cancel() {
        let limiter = Arc::new(RateLimiter::new(RateLimit::Interval(Duration::from_secs(u64::MAX))));
        let cancel = CancellationToken::new();

        limiter.acquire(&cancel).await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { limiter.acquire(&cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(!waiter.is_finished());

        cancel.cancel();
        assert_eq!(waiter.await.unwrap(), Err(Cancelled));
    }
}
