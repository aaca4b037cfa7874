//! Rate Limiting for Geolocation Lookups
//!
//! The secondary provider's free tier allows 45 requests per minute, shared by
//! the whole process. Lookups are serialized through one scheduler that keeps
//! a minimum spacing between grants. Cache hits never reach it.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Global minimum-interval scheduler, concurrency 1
pub struct GeoRateLimiter {
    /// Minimum spacing between two grants
    min_interval: Duration,

    /// Earliest instant the next grant may be handed out
    next_slot: Mutex<Option<Instant>>,
}

impl GeoRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until a lookup may be sent
    ///
    /// The lock is held while sleeping, so callers are served one at a time.
    pub async fn acquire(&self) {
        let mut next = self.next_slot.lock().await;

        if let Some(at) = *next {
            let now = Instant::now();
            if at > now {
                trace!("Geolocation limiter waiting {:?}", at - now);
                tokio::time::sleep_until(at).await;
            }
        }

        *next = Some(Instant::now() + self.min_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_grant_is_immediate() {
        let limiter = GeoRateLimiter::new(Duration::from_secs(60));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_grants_are_spaced() {
        let limiter = GeoRateLimiter::new(Duration::from_millis(25));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        let limiter = Arc::new(GeoRateLimiter::new(Duration::from_millis(20)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
