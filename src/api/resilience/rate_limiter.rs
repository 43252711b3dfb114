//! Token bucket rate limiter
//!
//! One bucket per client, shared by its clones, so every request made
//! through a client draws from the same budget.

use super::config::RateLimitConfig;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Bucket>>,
    config: RateLimitConfig,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
    granted: u64,
    delayed: u64,
}

impl RateLimiter {
    /// A zero burst or rate is raised to 1 so `acquire` always makes progress
    pub fn new(mut config: RateLimitConfig) -> Self {
        config.burst_capacity = config.burst_capacity.max(1);
        config.requests_per_minute = config.requests_per_minute.max(1);
        Self {
            inner: Arc::new(Mutex::new(Bucket {
                tokens: config.burst_capacity as f64,
                last_refill: Instant::now(),
                granted: 0,
                delayed: 0,
            })),
            config,
        }
    }

    /// Wait until a request may be sent
    pub async fn acquire(&self) {
        if !self.config.enabled {
            return;
        }

        loop {
            let wait = {
                let mut bucket = self.bucket();
                self.refill(&mut bucket);

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    bucket.granted += 1;
                    None
                } else {
                    bucket.delayed += 1;
                    Some(self.time_per_token())
                }
            };

            match wait {
                None => return,
                Some(duration) => {
                    debug!("Rate limited, waiting {:?} for next token", duration);
                    sleep(duration).await;
                }
            }
        }
    }

    /// Take a token if one is available right now
    pub fn try_acquire(&self) -> bool {
        if !self.config.enabled {
            return true;
        }

        let mut bucket = self.bucket();
        self.refill(&mut bucket);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            bucket.granted += 1;
            true
        } else {
            bucket.delayed += 1;
            false
        }
    }

    pub fn stats(&self) -> RateLimiterStats {
        let bucket = self.bucket();
        RateLimiterStats {
            tokens_available: bucket.tokens,
            requests_granted: bucket.granted,
            requests_delayed: bucket.delayed,
            enabled: self.config.enabled,
        }
    }

    // A poisoned lock still holds a usable bucket
    fn bucket(&self) -> MutexGuard<'_, Bucket> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill);
        let tokens_per_second = self.config.requests_per_minute as f64 / 60.0;
        let added = elapsed.as_secs_f64() * tokens_per_second;

        if added > 0.0 {
            bucket.tokens = (bucket.tokens + added).min(self.config.burst_capacity as f64);
            bucket.last_refill = now;
        }
    }

    fn time_per_token(&self) -> Duration {
        let rpm = self.config.requests_per_minute.max(1) as f64;
        Duration::from_secs_f64(60.0 / rpm)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub tokens_available: f64,
    pub requests_granted: u64,
    /// Acquisitions that had to wait (or were refused by `try_acquire`)
    pub requests_delayed: u64,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rpm: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_minute: rpm,
            burst_capacity: burst,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_disabled_is_unlimited() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: false,
            ..config(60, 1)
        });

        for _ in 0..100 {
            assert!(limiter.try_acquire());
        }
        limiter.acquire().await;
    }

    #[test]
    fn test_burst_capacity() {
        let limiter = RateLimiter::new(config(60, 5));

        for _ in 0..5 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());

        let stats = limiter.stats();
        assert_eq!(stats.requests_granted, 5);
        assert_eq!(stats.requests_delayed, 1);
    }

    #[tokio::test]
    async fn test_token_refill() {
        // Two tokens per second
        let limiter = RateLimiter::new(config(120, 2));

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        sleep(Duration::from_millis(550)).await;

        assert!(limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_acquire_waits() {
        let limiter = RateLimiter::new(config(600, 1));

        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_zero_settings_do_not_block_forever() {
        let limiter = RateLimiter::new(config(0, 0));

        tokio::time::timeout(Duration::from_secs(1), limiter.acquire())
            .await
            .expect("first token is available");
        assert_eq!(limiter.stats().requests_granted, 1);
    }

    #[test]
    fn test_clones_share_bucket() {
        let limiter = RateLimiter::new(config(60, 1));
        let clone = limiter.clone();

        assert!(limiter.try_acquire());
        assert!(!clone.try_acquire());
    }
}
