//! Retry policies and rate limiting for Web API calls

pub mod config;
pub mod rate_limiter;
pub mod retry;

pub use config::{RateLimitConfig, ResilienceConfig, ResilienceConfigBuilder};
pub use rate_limiter::{RateLimiter, RateLimiterStats};
pub use retry::{RetryConfig, RetryPolicy, RetryableError};

/// Serialize a `Duration` as whole milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
