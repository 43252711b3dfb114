//! Resilience configuration with builder pattern

use super::retry::RetryConfig;
use crate::error::{DataverseError, Result};
use serde::{Deserialize, Serialize};

/// Retry and rate limiting settings shared by every request of a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
}

/// Token bucket settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst_capacity: u32,
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // Dataverse allows 6000 requests per user per 5 minute window
        Self {
            requests_per_minute: 1200,
            burst_capacity: 60,
            enabled: true,
        }
    }
}

impl RateLimitConfig {
    /// An enabled bucket needs room for one token and a non-zero refill rate
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.burst_capacity == 0 {
            return Err(DataverseError::Config(
                "rate_limit.burst_capacity must be at least 1 when rate limiting is enabled".to_string(),
            ));
        }
        if self.requests_per_minute == 0 {
            return Err(DataverseError::Config(
                "rate_limit.requests_per_minute must be at least 1 when rate limiting is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl ResilienceConfig {
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    pub fn conservative() -> Self {
        Self {
            retry: RetryConfig::conservative(),
            rate_limit: RateLimitConfig {
                requests_per_minute: 600,
                burst_capacity: 20,
                enabled: true,
            },
        }
    }

    pub fn development() -> Self {
        Self {
            retry: RetryConfig::aggressive(),
            rate_limit: RateLimitConfig {
                requests_per_minute: 1200,
                burst_capacity: 100,
                enabled: false,
            },
        }
    }

    /// Single attempt, no throttling
    pub fn disabled() -> Self {
        Self {
            retry: RetryConfig::none(),
            rate_limit: RateLimitConfig {
                requests_per_minute: u32::MAX,
                burst_capacity: u32::MAX,
                enabled: false,
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    pub fn rate_limit_config(mut self, rate_limit: RateLimitConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    pub fn requests_per_minute(mut self, rpm: u32) -> Self {
        self.config.rate_limit.requests_per_minute = rpm;
        self
    }

    pub fn burst_capacity(mut self, burst: u32) -> Self {
        self.config.rate_limit.burst_capacity = burst;
        self
    }

    pub fn enable_rate_limiting(mut self, enabled: bool) -> Self {
        self.config.rate_limit.enabled = enabled;
        self
    }

    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}
