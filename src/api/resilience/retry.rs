//! Retry policies with exponential backoff
//!
//! Transient failures (throttling, timeouts, 5xx, dropped connections) are
//! retried; everything else is handed back to the caller on the first attempt.

use super::duration_ms;
use crate::api::constants::headers;
use crate::error::{DataverseError, Result};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    #[serde(rename = "base_delay_ms", with = "duration_ms")]
    pub base_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn conservative() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 1.5,
            jitter: true,
        }
    }

    pub fn aggressive() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.5,
            jitter: true,
        }
    }

    /// A single attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

/// How a failed attempt should be treated
#[derive(Debug, Clone, PartialEq)]
pub enum RetryableError {
    Network,
    ServerError(u16),
    RateLimited,
    Timeout,
    ClientError(u16),
    Unknown,
}

impl RetryableError {
    pub fn should_retry(&self) -> bool {
        matches!(
            self,
            RetryableError::Network
                | RetryableError::ServerError(_)
                | RetryableError::RateLimited
                | RetryableError::Timeout
        )
    }

    pub fn from_status_code(status: u16) -> Self {
        match status {
            408 => RetryableError::Timeout,
            429 => RetryableError::RateLimited,
            400..=499 => RetryableError::ClientError(status),
            500..=599 => RetryableError::ServerError(status),
            _ => RetryableError::Unknown,
        }
    }

    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            RetryableError::Timeout
        } else if error.is_connect() || error.is_request() {
            RetryableError::Network
        } else if let Some(status) = error.status() {
            Self::from_status_code(status.as_u16())
        } else {
            RetryableError::Unknown
        }
    }
}

/// Exponential backoff with jitter, honouring `Retry-After` when throttled
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Send a request until it succeeds, fails permanently or attempts run out.
    ///
    /// Non-success responses that are not retryable, or that persist after the
    /// final attempt, are returned as-is for the caller to map.
    pub async fn execute<F, Fut>(&self, operation: F) -> Result<reqwest::Response>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<reqwest::Response, reqwest::Error>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("Sending request (attempt {}/{})", attempt, max_attempts);
            let last = attempt == max_attempts;

            match operation().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let kind = RetryableError::from_status_code(status);

                    if response.status().is_success() || !kind.should_retry() || last {
                        if attempt > 1 && response.status().is_success() {
                            info!("Request succeeded after {} attempts", attempt);
                        }
                        return Ok(response);
                    }

                    let delay = retry_after(&response)
                        .filter(|_| matches!(status, 429 | 503))
                        .unwrap_or_else(|| self.calculate_delay(attempt));
                    warn!(
                        "Request returned {} on attempt {}, retrying in {:?}",
                        status, attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    let should_retry = RetryableError::from_reqwest_error(&error).should_retry();
                    if !should_retry || last {
                        warn!(
                            "Request failed permanently on attempt {} (retryable: {}): {}",
                            attempt, should_retry, error
                        );
                        return Err(DataverseError::Transport(error));
                    }

                    let delay = self.calculate_delay(attempt);
                    warn!("Request failed on attempt {}: {}, retrying in {:?}", attempt, error, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.config.base_delay.as_millis() as f64)
            * self.config.backoff_multiplier.powi(attempt as i32 - 1);

        let mut delay = Duration::from_millis(delay_ms as u64).min(self.config.max_delay);

        if self.config.jitter {
            let factor = rand::rng().random_range(0.5..=1.5);
            delay = Duration::from_millis((delay.as_millis() as f64 * factor) as u64);
        }

        delay
    }
}

/// `Retry-After` as a number of seconds
fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(headers::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
