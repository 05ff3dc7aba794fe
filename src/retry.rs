use crate::error::ApiError;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Upper bound of the random jitter added to every delay
    pub max_jitter_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 300,
            max_jitter_ms: 200,
            max_delay_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

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

    /// Whether a request that has already been retried `retries_so_far` times may go again
    pub fn should_retry(&self, err: &ApiError, retries_so_far: u32) -> bool {
        err.is_transient() && retries_so_far < self.config.max_retries
    }

    /// Exponential delay before the given retry (1-based), without jitter
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let millis = self.config.base_delay_ms as f64 * self.config.multiplier.powi(exponent);
        Duration::from_millis(millis.min(self.config.max_delay_ms as f64) as u64)
    }

    /// Delay before the given retry (1-based) including jitter
    pub fn delay_for(&self, retry: u32) -> Duration {
        // Jitter spreads out clients that failed together
        let jitter = rand::random_range(0..=self.config.max_jitter_ms);
        self.base_delay(retry) + Duration::from_millis(jitter)
    }
}
