//! Reconnection policy: decides whether and when to retry.

use std::time::Duration;
use tether_core::CacheStoreConfig;
use tracing::error;

/// Outcome of consulting the policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry after the given delay.
    Retry(Duration),
    /// Give up; the client emits `End`.
    Stop,
}

/// Bounded linear backoff.
///
/// The delay before attempt `n` is `n * retry_interval`, so the longest
/// single wait is `max_retries * retry_interval` (10s with defaults).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Failed attempts tolerated before giving up.
    pub max_retries: u32,
    /// Backoff step.
    pub retry_interval: Duration,
}

impl ReconnectPolicy {
    /// Creates a policy.
    pub fn new(max_retries: u32, retry_interval: Duration) -> Self {
        Self {
            max_retries,
            retry_interval,
        }
    }

    /// Creates a policy from adapter configuration.
    pub fn from_config(config: &CacheStoreConfig) -> Self {
        Self::new(config.max_retries, config.retry_interval())
    }

    /// Decides what to do after failed attempt number `attempt` (1-indexed).
    ///
    /// Logs `cause` when giving up.
    pub fn next_backoff(&self, attempt: u32, cause: &str) -> Backoff {
        if attempt > self.max_retries {
            error!(
                attempt,
                max_retries = self.max_retries,
                cause,
                "reconnect retries exhausted"
            );
            return Backoff::Stop;
        }
        Backoff::Retry(self.delay_for_attempt(attempt))
    }

    /// Calculates the delay before retry `attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.retry_interval.saturating_mul(attempt)
    }

    /// Returns the longest single delay the policy can produce.
    pub fn worst_case_delay(&self) -> Duration {
        self.delay_for_attempt(self.max_retries)
    }

    /// Returns the sum of all delays before the policy gives up.
    pub fn total_budget(&self) -> Duration {
        (1..=self.max_retries).fold(Duration::ZERO, |acc, attempt| {
            acc.saturating_add(self.delay_for_attempt(attempt))
        })
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            CacheStoreConfig::DEFAULT_MAX_RETRIES,
            Duration::from_millis(CacheStoreConfig::DEFAULT_RETRY_INTERVAL_MS),
        )
    }
}
