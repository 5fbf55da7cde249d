use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the delay grows between retries of one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum RetryStrategy {
    /// base, 2×base, 4×base, ...
    #[default]
    #[value(name = "exponential")]
    #[serde(rename = "exponential")]
    ExponentialBackoff,
    /// base, 2×base, 3×base, ...
    #[value(name = "linear")]
    #[serde(rename = "linear")]
    LinearBackoff,
    /// base every time
    #[value(name = "fixed")]
    #[serde(rename = "fixed")]
    FixedDelay,
}

/// Bounded retry of a single write.
///
/// `max_attempts` counts retries after the first attempt; 0 disables retry so
/// a failed write is handed straight to the failure policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: RetryStrategy,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            strategy: RetryStrategy::ExponentialBackoff,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_millis = self.base_delay.as_millis() as u64;
        let base_delay = match self.strategy {
            RetryStrategy::ExponentialBackoff => {
                let multiplier = 2_u64.checked_pow(attempt).unwrap_or(u64::MAX);
                Duration::from_millis(base_millis.saturating_mul(multiplier))
            }
            RetryStrategy::LinearBackoff => {
                Duration::from_millis(base_millis.saturating_mul(attempt as u64 + 1))
            }
            RetryStrategy::FixedDelay => self.base_delay,
        };

        let capped_delay = std::cmp::min(base_delay, self.max_delay);

        if self.jitter {
            apply_jitter(capped_delay)
        } else {
            capped_delay
        }
    }
}

fn apply_jitter(delay: Duration) -> Duration {
    let mut rng = rand::rng();
    let jitter_factor = rng.random_range(0.5..1.5); // ±50% jitter
    let jittered_millis = (delay.as_millis() as f64 * jitter_factor) as u64;
    Duration::from_millis(jittered_millis)
}
