//! Delays between step attempts.
//!
//! The attempt budget itself is `ParallelExecutionOptions::max_retries`; this
//! module only decides how long to wait before the next attempt. The default
//! policy retries immediately.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^retry
    #[default]
    Exponential,
    /// delay = base * (retry + 1)
    Linear,
    /// delay = base
    Constant,
}

/// Jitter applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
    /// min(max, random(base, prev * 3))
    Decorrelated,
}

/// Delay policy between attempts of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Base delay in milliseconds. Zero retries immediately.
    pub base_delay_ms: u64,
    /// Delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 0,
            max_delay_ms: 30_000,
            backoff: BackoffStrategy::Exponential,
            jitter: JitterStrategy::None,
        }
    }
}

impl RetryPolicy {
    /// Immediate retries.
    #[must_use]
    pub fn immediate() -> Self {
        Self::default()
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Returns a fresh per-step delay tracker.
    #[must_use]
    pub fn backoff(&self) -> RetryBackoff<'_> {
        RetryBackoff {
            policy: self,
            retries: 0,
            previous_ms: None,
        }
    }
}

/// Tracks delays for the retries of a single step.
#[derive(Debug)]
pub struct RetryBackoff<'a> {
    policy: &'a RetryPolicy,
    retries: u32,
    previous_ms: Option<u64>,
}

impl RetryBackoff<'_> {
    /// Returns the delay before the next retry and advances the counter.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.policy.base_delay_ms;
        let max = self.policy.max_delay_ms;
        if base == 0 {
            self.retries += 1;
            return Duration::ZERO;
        }

        let delay = match self.policy.backoff {
            BackoffStrategy::Exponential => base.saturating_mul(2u64.saturating_pow(self.retries)),
            BackoffStrategy::Linear => base.saturating_mul(u64::from(self.retries) + 1),
            BackoffStrategy::Constant => base,
        }
        .min(max);

        let jittered = match self.policy.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => rand::thread_rng().gen_range(0..=delay),
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
            JitterStrategy::Decorrelated => {
                let prev = self.previous_ms.unwrap_or(base);
                let upper = prev.saturating_mul(3).min(max);
                if upper <= base {
                    base
                } else {
                    rand::thread_rng().gen_range(base..=upper)
                }
            }
        };

        self.retries += 1;
        self.previous_ms = Some(jittered);
        Duration::from_millis(jittered)
    }

    /// Number of delays handed out so far.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }
}
