//! Worker pool, timeout and retry options.

use super::RetryPolicy;
use crate::config::duration_ms;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for the parallel path. Snapshotted at the start of every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelExecutionOptions {
    /// Maximum number of steps in flight at once.
    pub max_workers: usize,
    /// Per-attempt timeout in milliseconds.
    pub step_timeout_ms: u64,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Abort the whole run on the first terminal step failure.
    pub stop_on_failure: bool,
    /// Delay between attempts.
    pub retry: RetryPolicy,
}

impl Default for ParallelExecutionOptions {
    fn default() -> Self {
        Self {
            max_workers: 3,
            step_timeout_ms: 300_000,
            max_retries: 2,
            stop_on_failure: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl ParallelExecutionOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker limit.
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout_ms = duration_ms(timeout);
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets whether a terminal failure aborts the run.
    #[must_use]
    pub fn with_stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    /// Sets the delay policy between attempts.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Returns the per-attempt timeout.
    #[must_use]
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    /// Total attempts per step.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}
