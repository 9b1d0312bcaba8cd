//! Scheduler configuration.
//!
//! A single [`SchedulerConfig`] is handed to [`crate::scheduler::ParallelScheduler::new`].
//! Every field has a default, so partial JSON documents are accepted.

use crate::errors::PlanflowError;
use crate::resilience::CircuitBreakerConfig;
use crate::scheduler::ParallelExecutionOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How plan ingestion treats references to step numbers that do not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Drop dangling references with a warning.
    #[default]
    Lenient,
    /// Reject the plan.
    Strict,
}

/// Configuration for the state store janitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JanitorConfig {
    /// Sweep interval in milliseconds.
    pub interval_ms: u64,
    /// How long a terminal plan is kept, in milliseconds.
    pub ttl_ms: u64,
    /// Maximum number of plans held after a sweep.
    pub max_plans: usize,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            ttl_ms: 3_600_000,
            max_plans: 100,
        }
    }
}

impl JanitorConfig {
    /// Creates a default janitor config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sweep interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = duration_ms(interval);
        self
    }

    /// Sets the terminal-plan TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = duration_ms(ttl);
        self
    }

    /// Sets the plan capacity.
    #[must_use]
    pub fn with_max_plans(mut self, max_plans: usize) -> Self {
        self.max_plans = max_plans;
        self
    }

    /// Returns the sweep interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Returns the terminal-plan TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Top-level scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Whether the parallel path is used at all.
    pub parallel_enabled: bool,
    /// Worker pool, timeout and retry options.
    pub parallel: ParallelExecutionOptions,
    /// Circuit breaker thresholds.
    pub circuit_breaker: CircuitBreakerConfig,
    /// State store eviction.
    pub janitor: JanitorConfig,
    /// Plan ingestion policy.
    pub validation: ValidationPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            parallel_enabled: true,
            parallel: ParallelExecutionOptions::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            janitor: JanitorConfig::default(),
            validation: ValidationPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Creates a default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document and validates it.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON and a config error
    /// for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, PlanflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Enables or disables the parallel path.
    #[must_use]
    pub fn with_parallel_enabled(mut self, enabled: bool) -> Self {
        self.parallel_enabled = enabled;
        self
    }

    /// Sets the parallel execution options.
    #[must_use]
    pub fn with_parallel(mut self, options: ParallelExecutionOptions) -> Self {
        self.parallel = options;
        self
    }

    /// Sets the circuit breaker config.
    #[must_use]
    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    /// Sets the janitor config.
    #[must_use]
    pub fn with_janitor(mut self, config: JanitorConfig) -> Self {
        self.janitor = config;
        self
    }

    /// Sets the validation policy.
    #[must_use]
    pub fn with_validation(mut self, policy: ValidationPolicy) -> Self {
        self.validation = policy;
        self
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PlanflowError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), PlanflowError> {
        if self.parallel.max_workers == 0 {
            return Err(PlanflowError::Config("parallel.max_workers must be at least 1".into()));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(PlanflowError::Config(
                "circuit_breaker.failure_threshold must be at least 1".into(),
            ));
        }
        if self.circuit_breaker.success_threshold == 0 {
            return Err(PlanflowError::Config(
                "circuit_breaker.success_threshold must be at least 1".into(),
            ));
        }
        if self.janitor.max_plans == 0 {
            return Err(PlanflowError::Config("janitor.max_plans must be at least 1".into()));
        }
        Ok(())
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
