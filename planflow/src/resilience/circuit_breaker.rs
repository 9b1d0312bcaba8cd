//! Circuit breaker governing parallel execution.
//!
//! One breaker is shared by every plan a scheduler runs. While it is open the
//! scheduler demotes runs to sequential execution; after the reset timeout it
//! moves to half-open on the next check and closes again after enough
//! consecutive successes.

use crate::config::duration_ms;
use crate::utils::{now_utc, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Normal operation, parallel execution allowed.
    Closed,
    /// Too many consecutive failures, parallel execution disabled.
    Open,
    /// Testing recovery.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Thresholds for the circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open a closed circuit.
    pub failure_threshold: u32,
    /// Time an open circuit waits before going half-open, in milliseconds.
    pub reset_timeout_ms: u64,
    /// Consecutive half-open successes that close the circuit.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 60_000,
            success_threshold: 2,
        }
    }
}

impl CircuitBreakerConfig {
    /// Creates a default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure threshold.
    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the reset timeout.
    #[must_use]
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout_ms = duration_ms(timeout);
        self
    }

    /// Sets the success threshold.
    #[must_use]
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Returns the reset timeout.
    #[must_use]
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}

/// Point-in-time view of the breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerSnapshot {
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failures counted while closed (or the one that reopened it).
    pub consecutive_failures: u32,
    /// Consecutive successes counted while half-open.
    pub consecutive_successes: u32,
    /// When the circuit last opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<Timestamp>,
    /// Failures recorded since creation or the last reset.
    pub total_failures: u64,
    /// Of which were timeouts.
    pub timeout_failures: u64,
    /// Active configuration.
    pub config: CircuitBreakerConfig,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    opened_at_wall: Option<Timestamp>,
    total_failures: u64,
    timeout_failures: u64,
    config: CircuitBreakerConfig,
}

impl BreakerInner {
    fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            opened_at: None,
            opened_at_wall: None,
            total_failures: 0,
            timeout_failures: 0,
            config,
        }
    }

    fn refresh(&mut self) {
        if self.state != CircuitState::Open {
            return;
        }
        let elapsed = self.opened_at.map_or(Duration::MAX, |at| at.elapsed());
        if elapsed >= self.config.reset_timeout() {
            self.state = CircuitState::HalfOpen;
            self.consecutive_successes = 0;
            info!("Circuit breaker: Open -> HalfOpen (reset timeout elapsed)");
        }
    }

    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.opened_at_wall = Some(now_utc());
        self.consecutive_successes = 0;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;
        self.opened_at = None;
        self.opened_at_wall = None;
    }
}

/// Consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        info!(
            failure_threshold = config.failure_threshold,
            reset_timeout_ms = config.reset_timeout_ms,
            success_threshold = config.success_threshold,
            "Circuit breaker initialized"
        );
        Self {
            inner: Mutex::new(BreakerInner::new(config)),
        }
    }

    /// Returns the current state, moving Open to HalfOpen once the reset timeout elapsed.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        inner.refresh();
        inner.state
    }

    /// Returns true if the parallel path may run.
    pub fn allows_parallel(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Records a successful step.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.refresh();

        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.consecutive_successes += 1;
                debug!(
                    successes = inner.consecutive_successes,
                    threshold = inner.config.success_threshold,
                    "Circuit breaker: half-open success"
                );
                if inner.consecutive_successes >= inner.config.success_threshold {
                    inner.close();
                    info!("Circuit breaker: HalfOpen -> Closed (recovery successful)");
                }
            }
            CircuitState::Open => {
                debug!("Success recorded while circuit is open");
            }
        }
    }

    /// Records a terminal step failure.
    pub fn record_failure(&self, timed_out: bool) {
        let mut inner = self.inner.lock();
        inner.refresh();
        inner.total_failures += 1;
        if timed_out {
            inner.timeout_failures += 1;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= inner.config.failure_threshold {
                    inner.open();
                    warn!(
                        consecutive_failures = inner.consecutive_failures,
                        timed_out,
                        "Circuit breaker: Closed -> Open (failure threshold reached)"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.consecutive_failures = 1;
                inner.open();
                warn!(timed_out, "Circuit breaker: HalfOpen -> Open (recovery attempt failed)");
            }
            CircuitState::Open => {
                inner.consecutive_failures += 1;
            }
        }
    }

    /// Returns a snapshot of the breaker.
    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let mut inner = self.inner.lock();
        inner.refresh();
        CircuitBreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            opened_at: inner.opened_at_wall,
            total_failures: inner.total_failures,
            timeout_failures: inner.timeout_failures,
            config: inner.config.clone(),
        }
    }

    /// Replaces the configuration, keeping the current state and counters.
    pub fn configure(&self, config: CircuitBreakerConfig) {
        let mut inner = self.inner.lock();
        info!(
            failure_threshold = config.failure_threshold,
            reset_timeout_ms = config.reset_timeout_ms,
            success_threshold = config.success_threshold,
            "Circuit breaker reconfigured"
        );
        inner.config = config;
    }

    /// Forces the breaker closed and clears all counters.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let config = inner.config.clone();
        *inner = BreakerInner::new(config);
        info!("Circuit breaker reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failures: u32, reset_ms: u64, successes: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            CircuitBreakerConfig::new()
                .with_failure_threshold(failures)
                .with_reset_timeout(Duration::from_millis(reset_ms))
                .with_success_threshold(successes),
        )
    }

    #[test]
    fn test_starts_closed() {
        let cb = CircuitBreaker::default();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allows_parallel());
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = breaker(3, 60_000, 1);
        cb.record_failure(false);
        cb.record_failure(true);
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_failure(false);
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allows_parallel());

        let snap = cb.snapshot();
        assert_eq!(snap.total_failures, 3);
        assert_eq!(snap.timeout_failures, 1);
        assert!(snap.opened_at.is_some());
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let cb = breaker(2, 60_000, 1);
        cb.record_failure(false);
        cb.record_success();
        cb.record_failure(false);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_after_reset_timeout_then_closes() {
        let cb = breaker(1, 20, 2);
        cb.record_failure(false);
        assert_eq!(cb.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(!cb.allows_parallel());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().consecutive_failures, 0);
    }

    #[test]
    fn test_successes_after_timeout_without_check_still_close() {
        let cb = breaker(1, 10, 1);
        cb.record_failure(false);
        std::thread::sleep(Duration::from_millis(30));
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let cb = breaker(1, 10, 3);
        cb.record_failure(false);
        std::thread::sleep(Duration::from_millis(30));
        cb.record_success();
        assert_eq!(cb.snapshot().consecutive_successes, 1);

        cb.record_failure(true);
        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::Open);
        assert_eq!(snap.consecutive_successes, 0);
    }

    #[test]
    fn test_configure_and_reset() {
        let cb = breaker(1, 60_000, 1);
        cb.record_failure(false);
        assert_eq!(cb.state(), CircuitState::Open);

        cb.configure(CircuitBreakerConfig::new().with_failure_threshold(10));
        assert_eq!(cb.snapshot().config.failure_threshold, 10);
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();
        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::Closed);
        assert_eq!(snap.total_failures, 0);
        assert_eq!(snap.config.failure_threshold, 10);
    }

    #[test]
    fn test_state_serializes_kebab_case() {
        let json = serde_json::to_string(&CircuitState::HalfOpen).unwrap();
        assert_eq!(json, r#""half-open""#);
    }
}
