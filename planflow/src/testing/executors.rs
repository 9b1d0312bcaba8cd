//! Step executor doubles.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::core::StepOutcome;
use crate::scheduler::StepExecutor;

/// Succeeds for every step, optionally reporting files.
#[derive(Debug, Default)]
pub struct SucceedingExecutor {
    files: Vec<String>,
}

impl SucceedingExecutor {
    /// Creates an executor that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports these files as modified on every success.
    #[must_use]
    pub fn with_files(files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl StepExecutor for SucceedingExecutor {
    async fn execute(&self, _plan_id: &str, _step_number: u32) -> StepOutcome {
        StepOutcome::ok_with_files(self.files.clone())
    }
}

/// Fails the listed steps (or every step) on every attempt and succeeds for the rest.
#[derive(Debug)]
pub struct FailingExecutor {
    failing: Option<Vec<u32>>,
    error: String,
}

impl FailingExecutor {
    /// Creates an executor that fails `steps`.
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = u32>, error: impl Into<String>) -> Self {
        Self {
            failing: Some(steps.into_iter().collect()),
            error: error.into(),
        }
    }

    /// Creates an executor that fails every step.
    #[must_use]
    pub fn always(error: impl Into<String>) -> Self {
        Self {
            failing: None,
            error: error.into(),
        }
    }

    fn fails(&self, step: u32) -> bool {
        self.failing.as_ref().map_or(true, |steps| steps.contains(&step))
    }
}

#[async_trait]
impl StepExecutor for FailingExecutor {
    async fn execute(&self, _plan_id: &str, step_number: u32) -> StepOutcome {
        if self.fails(step_number) {
            StepOutcome::fail(self.error.clone())
        } else {
            StepOutcome::ok()
        }
    }
}

/// Replays scripted outcomes per step, then succeeds once a script runs out.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    scripts: Mutex<HashMap<u32, VecDeque<StepOutcome>>>,
    delays: HashMap<u32, Duration>,
    calls: Mutex<Vec<u32>>,
}

impl ScriptedExecutor {
    /// Creates an executor with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues outcomes for a step, returned one per attempt.
    #[must_use]
    pub fn script(self, step: u32, outcomes: impl IntoIterator<Item = StepOutcome>) -> Self {
        self.scripts
            .lock()
            .entry(step)
            .or_default()
            .extend(outcomes);
        self
    }

    /// Makes every attempt of `step` sleep first.
    #[must_use]
    pub fn delay(mut self, step: u32, delay: Duration) -> Self {
        self.delays.insert(step, delay);
        self
    }

    /// Step numbers in call order, one entry per attempt.
    #[must_use]
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().clone()
    }

    /// Number of attempts made for `step`.
    #[must_use]
    pub fn attempts(&self, step: u32) -> usize {
        self.calls.lock().iter().filter(|s| **s == step).count()
    }
}

#[async_trait]
impl StepExecutor for ScriptedExecutor {
    async fn execute(&self, _plan_id: &str, step_number: u32) -> StepOutcome {
        self.calls.lock().push(step_number);
        if let Some(delay) = self.delays.get(&step_number) {
            tokio::time::sleep(*delay).await;
        }
        self.scripts
            .lock()
            .get_mut(&step_number)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(StepOutcome::ok)
    }
}

/// Sleeps before succeeding. Per-step delays override the default.
#[derive(Debug)]
pub struct SlowExecutor {
    delay: Duration,
    overrides: HashMap<u32, Duration>,
}

impl SlowExecutor {
    /// Creates an executor that sleeps `delay` per step.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            overrides: HashMap::new(),
        }
    }

    /// Creates a slow executor with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Uses a different delay for one step.
    #[must_use]
    pub fn with_step_delay(mut self, step: u32, delay: Duration) -> Self {
        self.overrides.insert(step, delay);
        self
    }
}

#[async_trait]
impl StepExecutor for SlowExecutor {
    async fn execute(&self, _plan_id: &str, step_number: u32) -> StepOutcome {
        let delay = self.overrides.get(&step_number).copied().unwrap_or(self.delay);
        tokio::time::sleep(delay).await;
        StepOutcome::ok()
    }
}

/// Records start/finish order and the peak number of concurrent executions.
#[derive(Debug)]
pub struct RecordingExecutor {
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
    log: Mutex<Vec<ExecutionRecord>>,
}

/// One entry in a [`RecordingExecutor`] log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionRecord {
    /// The executor was entered for this step.
    Started(u32),
    /// The executor returned for this step.
    Finished(u32),
}

impl RecordingExecutor {
    /// Creates a recorder whose executions each take `delay`.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Highest number of executions observed at once.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// The start/finish log.
    #[must_use]
    pub fn log(&self) -> Vec<ExecutionRecord> {
        self.log.lock().clone()
    }

    /// Steps in the order they were started.
    #[must_use]
    pub fn start_order(&self) -> Vec<u32> {
        self.log
            .lock()
            .iter()
            .filter_map(|r| match r {
                ExecutionRecord::Started(s) => Some(*s),
                ExecutionRecord::Finished(_) => None,
            })
            .collect()
    }

    /// Position of a record in the log.
    #[must_use]
    pub fn position(&self, record: ExecutionRecord) -> Option<usize> {
        self.log.lock().iter().position(|r| *r == record)
    }
}

#[async_trait]
impl StepExecutor for RecordingExecutor {
    async fn execute(&self, _plan_id: &str, step_number: u32) -> StepOutcome {
        {
            let mut log = self.log.lock();
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            log.push(ExecutionRecord::Started(step_number));
        }

        tokio::time::sleep(self.delay).await;

        let mut log = self.log.lock();
        self.running.fetch_sub(1, Ordering::SeqCst);
        log.push(ExecutionRecord::Finished(step_number));
        StepOutcome::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_executor_replays_then_succeeds() {
        let executor = ScriptedExecutor::new().script(1, [StepOutcome::fail("first"), StepOutcome::ok()]);

        assert!(!executor.execute("p", 1).await.success);
        assert!(executor.execute("p", 1).await.success);
        assert!(executor.execute("p", 1).await.success);
        assert!(executor.execute("p", 2).await.success);
        assert_eq!(executor.attempts(1), 3);
        assert_eq!(executor.calls(), vec![1, 1, 1, 2]);
    }

    #[tokio::test]
    async fn test_failing_executor() {
        let some = FailingExecutor::new([2], "nope");
        assert!(some.execute("p", 1).await.success);
        assert_eq!(some.execute("p", 2).await.error.as_deref(), Some("nope"));

        let all = FailingExecutor::always("down");
        assert!(!all.execute("p", 7).await.success);
    }

    #[tokio::test]
    async fn test_recording_executor_tracks_peak() {
        let executor = RecordingExecutor::new(Duration::from_millis(20));
        let (a, b) = tokio::join!(executor.execute("p", 1), executor.execute("p", 2));
        assert!(a.success && b.success);
        assert_eq!(executor.peak_concurrency(), 2);
        assert_eq!(executor.log().len(), 4);
    }

    #[test]
    fn test_succeeding_executor_blocking() {
        let executor = SucceedingExecutor::with_files(["a.rs"]);
        let outcome = tokio_test::block_on(executor.execute("p", 1));
        assert_eq!(outcome.files_modified, vec!["a.rs".to_string()]);
    }
}
