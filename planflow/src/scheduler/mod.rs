//! Plan scheduling.
//!
//! [`ParallelScheduler`] drives a registered plan to completion using an
//! externally supplied [`StepExecutor`], honoring dependencies, a worker
//! limit, per-attempt timeouts, retries and the shared circuit breaker.

mod executor;
mod options;
mod parallel;
mod report;
mod retry;

#[cfg(test)]
mod integration_tests;

pub use executor::{PlanSupplier, StepExecutor};
pub use options::ParallelExecutionOptions;
pub use parallel::ParallelScheduler;
pub use report::{ExecutionMode, PlanRunReport, RunOutcome};
pub use retry::{BackoffStrategy, JitterStrategy, RetryBackoff, RetryPolicy};

#[cfg(test)]
pub use executor::MockPlanSupplier;
