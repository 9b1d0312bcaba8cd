//! Collaborator seams: the step executor and the plan supplier.

use crate::core::{Plan, StepOutcome};
use async_trait::async_trait;

/// Runs one step of a plan.
///
/// Implementations must be safe to retry and must not touch scheduler state.
/// A timed-out attempt is cancelled by dropping its future, so work spawned
/// elsewhere by the executor is only stopped on a best-effort basis.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Executes `step_number` of `plan_id`.
    async fn execute(&self, plan_id: &str, step_number: u32) -> StepOutcome;
}

/// Looks plans up by id, used when resuming or resetting a plan.
#[cfg_attr(test, mockall::automock)]
pub trait PlanSupplier: Send + Sync {
    /// Returns the plan, or `None` if it is unknown.
    fn load_plan(&self, plan_id: &str) -> Option<Plan>;
}
