//! Run reports.

use crate::core::{StepExecutionResult, StepStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the steps of a run were executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Worker pool only.
    Parallel,
    /// One step at a time only.
    Sequential,
    /// Started in parallel, then fell back to sequential.
    Mixed,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parallel => write!(f, "parallel"),
            Self::Sequential => write!(f, "sequential"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every step completed or was skipped.
    Completed,
    /// Every step is terminal and at least one failed, or the sequential
    /// path stopped on a failure.
    Failed,
    /// An abort stopped the run.
    Aborted,
    /// Nothing can run but these steps are unresolved.
    Stalled {
        /// Steps that are not terminal.
        unresolved: Vec<u32>,
    },
}

impl RunOutcome {
    /// Returns true for [`RunOutcome::Completed`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Aggregated result of one scheduler run over a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRunReport {
    /// Plan id.
    pub plan_id: String,
    /// Run id, unique per call.
    pub run_id: String,
    /// Execution mode.
    pub mode: ExecutionMode,
    /// Final outcome.
    pub outcome: RunOutcome,
    /// One entry per step executed in this run, in settle order.
    pub results: Vec<StepExecutionResult>,
    /// Wall time of the run.
    pub duration_ms: u64,
}

impl PlanRunReport {
    /// Returns the result for a step, if it ran.
    #[must_use]
    pub fn result(&self, step_number: u32) -> Option<&StepExecutionResult> {
        self.results.iter().find(|r| r.step_number == step_number)
    }

    /// Step numbers that completed in this run.
    #[must_use]
    pub fn completed_steps(&self) -> Vec<u32> {
        self.steps_with(StepStatus::Completed)
    }

    /// Step numbers that failed in this run.
    #[must_use]
    pub fn failed_steps(&self) -> Vec<u32> {
        self.steps_with(StepStatus::Failed)
    }

    fn steps_with(&self, status: StepStatus) -> Vec<u32> {
        self.results
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.step_number)
            .collect()
    }
}
