//! Progress summaries.

use crate::core::{PlanExecutionState, StepStatus};
use serde::{Deserialize, Serialize};

/// Best-effort snapshot of a plan's step counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionProgress {
    /// Number of steps.
    pub total: usize,
    /// Completed steps.
    pub completed: usize,
    /// Failed steps.
    pub failed: usize,
    /// Skipped steps.
    pub skipped: usize,
    /// Running steps.
    pub in_progress: usize,
    /// Steps blocked by a failed dependency.
    pub blocked: usize,
    /// Steps ready to launch.
    pub ready: usize,
    /// Steps waiting on unresolved dependencies.
    pub pending: usize,
    /// Share of resolved (completed or skipped) steps, 0-100.
    pub percentage: u32,
}

impl ExecutionProgress {
    /// Summarizes a plan state.
    #[must_use]
    pub fn from_state(state: &PlanExecutionState) -> Self {
        let mut progress = Self {
            total: state.steps.len(),
            ..Self::default()
        };

        for step in &state.steps {
            match step.status {
                StepStatus::Completed => progress.completed += 1,
                StepStatus::Failed => progress.failed += 1,
                StepStatus::Skipped => progress.skipped += 1,
                StepStatus::InProgress => progress.in_progress += 1,
                StepStatus::Blocked => progress.blocked += 1,
                StepStatus::Ready => progress.ready += 1,
                StepStatus::Pending => progress.pending += 1,
            }
        }

        if progress.total > 0 {
            let done = (progress.completed + progress.skipped) as f64;
            progress.percentage = (done * 100.0 / progress.total as f64).round() as u32;
        }

        progress
    }

    /// Returns true once nothing is left to run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completed + self.failed + self.skipped == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Plan, Step};

    #[test]
    fn test_counts_and_percentage() {
        let plan = Plan::new("p").with_steps((1..=3).map(Step::new));
        let mut state = PlanExecutionState::from_plan(&plan);
        state.steps[0].status = StepStatus::Completed;
        state.steps[1].status = StepStatus::InProgress;
        state.steps[2].status = StepStatus::Blocked;

        let progress = ExecutionProgress::from_state(&state);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.in_progress, 1);
        assert_eq!(progress.blocked, 1);
        assert_eq!(progress.percentage, 33);
        assert!(!progress.is_finished());
    }

    #[test]
    fn test_empty_plan() {
        let state = PlanExecutionState::from_plan(&Plan::new("empty"));
        let progress = ExecutionProgress::from_state(&state);
        assert_eq!(progress.percentage, 0);
        assert!(progress.is_finished());
    }
}
