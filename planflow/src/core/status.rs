//! Step and plan status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step has not been evaluated or is waiting on unresolved dependencies.
    Pending,
    /// All dependencies are resolved; the step can be launched.
    Ready,
    /// Step is currently running.
    InProgress,
    /// Step completed successfully.
    Completed,
    /// Step failed terminally.
    Failed,
    /// Step was skipped, explicitly or by cascade.
    Skipped,
    /// A dependency failed, so the step cannot run.
    Blocked,
}

impl Default for StepStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

impl StepStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Returns true if dependents may treat this step as satisfied.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }

    /// Returns true if the step may be moved to `InProgress`.
    #[must_use]
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Pending | Self::Ready)
    }
}

/// The execution status of a whole plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Initialized, no step started yet.
    Ready,
    /// At least one step has started.
    Executing,
    /// Every step completed or was skipped.
    Completed,
    /// Every step is terminal and at least one failed, or the run was halted.
    Failed,
}

impl Default for PlanStatus {
    fn default() -> Self {
        Self::Ready
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Executing => write!(f, "executing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl PlanStatus {
    /// Returns true once the plan can no longer make progress.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}
