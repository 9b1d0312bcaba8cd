//! Transient execution state for plans and their steps.

use super::{Plan, PlanStatus, Step, StepStatus};
use crate::utils::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Execution state of a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepExecutionState {
    /// Step number within the plan.
    pub step_number: u32,
    /// Stable step id.
    pub step_id: String,
    /// Current status.
    pub status: StepStatus,
    /// Normalized dependencies.
    #[serde(default)]
    pub depends_on: Vec<u32>,
    /// Normalized dependents.
    #[serde(default)]
    pub blocks: Vec<u32>,
    /// When the step last moved to `InProgress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// When the step reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    /// Wall time between start and completion in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Number of retries consumed.
    #[serde(default)]
    pub retry_count: u32,
    /// Last error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Files reported as modified by the executor.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_modified: Vec<String>,
    /// Free-form completion notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Step whose failure or skip cascaded into this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_because_of: Option<u32>,
}

impl StepExecutionState {
    /// Creates the initial state for a step.
    #[must_use]
    pub fn from_step(step: &Step) -> Self {
        Self {
            step_number: step.step_number,
            step_id: step.id.clone(),
            status: StepStatus::Pending,
            depends_on: step.depends_on.clone(),
            blocks: step.blocks.clone(),
            started_at: None,
            completed_at: None,
            duration_ms: None,
            retry_count: 0,
            error: None,
            files_modified: Vec::new(),
            notes: None,
            skipped_because_of: None,
        }
    }

    /// Stamps the completion time and derives the duration.
    pub(crate) fn finish(&mut self, status: StepStatus) {
        let now = Utc::now();
        self.status = status;
        self.completed_at = Some(now);
        if let Some(started) = self.started_at {
            let elapsed = now.signed_duration_since(started).num_milliseconds();
            self.duration_ms = Some(u64::try_from(elapsed).unwrap_or(0));
        }
    }
}

/// Execution state of a whole plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanExecutionState {
    /// Plan id.
    pub plan_id: String,
    /// Plan version the state was built from.
    pub plan_version: u32,
    /// Plan-level status.
    pub status: PlanStatus,
    /// Per-step state in plan order.
    pub steps: Vec<StepExecutionState>,
    /// Steps currently in progress.
    #[serde(default)]
    pub current_steps: Vec<u32>,
    /// Steps ready to launch.
    #[serde(default)]
    pub ready_steps: Vec<u32>,
    /// Steps waiting on unresolved or failed dependencies.
    #[serde(default)]
    pub blocked_steps: Vec<u32>,
    /// When the first step started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// When the plan reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    /// Last mutation time.
    pub updated_at: Timestamp,
}

impl PlanExecutionState {
    /// Creates a fresh state for a (normalized) plan.
    #[must_use]
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            plan_id: plan.id.clone(),
            plan_version: plan.version,
            status: PlanStatus::Ready,
            steps: plan.steps.iter().map(StepExecutionState::from_step).collect(),
            current_steps: Vec::new(),
            ready_steps: Vec::new(),
            blocked_steps: Vec::new(),
            started_at: None,
            completed_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Looks up a step.
    #[must_use]
    pub fn step(&self, step_number: u32) -> Option<&StepExecutionState> {
        self.steps.iter().find(|s| s.step_number == step_number)
    }

    /// Looks up a step mutably.
    pub fn step_mut(&mut self, step_number: u32) -> Option<&mut StepExecutionState> {
        self.steps.iter_mut().find(|s| s.step_number == step_number)
    }

    /// Returns the status of a step, if present.
    #[must_use]
    pub fn status_of(&self, step_number: u32) -> Option<StepStatus> {
        self.step(step_number).map(|s| s.status)
    }

    /// Returns true when every step is terminal.
    #[must_use]
    pub fn all_terminal(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    /// Returns the step numbers that are not terminal.
    #[must_use]
    pub fn unresolved_steps(&self) -> Vec<u32> {
        self.steps
            .iter()
            .filter(|s| !s.status.is_terminal())
            .map(|s| s.step_number)
            .collect()
    }

    /// Returns true if any step failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }
}
