//! Per-plan, per-step execution state machine.
//!
//! Every plan's state lives in one [`DashMap`] entry, so all transitions for a
//! plan are serialized by the entry lock while different plans proceed
//! independently. Readiness is recomputed after every transition.
//!
//! Unknown plan ids and step numbers are not errors: operations return
//! `None` (or an empty list) and callers check for absence.

use super::ExecutionProgress;
use crate::cancellation::PlanRunControl;
use crate::config::ValidationPolicy;
use crate::core::{Plan, PlanExecutionState, PlanStatus, StepExecutionState, StepStatus};
use crate::errors::{PlanValidationError, PlanflowError};
use crate::graph::{validate_plan, validate_plan_id};
use crate::utils::{now_utc, Timestamp};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Retries granted by [`ExecutionStateMachine::fail_step`] with `retry = true`.
pub const MAX_STATE_RETRIES: u32 = 3;

/// Data recorded when a step completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepCompletion {
    /// Free-form notes.
    pub notes: Option<String>,
    /// Files modified by the step.
    pub files_modified: Vec<String>,
}

impl StepCompletion {
    /// Creates an empty completion record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets the modified files.
    #[must_use]
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files_modified = files;
        self
    }
}

/// How [`ExecutionStateMachine::fail_step`] should treat the failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailOptions {
    /// Return the step to pending if retries remain.
    pub retry: bool,
    /// Mark the step skipped instead of failed.
    pub skip: bool,
    /// Cascade a skip to every transitive dependent.
    pub skip_dependents: bool,
}

impl FailOptions {
    /// Terminal failure without cascade.
    #[must_use]
    pub fn terminal() -> Self {
        Self::default()
    }

    /// Terminal failure that skips all dependents.
    #[must_use]
    pub fn cascade() -> Self {
        Self {
            skip_dependents: true,
            ..Self::default()
        }
    }

    /// Retry if the retry budget allows it.
    #[must_use]
    pub fn retry() -> Self {
        Self {
            retry: true,
            ..Self::default()
        }
    }
}

/// Owns execution state for every registered plan.
#[derive(Debug)]
pub struct ExecutionStateMachine {
    plans: DashMap<String, PlanExecutionState>,
    controls: DashMap<String, Arc<PlanRunControl>>,
    policy: ValidationPolicy,
}

impl Default for ExecutionStateMachine {
    fn default() -> Self {
        Self::new(ValidationPolicy::default())
    }
}

impl ExecutionStateMachine {
    /// Creates an empty state machine.
    #[must_use]
    pub fn new(policy: ValidationPolicy) -> Self {
        Self {
            plans: DashMap::new(),
            controls: DashMap::new(),
            policy,
        }
    }

    /// Returns the ingestion policy.
    #[must_use]
    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Validates a plan and registers fresh state for it, replacing any previous state.
    ///
    /// # Errors
    ///
    /// Returns the validation error if the plan is malformed.
    pub fn initialize_execution(&self, plan: &Plan) -> Result<PlanExecutionState, PlanValidationError> {
        let normalized = validate_plan(plan, self.policy)?;
        let mut state = PlanExecutionState::from_plan(&normalized);
        recompute(&mut state);

        info!(
            plan_id = %plan.id,
            plan_version = plan.version,
            steps = state.steps.len(),
            ready = ?state.ready_steps,
            "Initialized plan execution"
        );

        self.plans.insert(plan.id.clone(), state.clone());
        self.controls.insert(plan.id.clone(), Arc::new(PlanRunControl::new()));
        Ok(state)
    }

    /// Discards existing state and control flags and re-initializes from `plan`.
    ///
    /// # Errors
    ///
    /// Returns the validation error if the plan is malformed.
    pub fn reset_execution(&self, plan: &Plan) -> Result<PlanExecutionState, PlanValidationError> {
        if self.plans.contains_key(&plan.id) {
            info!(plan_id = %plan.id, "Resetting plan execution");
        }
        self.initialize_execution(plan)
    }

    /// Returns true if the plan is registered.
    #[must_use]
    pub fn contains(&self, plan_id: &str) -> bool {
        self.plans.contains_key(plan_id)
    }

    /// Returns a copy of a plan's state.
    #[must_use]
    pub fn get_state(&self, plan_id: &str) -> Option<PlanExecutionState> {
        self.plans.get(plan_id).map(|s| s.clone())
    }

    /// Returns a copy of one step's state.
    #[must_use]
    pub fn get_step(&self, plan_id: &str, step_number: u32) -> Option<StepExecutionState> {
        self.plans
            .get(plan_id)
            .and_then(|s| s.step(step_number).cloned())
    }

    /// Returns the control flags of a plan.
    #[must_use]
    pub fn control(&self, plan_id: &str) -> Option<Arc<PlanRunControl>> {
        self.controls.get(plan_id).map(|c| Arc::clone(c.value()))
    }

    /// Moves a pending or ready step to in progress.
    ///
    /// Returns `None` for unknown ids or when the step is in any other status.
    pub fn start_step(&self, plan_id: &str, step_number: u32) -> Option<StepExecutionState> {
        self.with_plan(plan_id, |state| {
            let step = state.step_mut(step_number)?;
            if !step.status.can_start() {
                warn!(
                    plan_id,
                    step = step_number,
                    status = %step.status,
                    "Rejected start of step that is not pending or ready"
                );
                return None;
            }

            let now = now_utc();
            step.status = StepStatus::InProgress;
            step.started_at = Some(now);
            step.completed_at = None;
            step.duration_ms = None;
            let snapshot = step.clone();

            if state.status == PlanStatus::Ready {
                state.status = PlanStatus::Executing;
            }
            state.started_at.get_or_insert(now);
            recompute(state);

            debug!(plan_id, step = step_number, "Step started");
            Some(snapshot)
        })
        .flatten()
    }

    /// Marks a step completed and records notes and modified files.
    ///
    /// Returns `None` for unknown ids or when the step is not in progress.
    pub fn complete_step(
        &self,
        plan_id: &str,
        step_number: u32,
        completion: StepCompletion,
    ) -> Option<StepExecutionState> {
        self.with_plan(plan_id, |state| {
            let step = state.step_mut(step_number)?;
            if step.status != StepStatus::InProgress {
                warn!(
                    plan_id,
                    step = step_number,
                    status = %step.status,
                    "Rejected completion of step that is not in progress"
                );
                return None;
            }

            step.finish(StepStatus::Completed);
            step.error = None;
            step.notes = completion.notes;
            step.files_modified = completion.files_modified;
            let snapshot = step.clone();

            recompute(state);
            debug!(plan_id, step = step_number, duration_ms = ?snapshot.duration_ms, "Step completed");
            Some(snapshot)
        })
        .flatten()
    }

    /// Records a step failure.
    ///
    /// With `retry` and fewer than [`MAX_STATE_RETRIES`] retries used, the step
    /// returns to pending. Otherwise it becomes skipped (`skip`) or failed, and
    /// `skip_dependents` cascades a skip to every transitive dependent.
    pub fn fail_step(
        &self,
        plan_id: &str,
        step_number: u32,
        error: impl Into<String>,
        options: FailOptions,
    ) -> Option<StepExecutionState> {
        let error = error.into();
        self.with_plan(plan_id, |state| {
            let step = state.step_mut(step_number)?;
            step.error = Some(error);

            if options.retry && step.retry_count < MAX_STATE_RETRIES {
                step.retry_count += 1;
                step.status = StepStatus::Pending;
                step.completed_at = None;
                debug!(plan_id, step = step_number, retry_count = step.retry_count, "Step returned to pending for retry");
            } else if options.skip {
                step.finish(StepStatus::Skipped);
            } else {
                step.finish(StepStatus::Failed);
                warn!(plan_id, step = step_number, error = ?step.error, "Step failed");
            }

            let terminal = step.status.is_terminal();
            if terminal && options.skip_dependents {
                cascade_skip(state, step_number);
            }

            recompute(state);
            state.step(step_number).cloned()
        })
        .flatten()
    }

    /// Marks a step skipped, optionally cascading to its dependents.
    pub fn skip_step(
        &self,
        plan_id: &str,
        step_number: u32,
        reason: impl Into<String>,
        skip_dependents: bool,
    ) -> Option<StepExecutionState> {
        let reason = reason.into();
        self.with_plan(plan_id, |state| {
            let step = state.step_mut(step_number)?;
            step.finish(StepStatus::Skipped);
            step.notes = Some(reason);

            if skip_dependents {
                cascade_skip(state, step_number);
            }

            recompute(state);
            debug!(plan_id, step = step_number, "Step skipped");
            state.step(step_number).cloned()
        })
        .flatten()
    }

    /// Skips every transitive dependent of `step_number` and returns the skipped steps.
    pub fn skip_dependent_steps(&self, plan_id: &str, step_number: u32) -> Vec<u32> {
        self.with_plan(plan_id, |state| {
            if state.step(step_number).is_none() {
                return Vec::new();
            }
            let skipped = cascade_skip(state, step_number);
            recompute(state);
            skipped
        })
        .unwrap_or_default()
    }

    /// Counts a scheduler retry against a running step. Returns the new retry count.
    pub fn record_retry_attempt(&self, plan_id: &str, step_number: u32, error: &str) -> Option<u32> {
        self.with_plan(plan_id, |state| {
            let step = state.step_mut(step_number)?;
            step.retry_count += 1;
            step.error = Some(error.to_string());
            let count = step.retry_count;
            state.updated_at = now_utc();
            Some(count)
        })
        .flatten()
    }

    /// Returns the ready steps in plan order.
    #[must_use]
    pub fn ready_steps(&self, plan_id: &str) -> Vec<u32> {
        self.plans
            .get(plan_id)
            .map(|s| s.ready_steps.clone())
            .unwrap_or_default()
    }

    /// Returns a progress snapshot.
    #[must_use]
    pub fn get_progress(&self, plan_id: &str) -> Option<ExecutionProgress> {
        self.plans.get(plan_id).map(|s| ExecutionProgress::from_state(&s))
    }

    /// Returns the unresolved steps of a plan that can make no further progress:
    /// nothing is ready or running, yet some steps are not terminal.
    #[must_use]
    pub fn stalled_steps(&self, plan_id: &str) -> Vec<u32> {
        self.plans
            .get(plan_id)
            .filter(|s| s.ready_steps.is_empty() && s.current_steps.is_empty())
            .map(|s| s.unresolved_steps())
            .unwrap_or_default()
    }

    /// Marks a plan failed without touching its steps (used when a run stops early).
    pub fn halt_plan(&self, plan_id: &str, reason: &str) -> bool {
        self.with_plan(plan_id, |state| {
            if state.status.is_terminal() {
                return;
            }
            let now = now_utc();
            state.status = PlanStatus::Failed;
            state.completed_at = Some(now);
            state.updated_at = now;
            warn!(plan_id, reason, unresolved = ?state.unresolved_steps(), "Plan halted");
        })
        .is_some()
    }

    /// Serializes a plan's state to plain JSON.
    #[must_use]
    pub fn export_state(&self, plan_id: &str) -> Option<serde_json::Value> {
        let state = self.plans.get(plan_id)?;
        match serde_json::to_value(&*state) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(plan_id, error = %err, "Failed to export plan state");
                None
            }
        }
    }

    /// Registers a previously exported state. Returns the plan id.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a valid plan state.
    pub fn import_state(&self, value: serde_json::Value) -> Result<String, PlanflowError> {
        let state: PlanExecutionState = serde_json::from_value(value)?;
        validate_plan_id(&state.plan_id)?;

        let plan_id = state.plan_id.clone();
        info!(plan_id = %plan_id, status = %state.status, "Imported plan state");
        self.plans.insert(plan_id.clone(), state);
        self.controls
            .entry(plan_id.clone())
            .or_insert_with(|| Arc::new(PlanRunControl::new()));
        Ok(plan_id)
    }

    /// Removes a plan and its control flags.
    pub fn remove_plan(&self, plan_id: &str) -> bool {
        self.controls.remove(plan_id);
        self.plans.remove(plan_id).is_some()
    }

    /// Removes a plan only if it is still terminal, together with its control flags.
    ///
    /// The status check and the removal happen under the entry lock, so a plan
    /// that was reset or re-imported after being observed as terminal survives.
    pub(crate) fn evict_if_terminal(&self, plan_id: &str) -> bool {
        if self.plans.remove_if(plan_id, |_, s| s.status.is_terminal()).is_none() {
            return false;
        }
        self.controls.remove_if(plan_id, |_, _| !self.plans.contains_key(plan_id));
        true
    }

    /// Returns all registered plan ids.
    #[must_use]
    pub fn plan_ids(&self) -> Vec<String> {
        self.plans.iter().map(|e| e.key().clone()).collect()
    }

    /// Returns the number of registered plans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Returns true if no plans are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Terminal plans with the time they finished.
    pub(crate) fn terminal_plans(&self) -> Vec<(String, Timestamp)> {
        self.plans
            .iter()
            .filter(|e| e.status.is_terminal())
            .map(|e| (e.key().clone(), e.completed_at.unwrap_or(e.updated_at)))
            .collect()
    }

    fn with_plan<R>(&self, plan_id: &str, f: impl FnOnce(&mut PlanExecutionState) -> R) -> Option<R> {
        let mut entry = self.plans.get_mut(plan_id)?;
        Some(f(&mut entry))
    }
}

/// Skips transitive dependents of `root` using an explicit worklist.
///
/// Steps already terminal or running are left alone and not traversed.
fn cascade_skip(state: &mut PlanExecutionState, root: u32) -> Vec<u32> {
    let mut skipped = Vec::new();
    let mut visited: HashSet<u32> = HashSet::from([root]);
    let mut stack: Vec<(u32, u32)> = state
        .step(root)
        .map(|s| s.blocks.iter().rev().map(|&b| (b, root)).collect())
        .unwrap_or_default();

    while let Some((current, cause)) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        let Some(step) = state.step_mut(current) else {
            continue;
        };
        if step.status.is_terminal() || step.status == StepStatus::InProgress {
            continue;
        }

        step.finish(StepStatus::Skipped);
        step.skipped_because_of = Some(cause);
        step.error = Some(format!("Skipped because step {cause} did not complete"));
        skipped.push(current);
        stack.extend(step.blocks.iter().rev().map(|&b| (b, current)));
    }

    if !skipped.is_empty() {
        debug!(plan_id = %state.plan_id, root, skipped = ?skipped, "Cascaded skip to dependents");
    }
    skipped
}

/// Recomputes readiness, the derived step lists and the plan status.
fn recompute(state: &mut PlanExecutionState) {
    update_ready_steps(state);
    update_plan_status(state);
    state.updated_at = now_utc();
}

fn update_ready_steps(state: &mut PlanExecutionState) {
    let statuses: HashMap<u32, StepStatus> =
        state.steps.iter().map(|s| (s.step_number, s.status)).collect();

    for step in &mut state.steps {
        if !matches!(step.status, StepStatus::Pending | StepStatus::Ready | StepStatus::Blocked) {
            continue;
        }

        // Dependencies absent from the plan are ignored.
        let deps: Vec<StepStatus> = step
            .depends_on
            .iter()
            .filter_map(|d| statuses.get(d).copied())
            .collect();

        step.status = if deps.iter().any(|s| *s == StepStatus::Failed) {
            StepStatus::Blocked
        } else if deps.iter().all(StepStatus::is_resolved) {
            StepStatus::Ready
        } else {
            StepStatus::Pending
        };
    }

    state.current_steps = numbers_where(state, |s| s == StepStatus::InProgress);
    state.ready_steps = numbers_where(state, |s| s == StepStatus::Ready);
    state.blocked_steps =
        numbers_where(state, |s| matches!(s, StepStatus::Blocked | StepStatus::Pending));
}

fn update_plan_status(state: &mut PlanExecutionState) {
    if state.all_terminal() {
        if !state.status.is_terminal() {
            state.status = if state.has_failures() {
                PlanStatus::Failed
            } else {
                PlanStatus::Completed
            };
            state.completed_at = Some(now_utc());
            info!(plan_id = %state.plan_id, status = %state.status, "Plan execution finished");
        }
    } else if state.status == PlanStatus::Ready
        && state.steps.iter().any(|s| s.status == StepStatus::InProgress || s.status.is_terminal())
    {
        state.status = PlanStatus::Executing;
    }
}

fn numbers_where(state: &PlanExecutionState, pred: impl Fn(StepStatus) -> bool) -> Vec<u32> {
    state
        .steps
        .iter()
        .filter(|s| pred(s.status))
        .map(|s| s.step_number)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Step;
    use crate::errors::ValidationCode;
    use pretty_assertions::assert_eq;

    fn fan_out() -> Plan {
        Plan::new("fan")
            .with_step(Step::new(1))
            .with_step(Step::new(2).depends_on([1]))
            .with_step(Step::new(3).depends_on([1]))
    }

    fn chain_via_blocks() -> Plan {
        Plan::new("chain")
            .with_step(Step::new(1).blocks([2]))
            .with_step(Step::new(2).blocks([3]))
            .with_step(Step::new(3))
    }

    fn machine_with(plan: &Plan) -> ExecutionStateMachine {
        let machine = ExecutionStateMachine::default();
        machine.initialize_execution(plan).unwrap();
        machine
    }

    #[test]
    fn test_initial_ready_set_is_roots() {
        let plan = Plan::new("p")
            .with_step(Step::new(1))
            .with_step(Step::new(2).depends_on([1]))
            .with_step(Step::new(3));
        let machine = machine_with(&plan);

        let state = machine.get_state("p").unwrap();
        assert_eq!(state.ready_steps, vec![1, 3]);
        assert_eq!(state.blocked_steps, vec![2]);
        assert_eq!(state.status, PlanStatus::Ready);
    }

    #[test]
    fn test_initialize_rejects_invalid_plan() {
        let machine = ExecutionStateMachine::default();
        let plan = Plan::new("bad").with_step(Step::new(1).depends_on([1]));
        let err = machine.initialize_execution(&plan).unwrap_err();
        assert_eq!(err.code, ValidationCode::SelfDependency);
        assert!(!machine.contains("bad"));
    }

    #[test]
    fn test_completing_root_readies_children() {
        let machine = machine_with(&fan_out());

        machine.start_step("fan", 1).unwrap();
        let state = machine.get_state("fan").unwrap();
        assert_eq!(state.current_steps, vec![1]);
        assert_eq!(state.status, PlanStatus::Executing);

        let done = machine
            .complete_step("fan", 1, StepCompletion::new().with_files(vec!["a.rs".into()]))
            .unwrap();
        assert_eq!(done.status, StepStatus::Completed);
        assert_eq!(done.files_modified, vec!["a.rs".to_string()]);
        assert!(done.duration_ms.is_some());

        let state = machine.get_state("fan").unwrap();
        assert!(state.current_steps.is_empty());
        assert_eq!(state.ready_steps, vec![2, 3]);
        assert!(!state.ready_steps.contains(&1));
    }

    #[test]
    fn test_start_rejects_non_startable() {
        let machine = machine_with(&fan_out());
        machine.start_step("fan", 1).unwrap();
        assert!(machine.start_step("fan", 1).is_none());

        machine.complete_step("fan", 1, StepCompletion::new()).unwrap();
        assert!(machine.start_step("fan", 1).is_none());
        assert!(machine.complete_step("fan", 1, StepCompletion::new()).is_none());
    }

    #[test]
    fn test_complete_requires_in_progress() {
        let machine = machine_with(&fan_out());

        assert!(machine.complete_step("fan", 1, StepCompletion::new()).is_none());
        assert!(machine.complete_step("fan", 2, StepCompletion::new()).is_none());
        assert_eq!(machine.get_step("fan", 1).unwrap().status, StepStatus::Ready);
        assert_eq!(machine.get_step("fan", 2).unwrap().status, StepStatus::Pending);
        assert_eq!(machine.ready_steps("fan"), vec![1]);
    }

    #[test]
    fn test_evict_if_terminal_spares_reset_plan() {
        let machine = machine_with(&fan_out());
        machine.halt_plan("fan", "stopped");
        assert!(machine.get_state("fan").unwrap().status.is_terminal());

        machine.reset_execution(&fan_out()).unwrap();
        assert!(!machine.evict_if_terminal("fan"));
        assert!(machine.contains("fan"));
        assert!(machine.control("fan").is_some());

        machine.halt_plan("fan", "stopped again");
        assert!(machine.evict_if_terminal("fan"));
        assert!(!machine.contains("fan"));
        assert!(machine.control("fan").is_none());
        assert!(!machine.evict_if_terminal("fan"));
    }

    #[test]
    fn test_unknown_ids_return_none() {
        let machine = machine_with(&fan_out());
        assert!(machine.start_step("nope", 1).is_none());
        assert!(machine.start_step("fan", 99).is_none());
        assert!(machine.get_progress("nope").is_none());
        assert!(machine.ready_steps("nope").is_empty());
        assert!(machine.skip_dependent_steps("fan", 99).is_empty());
        assert!(machine.export_state("nope").is_none());
    }

    #[test]
    fn test_fail_with_retry_returns_to_pending() {
        let machine = machine_with(&fan_out());

        for expected in 1..=MAX_STATE_RETRIES {
            machine.start_step("fan", 1).unwrap();
            let step = machine.fail_step("fan", 1, "flaky", FailOptions::retry()).unwrap();
            assert_eq!(step.retry_count, expected);
            assert_eq!(step.status, StepStatus::Ready);
        }

        machine.start_step("fan", 1).unwrap();
        let step = machine.fail_step("fan", 1, "still flaky", FailOptions::retry()).unwrap();
        assert_eq!(step.status, StepStatus::Failed);
        assert_eq!(step.retry_count, MAX_STATE_RETRIES);
    }

    #[test]
    fn test_failure_blocks_dependents_without_cascade() {
        let machine = machine_with(&fan_out());
        machine.start_step("fan", 1).unwrap();
        machine.fail_step("fan", 1, "boom", FailOptions::terminal()).unwrap();

        let state = machine.get_state("fan").unwrap();
        assert_eq!(state.status_of(2), Some(StepStatus::Blocked));
        assert_eq!(state.status_of(3), Some(StepStatus::Blocked));
        assert_eq!(state.blocked_steps, vec![2, 3]);
        assert_eq!(state.status, PlanStatus::Executing);
        assert_eq!(machine.stalled_steps("fan"), vec![2, 3]);
    }

    #[test]
    fn test_fail_with_skip_dependents_cascades_transitively() {
        let machine = machine_with(&chain_via_blocks());
        machine.start_step("chain", 1).unwrap();
        machine.fail_step("chain", 1, "boom", FailOptions::cascade()).unwrap();

        let state = machine.get_state("chain").unwrap();
        assert_eq!(state.status_of(1), Some(StepStatus::Failed));
        assert_eq!(state.status_of(2), Some(StepStatus::Skipped));
        assert_eq!(state.status_of(3), Some(StepStatus::Skipped));
        assert_eq!(state.step(2).unwrap().skipped_because_of, Some(1));
        assert_eq!(state.step(3).unwrap().skipped_because_of, Some(2));
        assert_eq!(state.status, PlanStatus::Failed);
        assert!(state.completed_at.is_some());
    }

    #[test]
    fn test_fail_with_skip_option() {
        let machine = machine_with(&fan_out());
        let step = machine
            .fail_step("fan", 1, "not needed", FailOptions { skip: true, ..FailOptions::default() })
            .unwrap();
        assert_eq!(step.status, StepStatus::Skipped);
        assert_eq!(machine.ready_steps("fan"), vec![2, 3]);
    }

    #[test]
    fn test_skip_step_resolves_dependency() {
        let machine = machine_with(&fan_out());
        machine.skip_step("fan", 1, "done by hand", false).unwrap();
        assert_eq!(machine.ready_steps("fan"), vec![2, 3]);
    }

    #[test]
    fn test_skip_step_with_dependents() {
        let machine = machine_with(&fan_out());
        machine.skip_step("fan", 1, "obsolete", true).unwrap();

        let state = machine.get_state("fan").unwrap();
        assert!(state.all_terminal());
        assert_eq!(state.status, PlanStatus::Completed);
    }

    #[test]
    fn test_skip_dependent_steps_explicit() {
        let machine = machine_with(&chain_via_blocks());
        let skipped = machine.skip_dependent_steps("chain", 1);
        assert_eq!(skipped, vec![2, 3]);
        assert_eq!(machine.ready_steps("chain"), vec![1]);
    }

    #[test]
    fn test_plan_completes() {
        let machine = machine_with(&fan_out());
        for step in [1, 2, 3] {
            machine.start_step("fan", step).unwrap();
            machine.complete_step("fan", step, StepCompletion::new()).unwrap();
        }

        let state = machine.get_state("fan").unwrap();
        assert_eq!(state.status, PlanStatus::Completed);
        let progress = machine.get_progress("fan").unwrap();
        assert_eq!(progress.completed, 3);
        assert_eq!(progress.percentage, 100);
    }

    #[test]
    fn test_record_retry_attempt() {
        let machine = machine_with(&fan_out());
        machine.start_step("fan", 1).unwrap();
        assert_eq!(machine.record_retry_attempt("fan", 1, "timeout"), Some(1));
        assert_eq!(machine.record_retry_attempt("fan", 1, "timeout"), Some(2));

        let step = machine.get_step("fan", 1).unwrap();
        assert_eq!(step.status, StepStatus::InProgress);
        assert_eq!(step.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_halt_plan() {
        let machine = machine_with(&fan_out());
        assert!(machine.halt_plan("fan", "aborted"));
        let state = machine.get_state("fan").unwrap();
        assert_eq!(state.status, PlanStatus::Failed);
        assert!(state.completed_at.is_some());
        assert!(!machine.halt_plan("missing", "aborted"));
    }

    #[test]
    fn test_export_import_round_trip() {
        let machine = machine_with(&fan_out());
        machine.start_step("fan", 1).unwrap();
        machine.complete_step("fan", 1, StepCompletion::new().with_notes("ok")).unwrap();
        machine.start_step("fan", 2).unwrap();

        let exported = machine.export_state("fan").unwrap();
        let original = machine.get_state("fan").unwrap();

        let other = ExecutionStateMachine::default();
        let plan_id = other.import_state(exported).unwrap();
        assert_eq!(plan_id, "fan");
        assert_eq!(other.get_state("fan").unwrap(), original);
        assert!(other.control("fan").is_some());
    }

    #[test]
    fn test_import_rejects_garbage() {
        let machine = ExecutionStateMachine::default();
        let err = machine.import_state(serde_json::json!({"plan_id": 5})).unwrap_err();
        assert!(matches!(err, PlanflowError::Serialization(_)));
    }

    #[test]
    fn test_reset_clears_control_flags() {
        let plan = fan_out();
        let machine = machine_with(&plan);
        machine.control("fan").unwrap().abort_signal().abort("stop");
        machine.start_step("fan", 1).unwrap();

        machine.reset_execution(&plan).unwrap();
        assert!(!machine.control("fan").unwrap().is_aborted());
        assert_eq!(machine.ready_steps("fan"), vec![1]);
    }

    #[test]
    fn test_remove_plan() {
        let machine = machine_with(&fan_out());
        assert_eq!(machine.len(), 1);
        assert!(machine.remove_plan("fan"));
        assert!(machine.is_empty());
        assert!(machine.control("fan").is_none());
        assert!(!machine.remove_plan("fan"));
    }
}
