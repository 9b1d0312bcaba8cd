//! Plan ingestion validation.
//!
//! Runs once when a plan is registered and produces a normalized copy:
//! deduplicated dependency lists, dangling references handled according to
//! the [`ValidationPolicy`], and `depends_on`/`blocks` made mutually
//! consistent so readiness checks and cascade skips agree with the graph.

use super::DependencyGraphBuilder;
use crate::config::ValidationPolicy;
use crate::core::Plan;
use crate::errors::{PlanValidationError, ValidationCode};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Validates and normalizes a plan.
///
/// # Errors
///
/// Returns an error for an empty plan id, a zero or duplicate step number,
/// a self dependency, a cycle, or (under [`ValidationPolicy::Strict`]) a
/// reference to a step that does not exist.
pub fn validate_plan(plan: &Plan, policy: ValidationPolicy) -> Result<Plan, PlanValidationError> {
    validate_plan_id(&plan.id)?;
    validate_step_numbers(plan)?;
    validate_no_self_dependencies(plan)?;

    let mut normalized = plan.clone();
    drop_dangling_references(&mut normalized, policy)?;
    symmetrize(&mut normalized);
    validate_acyclic(&normalized)?;

    Ok(normalized)
}

/// Validates a plan id is not empty or whitespace-only.
pub fn validate_plan_id(id: &str) -> Result<(), PlanValidationError> {
    if id.trim().is_empty() {
        return Err(PlanValidationError::new(
            ValidationCode::EmptyPlanId,
            "Plan id cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

fn validate_step_numbers(plan: &Plan) -> Result<(), PlanValidationError> {
    let mut seen = HashSet::new();
    for step in &plan.steps {
        if step.step_number == 0 {
            return Err(PlanValidationError::new(
                ValidationCode::InvalidStepNumber,
                format!("Step '{}' has step number 0; step numbers start at 1", step.id),
            ));
        }
        if !seen.insert(step.step_number) {
            return Err(PlanValidationError::new(
                ValidationCode::DuplicateStep,
                format!("Step number {} appears more than once", step.step_number),
            )
            .with_steps(vec![step.step_number]));
        }
    }
    Ok(())
}

fn validate_no_self_dependencies(plan: &Plan) -> Result<(), PlanValidationError> {
    for step in &plan.steps {
        let n = step.step_number;
        if step.depends_on.contains(&n) || step.blocks.contains(&n) {
            return Err(PlanValidationError::new(
                ValidationCode::SelfDependency,
                format!("Step {n} cannot depend on itself"),
            )
            .with_steps(vec![n]));
        }
    }
    Ok(())
}

fn drop_dangling_references(plan: &mut Plan, policy: ValidationPolicy) -> Result<(), PlanValidationError> {
    let known: HashSet<u32> = plan.steps.iter().map(|s| s.step_number).collect();

    for step in &mut plan.steps {
        let missing: Vec<u32> = step
            .depends_on
            .iter()
            .chain(step.blocks.iter())
            .copied()
            .filter(|n| !known.contains(n))
            .collect();

        if missing.is_empty() {
            continue;
        }

        match policy {
            ValidationPolicy::Strict => {
                return Err(PlanValidationError::new(
                    ValidationCode::MissingDependency,
                    format!(
                        "Step {} references non-existent step(s) {:?}",
                        step.step_number, missing
                    ),
                )
                .with_steps(vec![step.step_number]));
            }
            ValidationPolicy::Lenient => {
                tracing::warn!(
                    step = step.step_number,
                    missing = ?missing,
                    "Dropping references to steps that are not in the plan"
                );
                step.depends_on.retain(|n| known.contains(n));
                step.blocks.retain(|n| known.contains(n));
            }
        }
    }
    Ok(())
}

/// Makes `depends_on` the union of declared dependencies and inverse `blocks`
/// (and vice versa), preserving first-seen order.
fn symmetrize(plan: &mut Plan) {
    let mut extra_deps: HashMap<u32, Vec<u32>> = HashMap::new();
    let mut extra_blocks: HashMap<u32, Vec<u32>> = HashMap::new();

    for step in &plan.steps {
        for &dep in &step.depends_on {
            extra_blocks.entry(dep).or_default().push(step.step_number);
        }
        for &blocked in &step.blocks {
            extra_deps.entry(blocked).or_default().push(step.step_number);
        }
    }

    for step in &mut plan.steps {
        let n = step.step_number;
        step.depends_on = dedupe(step.depends_on.iter().chain(extra_deps.get(&n).into_iter().flatten()));
        step.blocks = dedupe(step.blocks.iter().chain(extra_blocks.get(&n).into_iter().flatten()));
    }
}

fn dedupe<'a>(items: impl Iterator<Item = &'a u32>) -> Vec<u32> {
    let mut seen = BTreeSet::new();
    items.copied().filter(|n| seen.insert(*n)).collect()
}

fn validate_acyclic(plan: &Plan) -> Result<(), PlanValidationError> {
    let graph = DependencyGraphBuilder::new().build(&plan.steps);
    if graph.has_cycle() {
        let stuck = graph.unordered_steps();
        return Err(PlanValidationError::new(
            ValidationCode::CycleDetected,
            format!("Cycle detected among steps {stuck:?}"),
        )
        .with_steps(stuck));
    }
    Ok(())
}
