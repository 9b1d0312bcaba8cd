//! Span constructors for scheduler runs.

use tracing::{info_span, Span};

/// Span covering one scheduler run over a plan.
#[must_use]
pub fn plan_run_span(plan_id: &str, run_id: &str) -> Span {
    info_span!("plan_run", plan_id = %plan_id, run_id = %run_id)
}

/// Span covering all attempts of one step.
#[must_use]
pub fn step_span(plan_id: &str, step: u32) -> Span {
    info_span!("step", plan_id = %plan_id, step)
}
