//! Core domain model types for planflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Plans and steps as supplied by the plan producer
//! - Step and plan status enums
//! - Per-step and per-plan execution state
//! - Executor outcomes and run results

mod outcome;
mod plan;
mod state;
mod status;

pub use outcome::{StepErrorKind, StepExecutionResult, StepOutcome};
pub use plan::{Plan, Step};
pub use state::{PlanExecutionState, StepExecutionState};
pub use status::{PlanStatus, StepStatus};
