//! Cooperative cancellation for plan runs.
//!
//! This module provides:
//! - [`AbortSignal`], a first-reason-wins abort flag
//! - [`PlanRunControl`], the per-plan flags the scheduler consults

mod abort;

pub use abort::{AbortSignal, PlanRunControl};
