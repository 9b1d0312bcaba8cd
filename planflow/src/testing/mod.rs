//! Testing utilities for plan scheduling.
//!
//! This module provides:
//! - Step executor doubles (scripted, failing, slow, recording)
//! - Plan fixtures for common graph shapes
//! - An in-memory plan supplier

mod executors;
mod fixtures;

pub use executors::{
    ExecutionRecord, FailingExecutor, RecordingExecutor, ScriptedExecutor, SlowExecutor,
    SucceedingExecutor,
};
pub use fixtures::{
    blocks_chain_plan, diamond_plan, fan_out_plan, independent_plan, layered_plan, linear_plan,
    InMemoryPlanSupplier,
};
