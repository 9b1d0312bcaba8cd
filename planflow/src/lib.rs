//! # Planflow
//!
//! A dependency-aware scheduler for multi-step plans.
//!
//! Planflow takes plans made of numbered steps with dependency edges and
//! executes them with:
//!
//! - **Dependency analysis**: topological order, critical path and parallel groups
//! - **Tracked execution state**: a per-plan state machine with cascade skipping
//! - **Bounded parallelism**: a worker pool with per-step timeouts and retries
//! - **Fault isolation**: a circuit breaker that falls back to sequential execution
//! - **Bounded memory**: a janitor that evicts finished plan state
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use planflow::prelude::*;
//!
//! let plan = Plan::new("release")
//!     .with_step(Step::new(1).with_title("build"))
//!     .with_step(Step::new(2).with_title("test").depends_on([1]))
//!     .with_step(Step::new(3).with_title("publish").depends_on([2]));
//!
//! let scheduler = ParallelScheduler::new(SchedulerConfig::default());
//! scheduler.enable_parallel_execution(ParallelExecutionOptions::default().with_max_workers(4));
//!
//! let report = scheduler.execute_ready_steps_parallel(&plan, executor).await?;
//! assert!(report.outcome.is_success());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod execution;
pub mod graph;
pub mod observability;
pub mod resilience;
pub mod scheduler;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{AbortSignal, PlanRunControl};
    pub use crate::config::{JanitorConfig, SchedulerConfig, ValidationPolicy};
    pub use crate::core::{
        Plan, PlanExecutionState, PlanStatus, Step, StepErrorKind, StepExecutionResult,
        StepExecutionState, StepOutcome, StepStatus,
    };
    pub use crate::errors::{PlanValidationError, PlanflowError, ValidationCode};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::execution::{
        ExecutionProgress, ExecutionStateMachine, FailOptions, StateStoreJanitor, StepCompletion,
    };
    pub use crate::graph::{DependencyGraph, DependencyGraphBuilder};
    pub use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
    pub use crate::scheduler::{
        ExecutionMode, ParallelExecutionOptions, ParallelScheduler, PlanRunReport, PlanSupplier,
        RetryPolicy, RunOutcome, StepExecutor,
    };
    pub use crate::utils::{iso_timestamp, Timestamp};
}
