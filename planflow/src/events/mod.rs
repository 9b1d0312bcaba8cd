//! Lifecycle events emitted by the scheduler.
//!
//! Events are a `(type, json payload)` pair handed to an [`EventSink`]. The
//! scheduler uses [`NoOpEventSink`] unless another sink is attached.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names.
pub mod names {
    /// A run over a plan began.
    pub const RUN_STARTED: &str = "plan.run_started";
    /// A step was moved to in progress.
    pub const STEP_STARTED: &str = "step.started";
    /// An attempt failed and another one follows.
    pub const STEP_RETRYING: &str = "step.retrying";
    /// A step completed.
    pub const STEP_COMPLETED: &str = "step.completed";
    /// A step failed terminally.
    pub const STEP_FAILED: &str = "step.failed";
    /// Dependents were skipped after a failure.
    pub const STEPS_SKIPPED: &str = "steps.skipped";
    /// The run switched to one-at-a-time execution.
    pub const FALLBACK_SEQUENTIAL: &str = "plan.fallback_sequential";
    /// The run observed an abort.
    pub const PLAN_ABORTED: &str = "plan.aborted";
    /// No step can make progress but some are unresolved.
    pub const PLAN_STALLED: &str = "plan.stalled";
    /// The run ended.
    pub const RUN_FINISHED: &str = "plan.run_finished";
}
