//! Execution state tracking.
//!
//! - [`ExecutionStateMachine`]: per-step transitions and readiness
//! - [`ExecutionProgress`]: progress snapshots
//! - [`StateStoreJanitor`]: TTL and capacity eviction

mod janitor;
mod machine;
mod progress;

pub use janitor::{JanitorHandle, StateStoreJanitor, SweepReport};
pub use machine::{ExecutionStateMachine, FailOptions, StepCompletion, MAX_STATE_RETRIES};
pub use progress::ExecutionProgress;
