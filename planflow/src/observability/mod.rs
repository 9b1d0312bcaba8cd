//! Observability utilities.
//!
//! Components log through `tracing`; [`init_tracing`] installs a
//! `tracing-subscriber` formatter for binaries and tests that want output.
//! Scheduler runs and step workers are wrapped in the spans built here.

mod spans;
mod subscriber;

pub use spans::{plan_run_span, step_span};
pub use subscriber::{init_tracing, init_tracing_with_filter, LogFormat, DEFAULT_FILTER};
