//! Global subscriber setup.

use crate::errors::PlanflowError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "planflow=info";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
///
/// # Errors
///
/// Returns [`PlanflowError::Config`] if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<(), PlanflowError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(format, filter)
}

/// Installs a global `fmt` subscriber with an explicit filter directive.
///
/// # Errors
///
/// Returns [`PlanflowError::Config`] for an invalid directive or if a global
/// subscriber is already set.
pub fn init_tracing_with_filter(format: LogFormat, directives: &str) -> Result<(), PlanflowError> {
    let filter = EnvFilter::try_new(directives)
        .map_err(|e| PlanflowError::Config(format!("invalid log filter '{directives}': {e}")))?;
    install(format, filter)
}

fn install(format: LogFormat, filter: EnvFilter) -> Result<(), PlanflowError> {
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = match format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| PlanflowError::Config(format!("failed to install tracing subscriber: {e}")))
}
