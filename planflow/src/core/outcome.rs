//! Executor outcomes and per-step run results.

use super::StepStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a step executor reports for one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Error message for failed attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Files touched by the attempt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_modified: Vec<String>,
}

impl StepOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            files_modified: Vec::new(),
        }
    }

    /// Creates a successful outcome listing modified files.
    #[must_use]
    pub fn ok_with_files(files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            success: true,
            error: None,
            files_modified: files.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            files_modified: Vec::new(),
        }
    }
}

/// Why a step did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    /// The executor reported `success = false`.
    ExecutorFailure,
    /// The attempt exceeded the step timeout.
    Timeout,
    /// The plan was aborted before the step could finish retrying.
    Aborted,
    /// The executor task panicked.
    Panicked,
}

impl fmt::Display for StepErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutorFailure => write!(f, "executor_failure"),
            Self::Timeout => write!(f, "timeout"),
            Self::Aborted => write!(f, "aborted"),
            Self::Panicked => write!(f, "panicked"),
        }
    }
}

impl StepErrorKind {
    /// Returns true if the failure says something about executor health.
    #[must_use]
    pub fn counts_against_breaker(&self) -> bool {
        !matches!(self, Self::Aborted)
    }
}

/// Result of running one step through the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepExecutionResult {
    /// Step number.
    pub step_number: u32,
    /// Final status recorded in the state machine.
    pub status: StepStatus,
    /// Whether the step succeeded.
    pub success: bool,
    /// Error message of the last attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<StepErrorKind>,
    /// Files modified by the successful attempt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_modified: Vec<String>,
    /// Number of attempts made (initial plus retries).
    pub attempts: u32,
    /// Total time spent across attempts.
    pub duration_ms: u64,
    /// Dependents skipped because this step failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_dependents: Vec<u32>,
}

impl StepExecutionResult {
    /// Returns true if the last attempt timed out.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.error_kind == Some(StepErrorKind::Timeout)
    }
}
