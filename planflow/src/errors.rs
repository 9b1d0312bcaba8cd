//! Error types for the planflow crate.
//!
//! Step-level failures are not errors: they are recorded in execution state
//! and surfaced through [`crate::core::StepExecutionResult`]. The types here
//! cover plan ingestion, configuration and serialization problems.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The main error type for planflow operations.
#[derive(Debug, Error)]
pub enum PlanflowError {
    /// A plan failed ingestion validation.
    #[error("{0}")]
    Validation(#[from] PlanValidationError),

    /// A plan supplier had no plan for the given id.
    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    /// Invalid scheduler configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for PlanflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Machine-readable reason for a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    /// The plan id is empty or whitespace.
    EmptyPlanId,
    /// A step number is zero.
    InvalidStepNumber,
    /// Two steps share a number.
    DuplicateStep,
    /// A step depends on or blocks itself.
    SelfDependency,
    /// A step references a step number absent from the plan.
    MissingDependency,
    /// The dependency relation contains a cycle.
    CycleDetected,
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::EmptyPlanId => "PLAN-001-EMPTY-ID",
            Self::InvalidStepNumber => "PLAN-002-STEP-NUMBER",
            Self::DuplicateStep => "PLAN-003-DUPLICATE",
            Self::SelfDependency => "PLAN-004-SELF-DEP",
            Self::MissingDependency => "PLAN-005-MISSING-DEP",
            Self::CycleDetected => "PLAN-006-CYCLE",
        };
        f.write_str(code)
    }
}

/// Error raised when plan ingestion validation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PlanValidationError {
    /// The error message.
    pub message: String,
    /// Failure classification.
    pub code: ValidationCode,
    /// The steps involved in the error.
    pub steps: Vec<u32>,
}

impl PlanValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            steps: Vec::new(),
        }
    }

    /// Sets the steps involved.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<u32>) -> Self {
        self.steps = steps;
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::Value::String(self.code.to_string()));
        map.insert("message".to_string(), serde_json::Value::String(self.message.clone()));
        map.insert("steps".to_string(), serde_json::json!(self.steps));
        map
    }
}
