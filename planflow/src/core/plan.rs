//! Plan and step definitions consumed by the scheduler.

use serde::{Deserialize, Serialize};

/// A single step of a plan.
///
/// Steps are supplied by the plan producer and are read-only to the scheduler.
/// `blocks` is a denormalized inverse of `depends_on` and may disagree with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Unique positive number within the plan.
    pub step_number: u32,
    /// Stable identifier.
    pub id: String,
    /// Human readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Step numbers this step waits for.
    #[serde(default)]
    pub depends_on: Vec<u32>,
    /// Step numbers that wait for this step.
    #[serde(default)]
    pub blocks: Vec<u32>,
}

impl Step {
    /// Creates a step with an id derived from its number.
    #[must_use]
    pub fn new(step_number: u32) -> Self {
        Self {
            step_number,
            id: format!("step-{step_number}"),
            title: None,
            depends_on: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Sets the step id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn depends_on(mut self, deps: impl IntoIterator<Item = u32>) -> Self {
        self.depends_on = deps.into_iter().collect();
        self
    }

    /// Sets the steps blocked by this one.
    #[must_use]
    pub fn blocks(mut self, blocked: impl IntoIterator<Item = u32>) -> Self {
        self.blocks = blocked.into_iter().collect();
        self
    }
}

/// An ordered set of steps submitted for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan identifier.
    pub id: String,
    /// Plan version, bumped by the producer on every edit.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Steps in authoring order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_version() -> u32 {
    1
}

impl Plan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: default_version(),
            steps: Vec::new(),
        }
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Appends a step.
    #[must_use]
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends several steps.
    #[must_use]
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Looks up a step by number.
    #[must_use]
    pub fn step(&self, step_number: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_number == step_number)
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the plan has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
