//! Plan fixtures and an in-memory plan supplier.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::core::{Plan, Step};
use crate::scheduler::PlanSupplier;

/// `1 -> 2 -> ... -> n`, expressed through `depends_on`.
#[must_use]
pub fn linear_plan(id: impl Into<String>, n: u32) -> Plan {
    Plan::new(id).with_steps((1..=n).map(|i| {
        let step = Step::new(i).with_title(format!("Step {i}"));
        if i == 1 {
            step
        } else {
            step.depends_on([i - 1])
        }
    }))
}

/// `1 -> 2 -> ... -> n`, expressed only through `blocks`.
#[must_use]
pub fn blocks_chain_plan(id: impl Into<String>, n: u32) -> Plan {
    Plan::new(id).with_steps((1..=n).map(|i| {
        let step = Step::new(i);
        if i == n {
            step
        } else {
            step.blocks([i + 1])
        }
    }))
}

/// Step 1 followed by `width` steps that each depend only on step 1.
#[must_use]
pub fn fan_out_plan(id: impl Into<String>, width: u32) -> Plan {
    Plan::new(id)
        .with_step(Step::new(1))
        .with_steps((2..=width + 1).map(|i| Step::new(i).depends_on([1])))
}

/// `1 -> {2, 3} -> 4`.
#[must_use]
pub fn diamond_plan(id: impl Into<String>) -> Plan {
    Plan::new(id)
        .with_step(Step::new(1))
        .with_step(Step::new(2).depends_on([1]))
        .with_step(Step::new(3).depends_on([1]))
        .with_step(Step::new(4).depends_on([2, 3]))
}

/// `n` steps with no dependencies.
#[must_use]
pub fn independent_plan(id: impl Into<String>, n: u32) -> Plan {
    Plan::new(id).with_steps((1..=n).map(Step::new))
}

/// A layered plan: `layers` levels of `width` steps, each depending on every
/// step of the previous level.
#[must_use]
pub fn layered_plan(id: impl Into<String>, layers: u32, width: u32) -> Plan {
    let mut steps = Vec::new();
    for layer in 0..layers {
        for col in 0..width {
            let n = layer * width + col + 1;
            let step = Step::new(n);
            steps.push(if layer == 0 {
                step
            } else {
                let prev = (layer - 1) * width + 1;
                step.depends_on(prev..prev + width)
            });
        }
    }
    Plan::new(id).with_steps(steps)
}

/// Plans held in memory, keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryPlanSupplier {
    plans: RwLock<HashMap<String, Plan>>,
}

impl InMemoryPlanSupplier {
    /// Creates an empty supplier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a supplier holding `plans`.
    #[must_use]
    pub fn with_plans(plans: impl IntoIterator<Item = Plan>) -> Self {
        let supplier = Self::new();
        for plan in plans {
            supplier.insert(plan);
        }
        supplier
    }

    /// Adds or replaces a plan.
    pub fn insert(&self, plan: Plan) {
        self.plans.write().insert(plan.id.clone(), plan);
    }

    /// Removes a plan.
    pub fn remove(&self, plan_id: &str) -> Option<Plan> {
        self.plans.write().remove(plan_id)
    }
}

impl PlanSupplier for InMemoryPlanSupplier {
    fn load_plan(&self, plan_id: &str) -> Option<Plan> {
        self.plans.read().get(plan_id).cloned()
    }
}
