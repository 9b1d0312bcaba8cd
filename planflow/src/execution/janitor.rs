//! Eviction of finished plan state.
//!
//! Terminal plans older than the TTL are removed first. If the store is still
//! above capacity, the oldest terminal plans go next. Running plans are never
//! evicted, so the store can stay above capacity while many plans are active.

use super::ExecutionStateMachine;
use crate::config::JanitorConfig;
use crate::utils::age_of;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// What a single sweep removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Plans removed because their TTL elapsed.
    pub expired: Vec<String>,
    /// Plans removed to get back under capacity.
    pub evicted_for_capacity: Vec<String>,
    /// Plans left in the store.
    pub remaining: usize,
}

impl SweepReport {
    /// Total number of plans removed.
    #[must_use]
    pub fn evicted(&self) -> usize {
        self.expired.len() + self.evicted_for_capacity.len()
    }
}

/// Periodically evicts terminal plans from an [`ExecutionStateMachine`].
#[derive(Debug, Clone)]
pub struct StateStoreJanitor {
    machine: Arc<ExecutionStateMachine>,
    config: JanitorConfig,
}

impl StateStoreJanitor {
    /// Creates a janitor for `machine`.
    #[must_use]
    pub fn new(machine: Arc<ExecutionStateMachine>, config: JanitorConfig) -> Self {
        Self { machine, config }
    }

    /// Returns the janitor configuration.
    #[must_use]
    pub fn config(&self) -> &JanitorConfig {
        &self.config
    }

    /// Runs one eviction pass.
    pub fn sweep(&self) -> SweepReport {
        let ttl = self.config.ttl();
        let mut report = SweepReport::default();

        let mut survivors = Vec::new();
        for (plan_id, finished_at) in self.machine.terminal_plans() {
            if age_of(finished_at) >= ttl {
                if self.machine.evict_if_terminal(&plan_id) {
                    report.expired.push(plan_id);
                }
            } else {
                survivors.push((plan_id, finished_at));
            }
        }

        let mut excess = self.machine.len().saturating_sub(self.config.max_plans);
        if excess > 0 {
            survivors.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            for (plan_id, _) in survivors {
                if excess == 0 {
                    break;
                }
                if self.machine.evict_if_terminal(&plan_id) {
                    report.evicted_for_capacity.push(plan_id);
                    excess -= 1;
                }
            }
        }

        report.remaining = self.machine.len();
        if report.evicted() > 0 {
            info!(
                expired = report.expired.len(),
                evicted_for_capacity = report.evicted_for_capacity.len(),
                remaining = report.remaining,
                "State store sweep evicted plans"
            );
        } else {
            debug!(remaining = report.remaining, "State store sweep found nothing to evict");
        }
        report
    }

    /// Runs [`sweep`](Self::sweep) on a fixed interval until the handle is shut down.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(self) -> JanitorHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = self.config.interval().max(std::time::Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep();
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("State store janitor stopped");
        });

        JanitorHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running janitor task.
#[derive(Debug)]
pub struct JanitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl JanitorHandle {
    /// Stops the janitor and waits for its task to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }

    /// Returns true once the janitor task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
