//! Cooperative per-plan abort flags.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cooperative abort flag.
///
/// Aborting is idempotent: only the first reason is kept. Nothing is
/// interrupted; the scheduler checks the flag before launching work.
#[derive(Debug, Default)]
pub struct AbortSignal {
    aborted: AtomicBool,
    reason: RwLock<Option<String>>,
}

impl AbortSignal {
    /// Creates a signal that has not fired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests an abort. Returns true if this call fired the signal.
    pub fn abort(&self, reason: impl Into<String>) -> bool {
        if self
            .aborted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.reason.write() = Some(reason.into());
            true
        } else {
            false
        }
    }

    /// Returns whether an abort has been requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Returns the abort reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }
}

/// Auxiliary bookkeeping the scheduler keeps per plan.
#[derive(Debug, Default)]
pub struct PlanRunControl {
    abort: AbortSignal,
    sequential_fallback: AtomicBool,
}

impl PlanRunControl {
    /// Creates fresh control flags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the abort signal.
    #[must_use]
    pub fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    /// Shorthand for `abort_signal().is_aborted()`.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Pins this plan to sequential execution. Returns true if newly activated.
    pub fn activate_sequential_fallback(&self) -> bool {
        !self.sequential_fallback.swap(true, Ordering::SeqCst)
    }

    /// Returns true if the plan has been pinned to sequential execution.
    #[must_use]
    pub fn sequential_fallback(&self) -> bool {
        self.sequential_fallback.load(Ordering::SeqCst)
    }
}
