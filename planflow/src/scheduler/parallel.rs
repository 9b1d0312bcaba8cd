//! Dependency-aware parallel scheduler.
//!
//! Ready steps are launched as `tokio` tasks up to `max_workers` and collected
//! in a [`FuturesUnordered`]; the loop waits for any worker to settle before
//! re-reading the ready set. Every state transition happens on the loop, so a
//! plan's state is only mutated by one task per run (plus retry bookkeeping
//! from workers through the state machine's entry lock).
//!
//! When parallel execution is disabled, the circuit breaker is not closed,
//! or the plan has been pinned to sequential execution, steps run one at a
//! time and the run stops at the first failure without cascading skips.

use super::{
    ExecutionMode, ParallelExecutionOptions, PlanRunReport, PlanSupplier, RunOutcome, StepExecutor,
};
use crate::cancellation::PlanRunControl;
use crate::config::{duration_ms, JanitorConfig, SchedulerConfig};
use crate::core::{Plan, PlanExecutionState, StepErrorKind, StepExecutionResult, StepStatus};
use crate::errors::PlanflowError;
use crate::events::{names, EventSink, NoOpEventSink};
use crate::execution::{
    ExecutionProgress, ExecutionStateMachine, FailOptions, JanitorHandle, StateStoreJanitor,
    StepCompletion,
};
use crate::observability::{plan_run_span, step_span};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use serde_json::json;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Schedules plan steps over a bounded worker pool.
pub struct ParallelScheduler {
    machine: Arc<ExecutionStateMachine>,
    breaker: Arc<CircuitBreaker>,
    events: Arc<dyn EventSink>,
    parallel_enabled: AtomicBool,
    options: RwLock<ParallelExecutionOptions>,
    janitor: JanitorConfig,
}

impl std::fmt::Debug for ParallelScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelScheduler")
            .field("plans", &self.machine.len())
            .field("parallel_enabled", &self.is_parallel_enabled())
            .field("options", &*self.options.read())
            .field("circuit", &self.breaker.state())
            .finish_non_exhaustive()
    }
}

impl Default for ParallelScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl ParallelScheduler {
    /// Creates a scheduler with its own state store and circuit breaker.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            machine: Arc::new(ExecutionStateMachine::new(config.validation)),
            breaker: Arc::new(CircuitBreaker::new(config.circuit_breaker)),
            events: Arc::new(NoOpEventSink),
            parallel_enabled: AtomicBool::new(config.parallel_enabled),
            options: RwLock::new(config.parallel),
            janitor: config.janitor,
        }
    }

    /// Creates a scheduler from a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`PlanflowError::Config`] for out-of-range values.
    pub fn try_new(config: SchedulerConfig) -> Result<Self, PlanflowError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Attaches an event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Returns the state machine for direct step transitions and queries.
    #[must_use]
    pub fn machine(&self) -> &Arc<ExecutionStateMachine> {
        &self.machine
    }

    /// Returns the shared circuit breaker.
    #[must_use]
    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    // Configuration

    /// Enables the parallel path with new options. Runs already in progress keep their options.
    pub fn enable_parallel_execution(&self, options: ParallelExecutionOptions) {
        info!(
            max_workers = options.max_workers,
            step_timeout_ms = options.step_timeout_ms,
            max_retries = options.max_retries,
            stop_on_failure = options.stop_on_failure,
            "Parallel execution enabled"
        );
        *self.options.write() = options;
        self.parallel_enabled.store(true, Ordering::SeqCst);
    }

    /// Routes every subsequent run through the sequential path.
    pub fn disable_parallel_execution(&self) {
        info!("Parallel execution disabled");
        self.parallel_enabled.store(false, Ordering::SeqCst);
    }

    /// Returns whether the parallel path is enabled.
    #[must_use]
    pub fn is_parallel_enabled(&self) -> bool {
        self.parallel_enabled.load(Ordering::SeqCst)
    }

    /// Returns a copy of the current options.
    #[must_use]
    pub fn options(&self) -> ParallelExecutionOptions {
        self.options.read().clone()
    }

    // Plan lifecycle

    /// Validates and registers a plan, replacing any previous state.
    pub fn initialize_execution(&self, plan: &Plan) -> Result<PlanExecutionState, PlanflowError> {
        Ok(self.machine.initialize_execution(plan)?)
    }

    /// Reloads a plan from `supplier` and re-initializes its state and control flags.
    pub fn reset_execution(
        &self,
        plan_id: &str,
        supplier: &dyn PlanSupplier,
    ) -> Result<PlanExecutionState, PlanflowError> {
        let plan = supplier
            .load_plan(plan_id)
            .ok_or_else(|| PlanflowError::PlanNotFound(plan_id.to_string()))?;
        Ok(self.machine.reset_execution(&plan)?)
    }

    /// Runs every reachable step of `plan`, registering it first if needed.
    ///
    /// Step failures are reported in the returned [`PlanRunReport`]; an `Err`
    /// means the plan failed ingestion validation.
    pub async fn execute_ready_steps_parallel(
        &self,
        plan: &Plan,
        executor: Arc<dyn StepExecutor>,
    ) -> Result<PlanRunReport, PlanflowError> {
        if !self.machine.contains(&plan.id) {
            self.machine.initialize_execution(plan)?;
        }
        self.run(&plan.id, executor).await
    }

    /// Continues a plan from its current state.
    ///
    /// The plan is reloaded from `supplier`. Unknown plans are initialized; a
    /// plan whose version changed since its state was built is re-initialized.
    pub async fn resume_plan(
        &self,
        plan_id: &str,
        supplier: &dyn PlanSupplier,
        executor: Arc<dyn StepExecutor>,
    ) -> Result<PlanRunReport, PlanflowError> {
        let plan = supplier
            .load_plan(plan_id)
            .ok_or_else(|| PlanflowError::PlanNotFound(plan_id.to_string()))?;

        match self.machine.get_state(plan_id) {
            Some(state) if state.plan_version == plan.version => {
                debug!(plan_id, version = plan.version, "Resuming plan from existing state");
            }
            Some(state) => {
                warn!(
                    plan_id,
                    state_version = state.plan_version,
                    plan_version = plan.version,
                    "Plan version changed; re-initializing execution state"
                );
                self.machine.reset_execution(&plan)?;
            }
            None => {
                self.machine.initialize_execution(&plan)?;
            }
        }

        self.run(plan_id, executor).await
    }

    /// Requests a cooperative abort. Returns false for unknown plans.
    ///
    /// Running steps finish; nothing new is launched or retried. The flag
    /// stays set until the plan is reset or evicted.
    pub fn abort_plan_execution(&self, plan_id: &str) -> bool {
        let Some(control) = self.machine.control(plan_id) else {
            return false;
        };
        if control.abort_signal().abort("aborted by caller") {
            info!(plan_id, "Plan abort requested");
        }
        true
    }

    // Queries

    /// Returns a progress snapshot.
    #[must_use]
    pub fn get_progress(&self, plan_id: &str) -> Option<ExecutionProgress> {
        self.machine.get_progress(plan_id)
    }

    /// Returns a copy of a plan's state.
    #[must_use]
    pub fn get_state(&self, plan_id: &str) -> Option<PlanExecutionState> {
        self.machine.get_state(plan_id)
    }

    /// Serializes a plan's state.
    #[must_use]
    pub fn export_state(&self, plan_id: &str) -> Option<serde_json::Value> {
        self.machine.export_state(plan_id)
    }

    /// Registers a previously exported state.
    pub fn import_state(&self, value: serde_json::Value) -> Result<String, PlanflowError> {
        self.machine.import_state(value)
    }

    // Circuit breaker

    /// Returns a snapshot of the circuit breaker.
    #[must_use]
    pub fn get_circuit_breaker_state(&self) -> CircuitBreakerSnapshot {
        self.breaker.snapshot()
    }

    /// Replaces the circuit breaker thresholds.
    pub fn configure_circuit_breaker(&self, config: CircuitBreakerConfig) {
        self.breaker.configure(config);
    }

    /// Closes the circuit breaker and clears its counters.
    pub fn reset_circuit_breaker(&self) {
        self.breaker.reset();
    }

    // Janitor

    /// Returns a janitor bound to this scheduler's state store.
    #[must_use]
    pub fn janitor(&self) -> StateStoreJanitor {
        StateStoreJanitor::new(Arc::clone(&self.machine), self.janitor.clone())
    }

    /// Starts the periodic janitor. Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn_janitor(&self) -> JanitorHandle {
        self.janitor().spawn()
    }

    // Run loop

    async fn run(&self, plan_id: &str, executor: Arc<dyn StepExecutor>) -> Result<PlanRunReport, PlanflowError> {
        let run_id = Uuid::new_v4().to_string();
        let span = plan_run_span(plan_id, &run_id);
        self.run_in_span(plan_id, run_id, executor).instrument(span).await
    }

    async fn run_in_span(
        &self,
        plan_id: &str,
        run_id: String,
        executor: Arc<dyn StepExecutor>,
    ) -> Result<PlanRunReport, PlanflowError> {
        let control = self
            .machine
            .control(plan_id)
            .ok_or_else(|| PlanflowError::PlanNotFound(plan_id.to_string()))?;

        let started = Instant::now();
        let ctx = Arc::new(RunContext {
            plan_id: plan_id.to_string(),
            run_id,
            options: self.options(),
            control,
            machine: Arc::clone(&self.machine),
            events: Arc::clone(&self.events),
            executor,
        });

        let parallel = self.is_parallel_enabled() && !ctx.control.sequential_fallback();
        let circuit = self.breaker.state();

        info!(
            plan_id,
            run_id = %ctx.run_id,
            parallel,
            circuit = %circuit,
            max_workers = ctx.options.max_workers,
            "Starting plan run"
        );
        self.events
            .emit(
                names::RUN_STARTED,
                Some(json!({
                    "plan_id": plan_id,
                    "run_id": ctx.run_id,
                    "parallel": parallel,
                    "circuit": circuit,
                })),
            )
            .await;

        let mut results = Vec::new();
        let mut ran_parallel = false;
        let mut ran_sequential = false;

        let mut exit = if parallel && circuit == CircuitState::Closed {
            ran_parallel = true;
            self.run_parallel(&ctx, &mut results).await
        } else {
            if parallel {
                self.announce_fallback(&ctx, "circuit_not_closed").await;
            }
            LoopExit::SwitchToSequential
        };

        if exit == LoopExit::SwitchToSequential {
            ran_sequential = true;
            exit = self.run_sequential(&ctx, &mut results).await;
        }

        let mode = match (ran_parallel, ran_sequential) {
            (true, true) => ExecutionMode::Mixed,
            (true, false) => ExecutionMode::Parallel,
            _ => ExecutionMode::Sequential,
        };
        let outcome = self.finish_outcome(&ctx, exit).await;
        let duration_ms = duration_ms(started.elapsed());

        info!(
            plan_id,
            run_id = %ctx.run_id,
            mode = %mode,
            outcome = ?outcome,
            steps_run = results.len(),
            duration_ms,
            "Plan run finished"
        );
        self.events
            .emit(
                names::RUN_FINISHED,
                Some(json!({
                    "plan_id": plan_id,
                    "run_id": ctx.run_id,
                    "mode": mode,
                    "outcome": outcome,
                    "duration_ms": duration_ms,
                })),
            )
            .await;

        Ok(PlanRunReport {
            plan_id: plan_id.to_string(),
            run_id: ctx.run_id.clone(),
            mode,
            outcome,
            results,
            duration_ms,
        })
    }

    async fn run_parallel(&self, ctx: &Arc<RunContext>, results: &mut Vec<StepExecutionResult>) -> LoopExit {
        let max_workers = ctx.options.max_workers.max(1);
        let mut in_flight = FuturesUnordered::new();

        let exit = loop {
            if ctx.control.is_aborted() {
                break LoopExit::Aborted;
            }
            if !self.breaker.allows_parallel() {
                if ctx.control.activate_sequential_fallback() {
                    self.announce_fallback(ctx, "circuit_open").await;
                }
                break LoopExit::SwitchToSequential;
            }
            if ctx.control.sequential_fallback() {
                break LoopExit::SwitchToSequential;
            }

            let slots = max_workers.saturating_sub(in_flight.len());
            let mut launched = 0;
            if slots > 0 {
                for step in ctx.machine.ready_steps(&ctx.plan_id).into_iter().take(slots) {
                    if self.start(ctx, step).await {
                        in_flight.push(launch(Arc::clone(ctx), step));
                        launched += 1;
                    }
                }
            }

            if launched == 0 {
                match in_flight.next().await {
                    Some((step, joined)) => {
                        let result = self.settle(ctx, step, joined, true).await;
                        results.push(result);
                    }
                    None => break LoopExit::Drained,
                }
            }
        };

        if !in_flight.is_empty() {
            debug!(
                plan_id = %ctx.plan_id,
                in_flight = in_flight.len(),
                "Waiting for in-flight steps before leaving parallel mode"
            );
        }
        while let Some((step, joined)) = in_flight.next().await {
            let result = self.settle(ctx, step, joined, true).await;
            results.push(result);
        }

        exit
    }

    async fn run_sequential(&self, ctx: &Arc<RunContext>, results: &mut Vec<StepExecutionResult>) -> LoopExit {
        loop {
            if ctx.control.is_aborted() {
                return LoopExit::Aborted;
            }
            let Some(step) = ctx.machine.ready_steps(&ctx.plan_id).first().copied() else {
                return LoopExit::Drained;
            };
            if !self.start(ctx, step).await {
                return LoopExit::Drained;
            }

            let (step, joined) = launch(Arc::clone(ctx), step).await;
            let result = self.settle(ctx, step, joined, false).await;
            let failed = !result.success;
            let aborted = result.error_kind == Some(StepErrorKind::Aborted) || ctx.control.is_aborted();
            results.push(result);

            if aborted {
                return LoopExit::Aborted;
            }
            if failed {
                warn!(plan_id = %ctx.plan_id, step, "Sequential run stopped at failed step");
                return LoopExit::StoppedOnFailure;
            }
        }
    }

    async fn start(&self, ctx: &RunContext, step: u32) -> bool {
        if ctx.machine.start_step(&ctx.plan_id, step).is_none() {
            return false;
        }
        self.events
            .emit(
                names::STEP_STARTED,
                Some(json!({"plan_id": ctx.plan_id, "run_id": ctx.run_id, "step": step})),
            )
            .await;
        true
    }

    /// Records a settled worker in the state machine and the circuit breaker.
    async fn settle(
        &self,
        ctx: &RunContext,
        step: u32,
        joined: Result<StepAttempt, JoinError>,
        parallel: bool,
    ) -> StepExecutionResult {
        let attempt = joined.unwrap_or_else(|err| {
            let attempts = ctx
                .machine
                .get_step(&ctx.plan_id, step)
                .map_or(1, |s| s.retry_count + 1);
            warn!(plan_id = %ctx.plan_id, step, error = %err, "Step worker panicked");
            StepAttempt {
                attempts,
                duration_ms: 0,
                result: Err(StepFailure {
                    error: format!("step executor panicked: {err}"),
                    kind: StepErrorKind::Panicked,
                }),
            }
        });

        match attempt.result {
            Ok(files_modified) => {
                self.breaker.record_success();
                ctx.machine.complete_step(
                    &ctx.plan_id,
                    step,
                    StepCompletion::new().with_files(files_modified.clone()),
                );
                self.events
                    .emit(
                        names::STEP_COMPLETED,
                        Some(json!({
                            "plan_id": ctx.plan_id,
                            "run_id": ctx.run_id,
                            "step": step,
                            "attempts": attempt.attempts,
                            "duration_ms": attempt.duration_ms,
                        })),
                    )
                    .await;

                StepExecutionResult {
                    step_number: step,
                    status: StepStatus::Completed,
                    success: true,
                    error: None,
                    error_kind: None,
                    files_modified,
                    attempts: attempt.attempts,
                    duration_ms: attempt.duration_ms,
                    skipped_dependents: Vec::new(),
                }
            }
            Err(failure) => {
                if failure.kind.counts_against_breaker() {
                    self.breaker.record_failure(failure.kind == StepErrorKind::Timeout);
                }

                ctx.machine
                    .fail_step(&ctx.plan_id, step, failure.error.clone(), FailOptions::terminal());
                let skipped = if parallel {
                    ctx.machine.skip_dependent_steps(&ctx.plan_id, step)
                } else {
                    Vec::new()
                };

                warn!(
                    plan_id = %ctx.plan_id,
                    step,
                    kind = %failure.kind,
                    attempts = attempt.attempts,
                    error = %failure.error,
                    skipped = ?skipped,
                    "Step failed"
                );
                self.events
                    .emit(
                        names::STEP_FAILED,
                        Some(json!({
                            "plan_id": ctx.plan_id,
                            "run_id": ctx.run_id,
                            "step": step,
                            "kind": failure.kind,
                            "error": failure.error,
                            "attempts": attempt.attempts,
                        })),
                    )
                    .await;
                if !skipped.is_empty() {
                    self.events
                        .emit(
                            names::STEPS_SKIPPED,
                            Some(json!({
                                "plan_id": ctx.plan_id,
                                "run_id": ctx.run_id,
                                "cause": step,
                                "steps": skipped,
                            })),
                        )
                        .await;
                }

                if parallel && ctx.options.stop_on_failure && failure.kind != StepErrorKind::Aborted {
                    ctx.control
                        .abort_signal()
                        .abort(format!("step {step} failed with stop_on_failure set"));
                }

                StepExecutionResult {
                    step_number: step,
                    status: StepStatus::Failed,
                    success: false,
                    error: Some(failure.error),
                    error_kind: Some(failure.kind),
                    files_modified: Vec::new(),
                    attempts: attempt.attempts,
                    duration_ms: attempt.duration_ms,
                    skipped_dependents: skipped,
                }
            }
        }
    }

    async fn announce_fallback(&self, ctx: &RunContext, reason: &str) {
        warn!(
            plan_id = %ctx.plan_id,
            run_id = %ctx.run_id,
            reason,
            "Falling back to sequential execution"
        );
        self.events
            .emit(
                names::FALLBACK_SEQUENTIAL,
                Some(json!({"plan_id": ctx.plan_id, "run_id": ctx.run_id, "reason": reason})),
            )
            .await;
    }

    async fn finish_outcome(&self, ctx: &RunContext, exit: LoopExit) -> RunOutcome {
        match exit {
            LoopExit::Aborted => {
                let reason = ctx.control.abort_signal().reason().unwrap_or_default();
                ctx.machine.halt_plan(&ctx.plan_id, &reason);
                self.events
                    .emit(
                        names::PLAN_ABORTED,
                        Some(json!({"plan_id": ctx.plan_id, "run_id": ctx.run_id, "reason": reason})),
                    )
                    .await;
                RunOutcome::Aborted
            }
            LoopExit::StoppedOnFailure => {
                ctx.machine.halt_plan(&ctx.plan_id, "sequential run stopped on failure");
                RunOutcome::Failed
            }
            LoopExit::Drained | LoopExit::SwitchToSequential => {
                let Some(state) = ctx.machine.get_state(&ctx.plan_id) else {
                    return RunOutcome::Failed;
                };
                if state.all_terminal() {
                    if state.has_failures() {
                        RunOutcome::Failed
                    } else {
                        RunOutcome::Completed
                    }
                } else {
                    let unresolved = state.unresolved_steps();
                    warn!(
                        plan_id = %ctx.plan_id,
                        unresolved = ?unresolved,
                        "Plan run stalled: no ready steps but not every step is terminal"
                    );
                    self.events
                        .emit(
                            names::PLAN_STALLED,
                            Some(json!({
                                "plan_id": ctx.plan_id,
                                "run_id": ctx.run_id,
                                "unresolved": unresolved,
                            })),
                        )
                        .await;
                    RunOutcome::Stalled { unresolved }
                }
            }
        }
    }
}

/// Why a run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    /// Nothing ready and nothing in flight.
    Drained,
    /// The parallel path handed over to the sequential path.
    SwitchToSequential,
    /// The abort flag was observed.
    Aborted,
    /// The sequential path hit a failure.
    StoppedOnFailure,
}

/// Per-run data shared with worker tasks.
struct RunContext {
    plan_id: String,
    run_id: String,
    options: ParallelExecutionOptions,
    control: Arc<PlanRunControl>,
    machine: Arc<ExecutionStateMachine>,
    events: Arc<dyn EventSink>,
    executor: Arc<dyn StepExecutor>,
}

#[derive(Debug)]
struct StepFailure {
    error: String,
    kind: StepErrorKind,
}

/// What a worker reports back after its last attempt.
#[derive(Debug)]
struct StepAttempt {
    attempts: u32,
    duration_ms: u64,
    result: Result<Vec<String>, StepFailure>,
}

/// Spawns the attempt loop for one step and tags the join result with the step number.
fn launch(ctx: Arc<RunContext>, step: u32) -> impl Future<Output = (u32, Result<StepAttempt, JoinError>)> {
    let span = step_span(&ctx.plan_id, step);
    let handle = tokio::spawn(run_attempts(ctx, step).instrument(span));
    async move { (step, handle.await) }
}

/// Runs the executor with a timeout race per attempt, retrying up to the budget.
async fn run_attempts(ctx: Arc<RunContext>, step: u32) -> StepAttempt {
    let started = Instant::now();
    let timeout = ctx.options.step_timeout();
    let max_attempts = ctx.options.max_attempts();
    let mut backoff = ctx.options.retry.backoff();
    let mut attempt = 1;

    loop {
        let failure = match tokio::time::timeout(timeout, ctx.executor.execute(&ctx.plan_id, step)).await {
            Ok(outcome) if outcome.success => {
                return StepAttempt {
                    attempts: attempt,
                    duration_ms: duration_ms(started.elapsed()),
                    result: Ok(outcome.files_modified),
                };
            }
            Ok(outcome) => StepFailure {
                error: outcome
                    .error
                    .unwrap_or_else(|| "step executor reported failure".to_string()),
                kind: StepErrorKind::ExecutorFailure,
            },
            Err(_) => {
                warn!(plan_id = %ctx.plan_id, step, attempt, timeout_ms = ctx.options.step_timeout_ms, "Step attempt timed out");
                StepFailure {
                    error: format!("step {step} timed out after {}ms", ctx.options.step_timeout_ms),
                    kind: StepErrorKind::Timeout,
                }
            }
        };

        if attempt >= max_attempts {
            return StepAttempt {
                attempts: attempt,
                duration_ms: duration_ms(started.elapsed()),
                result: Err(failure),
            };
        }
        if ctx.control.is_aborted() {
            return aborted_attempt(attempt, started, &failure);
        }

        ctx.machine.record_retry_attempt(&ctx.plan_id, step, &failure.error);
        let delay = backoff.next_delay();
        debug!(
            plan_id = %ctx.plan_id,
            step,
            attempt,
            kind = %failure.kind,
            delay_ms = duration_ms(delay),
            "Retrying step"
        );
        ctx.events.try_emit(
            names::STEP_RETRYING,
            Some(json!({
                "plan_id": ctx.plan_id,
                "run_id": ctx.run_id,
                "step": step,
                "attempt": attempt,
                "kind": failure.kind,
                "error": failure.error,
            })),
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
            if ctx.control.is_aborted() {
                return aborted_attempt(attempt, started, &failure);
            }
        }
        attempt += 1;
    }
}

fn aborted_attempt(attempt: u32, started: Instant, last: &StepFailure) -> StepAttempt {
    StepAttempt {
        attempts: attempt,
        duration_ms: duration_ms(started.elapsed()),
        result: Err(StepFailure {
            error: format!("plan aborted after attempt {attempt}: {}", last.error),
            kind: StepErrorKind::Aborted,
        }),
    }
}
