//! End-to-end scheduler runs.

use super::*;
use crate::config::{JanitorConfig, SchedulerConfig};
use crate::core::{Plan, PlanStatus, Step, StepErrorKind, StepOutcome, StepStatus};
use crate::errors::{PlanflowError, ValidationCode};
use crate::events::{names, CollectingEventSink};
use crate::execution::StepCompletion;
use crate::resilience::{CircuitBreakerConfig, CircuitState};
use crate::testing::{
    diamond_plan, fan_out_plan, independent_plan, linear_plan, ExecutionRecord, FailingExecutor,
    InMemoryPlanSupplier, RecordingExecutor, ScriptedExecutor, SlowExecutor, SucceedingExecutor,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn options() -> ParallelExecutionOptions {
    ParallelExecutionOptions::new()
        .with_step_timeout(Duration::from_secs(5))
        .with_max_retries(0)
}

fn scheduler_with(options: ParallelExecutionOptions) -> (ParallelScheduler, Arc<CollectingEventSink>) {
    let sink = Arc::new(CollectingEventSink::new());
    let scheduler = ParallelScheduler::new(SchedulerConfig::new().with_parallel(options))
        .with_event_sink(Arc::clone(&sink) as Arc<dyn crate::events::EventSink>);
    (scheduler, sink)
}

#[derive(Debug)]
struct PanickingExecutor;

#[async_trait]
impl StepExecutor for PanickingExecutor {
    async fn execute(&self, _plan_id: &str, step_number: u32) -> StepOutcome {
        if step_number == 1 {
            panic!("executor exploded");
        }
        StepOutcome::ok()
    }
}

#[tokio::test]
async fn test_linear_plan_completes_in_order() {
    let (scheduler, sink) = scheduler_with(options());
    let executor = Arc::new(ScriptedExecutor::new());

    let report = scheduler
        .execute_ready_steps_parallel(&linear_plan("lin", 3), executor.clone())
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.mode, ExecutionMode::Parallel);
    assert_eq!(report.completed_steps(), vec![1, 2, 3]);
    assert_eq!(executor.calls(), vec![1, 2, 3]);

    let progress = scheduler.get_progress("lin").unwrap();
    assert_eq!(progress.percentage, 100);
    assert_eq!(scheduler.get_state("lin").unwrap().status, PlanStatus::Completed);

    let types = sink.event_types();
    assert_eq!(types.first().map(String::as_str), Some(names::RUN_STARTED));
    assert_eq!(types.last().map(String::as_str), Some(names::RUN_FINISHED));
    assert_eq!(sink.events_of_type(names::STEP_COMPLETED).len(), 3);
}

#[tokio::test]
async fn test_worker_limit_is_respected() {
    let (scheduler, _) = scheduler_with(options().with_max_workers(2));
    let executor = Arc::new(RecordingExecutor::new(Duration::from_millis(40)));

    let report = scheduler
        .execute_ready_steps_parallel(&independent_plan("w", 3), executor.clone())
        .await
        .unwrap();

    assert!(report.outcome.is_success());
    assert_eq!(executor.peak_concurrency(), 2);
    assert_eq!(executor.start_order(), vec![1, 2, 3]);

    let third = executor.position(ExecutionRecord::Started(3)).unwrap();
    let first_finish = [1, 2]
        .iter()
        .filter_map(|s| executor.position(ExecutionRecord::Finished(*s)))
        .min()
        .unwrap();
    assert!(first_finish < third);
}

#[tokio::test]
async fn test_fan_out_runs_children_concurrently() {
    let (scheduler, _) = scheduler_with(options().with_max_workers(4));
    let executor = Arc::new(RecordingExecutor::new(Duration::from_millis(30)));

    let report = scheduler
        .execute_ready_steps_parallel(&fan_out_plan("fan", 3), executor.clone())
        .await
        .unwrap();

    assert!(report.outcome.is_success());
    assert_eq!(executor.peak_concurrency(), 3);
    let root_done = executor.position(ExecutionRecord::Finished(1)).unwrap();
    for child in 2..=4 {
        assert!(executor.position(ExecutionRecord::Started(child)).unwrap() > root_done);
    }
}

#[tokio::test]
async fn test_failure_cascades_to_dependents() {
    let (scheduler, sink) = scheduler_with(options());
    let executor = Arc::new(FailingExecutor::new([2], "compile error"));

    let report = scheduler
        .execute_ready_steps_parallel(&diamond_plan("dia"), executor)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Failed);
    let failed = report.result(2).unwrap();
    assert_eq!(failed.status, StepStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("compile error"));
    assert_eq!(failed.error_kind, Some(StepErrorKind::ExecutorFailure));
    assert_eq!(failed.skipped_dependents, vec![4]);
    assert!(report.result(4).is_none());

    let state = scheduler.get_state("dia").unwrap();
    assert_eq!(state.status_of(3), Some(StepStatus::Completed));
    assert_eq!(state.status_of(4), Some(StepStatus::Skipped));
    assert_eq!(state.step(4).unwrap().skipped_because_of, Some(2));
    assert_eq!(state.status, PlanStatus::Failed);
    assert!(sink.contains(names::STEPS_SKIPPED));
}

#[tokio::test]
async fn test_retry_until_success() {
    let (scheduler, sink) = scheduler_with(options().with_max_retries(2));
    let executor = Arc::new(
        ScriptedExecutor::new().script(1, [StepOutcome::fail("flaky"), StepOutcome::fail("flaky"), StepOutcome::ok()]),
    );

    let report = scheduler
        .execute_ready_steps_parallel(&independent_plan("r", 1), executor.clone())
        .await
        .unwrap();

    let result = report.result(1).unwrap();
    assert!(result.success);
    assert_eq!(result.attempts, 3);
    assert_eq!(executor.attempts(1), 3);
    assert_eq!(scheduler.machine().get_step("r", 1).unwrap().retry_count, 2);
    assert_eq!(sink.events_of_type(names::STEP_RETRYING).len(), 2);
    assert_eq!(scheduler.get_circuit_breaker_state().total_failures, 0);
}

#[tokio::test]
async fn test_retries_exhausted() {
    let (scheduler, _) = scheduler_with(options().with_max_retries(2));
    let executor = Arc::new(FailingExecutor::always("down"));

    let report = scheduler
        .execute_ready_steps_parallel(&independent_plan("x", 1), executor)
        .await
        .unwrap();

    let result = report.result(1).unwrap();
    assert!(!result.success);
    assert_eq!(result.attempts, 3);
    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(scheduler.get_circuit_breaker_state().total_failures, 1);
}

#[tokio::test]
async fn test_timeout_is_retried_and_flagged() {
    let (scheduler, _) = scheduler_with(
        options()
            .with_step_timeout(Duration::from_millis(20))
            .with_max_retries(1),
    );
    let executor = Arc::new(ScriptedExecutor::new().delay(1, Duration::from_millis(500)));

    let report = scheduler
        .execute_ready_steps_parallel(&independent_plan("t", 1), executor.clone())
        .await
        .unwrap();

    let result = report.result(1).unwrap();
    assert!(result.timed_out());
    assert_eq!(result.attempts, 2);
    assert_eq!(executor.attempts(1), 2);

    let breaker = scheduler.get_circuit_breaker_state();
    assert_eq!(breaker.total_failures, 1);
    assert_eq!(breaker.timeout_failures, 1);
}

#[tokio::test]
async fn test_stop_on_failure_aborts_run() {
    let (scheduler, sink) = scheduler_with(options().with_max_workers(2).with_stop_on_failure(true));
    let plan = Plan::new("stop")
        .with_step(Step::new(1))
        .with_step(Step::new(2))
        .with_step(Step::new(3).depends_on([2]));
    let executor = Arc::new(
        ScriptedExecutor::new()
            .script(1, [StepOutcome::fail("fatal")])
            .delay(2, Duration::from_millis(50)),
    );

    let report = scheduler
        .execute_ready_steps_parallel(&plan, executor.clone())
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert_eq!(report.failed_steps(), vec![1]);
    assert_eq!(report.completed_steps(), vec![2]);
    assert_eq!(executor.attempts(3), 0);

    let state = scheduler.get_state("stop").unwrap();
    assert_eq!(state.status, PlanStatus::Failed);
    assert_eq!(state.status_of(3), Some(StepStatus::Ready));
    assert!(sink.contains(names::PLAN_ABORTED));
}

#[tokio::test]
async fn test_abort_before_run_launches_nothing() {
    let (scheduler, _) = scheduler_with(options());
    let plan = linear_plan("ab", 2);
    scheduler.initialize_execution(&plan).unwrap();

    assert!(scheduler.abort_plan_execution("ab"));
    assert!(!scheduler.abort_plan_execution("missing"));

    let executor = Arc::new(ScriptedExecutor::new());
    let report = scheduler
        .execute_ready_steps_parallel(&plan, executor.clone())
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert!(report.results.is_empty());
    assert!(executor.calls().is_empty());
    assert_eq!(scheduler.get_state("ab").unwrap().status, PlanStatus::Failed);
}

#[tokio::test]
async fn test_abort_during_run_stops_retries() {
    let (scheduler, _) = scheduler_with(options().with_max_retries(5));
    let scheduler = Arc::new(scheduler);
    let executor = Arc::new(
        ScriptedExecutor::new()
            .script(1, (0..6).map(|_| StepOutcome::fail("again")))
            .delay(1, Duration::from_millis(30)),
    );

    let plan = independent_plan("mid", 1);
    scheduler.initialize_execution(&plan).unwrap();
    let runner = {
        let scheduler = Arc::clone(&scheduler);
        let executor = executor.clone();
        tokio::spawn(async move { scheduler.execute_ready_steps_parallel(&plan, executor).await })
    };

    tokio::time::sleep(Duration::from_millis(45)).await;
    scheduler.abort_plan_execution("mid");
    let report = runner.await.unwrap().unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted);
    let result = report.result(1).unwrap();
    assert_eq!(result.error_kind, Some(StepErrorKind::Aborted));
    assert!(executor.attempts(1) < 6);
    assert_eq!(scheduler.get_circuit_breaker_state().total_failures, 0);
}

fn slow_retry_options() -> ParallelExecutionOptions {
    options().with_max_retries(3).with_retry_policy(
        RetryPolicy::default()
            .with_base_delay_ms(200)
            .with_backoff(BackoffStrategy::Constant),
    )
}

async fn abort_during_backoff(scheduler: Arc<ParallelScheduler>, plan_id: &str) -> (PlanRunReport, u32) {
    let executor = Arc::new(FailingExecutor::always("still broken"));
    let plan = independent_plan(plan_id, 1);
    scheduler.initialize_execution(&plan).unwrap();
    let runner = {
        let scheduler = Arc::clone(&scheduler);
        let executor = executor.clone();
        tokio::spawn(async move { scheduler.execute_ready_steps_parallel(&plan, executor).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(scheduler.abort_plan_execution(plan_id));
    let report = runner.await.unwrap().unwrap();
    let attempts = report.result(1).unwrap().attempts;
    (report, attempts)
}

#[tokio::test]
async fn test_abort_during_backoff_prevents_next_attempt() {
    let (scheduler, _) = scheduler_with(slow_retry_options());
    let (report, attempts) = abort_during_backoff(Arc::new(scheduler), "backoff").await;

    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert_eq!(report.result(1).unwrap().error_kind, Some(StepErrorKind::Aborted));
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn test_sequential_abort_reports_aborted() {
    let (scheduler, sink) = scheduler_with(slow_retry_options());
    scheduler.disable_parallel_execution();
    let scheduler = Arc::new(scheduler);
    let (report, attempts) = abort_during_backoff(Arc::clone(&scheduler), "seq-abort").await;

    assert_eq!(report.mode, ExecutionMode::Sequential);
    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert_eq!(attempts, 1);
    assert!(sink.contains(names::PLAN_ABORTED));
    assert_eq!(scheduler.get_state("seq-abort").unwrap().status, PlanStatus::Failed);
}

#[tokio::test]
async fn test_breaker_open_falls_back_to_sequential() {
    let config = SchedulerConfig::new()
        .with_parallel(options().with_max_workers(1))
        .with_circuit_breaker(CircuitBreakerConfig::new().with_failure_threshold(1));
    let sink = Arc::new(CollectingEventSink::new());
    let scheduler = ParallelScheduler::new(config).with_event_sink(sink.clone());

    let report = scheduler
        .execute_ready_steps_parallel(&independent_plan("cb", 4), Arc::new(FailingExecutor::new([1], "boom")))
        .await
        .unwrap();

    assert_eq!(report.mode, ExecutionMode::Mixed);
    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(report.completed_steps(), vec![2, 3, 4]);
    assert_eq!(scheduler.get_circuit_breaker_state().state, CircuitState::Open);
    assert!(sink.contains(names::FALLBACK_SEQUENTIAL));
    assert!(scheduler.machine().control("cb").unwrap().sequential_fallback());

    // Other plans also avoid the parallel path while the circuit is open.
    let report = scheduler
        .execute_ready_steps_parallel(&independent_plan("other", 2), Arc::new(SucceedingExecutor::new()))
        .await
        .unwrap();
    assert_eq!(report.mode, ExecutionMode::Sequential);
    assert!(report.outcome.is_success());
}

#[tokio::test]
async fn test_half_open_recovers_through_sequential_runs() {
    let config = SchedulerConfig::new()
        .with_parallel(options())
        .with_circuit_breaker(
            CircuitBreakerConfig::new()
                .with_failure_threshold(1)
                .with_reset_timeout(Duration::from_millis(20))
                .with_success_threshold(2),
        );
    let scheduler = ParallelScheduler::new(config);

    scheduler
        .execute_ready_steps_parallel(&independent_plan("bad", 1), Arc::new(FailingExecutor::always("x")))
        .await
        .unwrap();
    assert_eq!(scheduler.get_circuit_breaker_state().state, CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(scheduler.get_circuit_breaker_state().state, CircuitState::HalfOpen);

    let report = scheduler
        .execute_ready_steps_parallel(&independent_plan("good", 2), Arc::new(SucceedingExecutor::new()))
        .await
        .unwrap();
    assert_eq!(report.mode, ExecutionMode::Sequential);
    assert_eq!(scheduler.get_circuit_breaker_state().state, CircuitState::Closed);

    let report = scheduler
        .execute_ready_steps_parallel(&independent_plan("next", 2), Arc::new(SucceedingExecutor::new()))
        .await
        .unwrap();
    assert_eq!(report.mode, ExecutionMode::Parallel);
}

#[tokio::test]
async fn test_sequential_stops_without_cascade() {
    let (scheduler, _) = scheduler_with(options());
    scheduler.disable_parallel_execution();
    assert!(!scheduler.is_parallel_enabled());

    let report = scheduler
        .execute_ready_steps_parallel(&diamond_plan("seq"), Arc::new(FailingExecutor::new([2], "nope")))
        .await
        .unwrap();

    assert_eq!(report.mode, ExecutionMode::Sequential);
    assert_eq!(report.outcome, RunOutcome::Failed);
    assert!(report.result(2).unwrap().skipped_dependents.is_empty());

    let state = scheduler.get_state("seq").unwrap();
    assert_eq!(state.status_of(3), Some(StepStatus::Ready));
    assert_eq!(state.status_of(4), Some(StepStatus::Blocked));
    assert_eq!(state.status, PlanStatus::Failed);
}

#[tokio::test]
async fn test_sequential_runs_one_at_a_time() {
    let (scheduler, _) = scheduler_with(options().with_max_workers(4));
    scheduler.disable_parallel_execution();
    let executor = Arc::new(RecordingExecutor::new(Duration::from_millis(5)));

    let report = scheduler
        .execute_ready_steps_parallel(&independent_plan("one", 3), executor.clone())
        .await
        .unwrap();

    assert!(report.outcome.is_success());
    assert_eq!(executor.peak_concurrency(), 1);

    scheduler.enable_parallel_execution(options().with_max_workers(3));
    assert!(scheduler.is_parallel_enabled());
    assert_eq!(scheduler.options().max_workers, 3);
}

#[tokio::test]
async fn test_stalled_run_is_reported() {
    let (scheduler, sink) = scheduler_with(options());
    let plan = linear_plan("stuck", 2);
    scheduler.initialize_execution(&plan).unwrap();
    // Step 1 is marked running by someone else and never finishes.
    scheduler.machine().start_step("stuck", 1).unwrap();

    let report = scheduler
        .execute_ready_steps_parallel(&plan, Arc::new(SucceedingExecutor::new()))
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Stalled { unresolved: vec![1, 2] });
    assert!(report.results.is_empty());
    assert!(sink.contains(names::PLAN_STALLED));
}

#[tokio::test]
async fn test_panicking_executor_is_recorded() {
    let (scheduler, _) = scheduler_with(options());

    let report = scheduler
        .execute_ready_steps_parallel(&fan_out_plan("panic", 1), Arc::new(PanickingExecutor))
        .await
        .unwrap();

    let result = report.result(1).unwrap();
    assert_eq!(result.error_kind, Some(StepErrorKind::Panicked));
    assert_eq!(result.skipped_dependents, vec![2]);
    assert_eq!(scheduler.get_circuit_breaker_state().total_failures, 1);
}

#[tokio::test]
async fn test_invalid_plan_is_rejected() {
    let (scheduler, _) = scheduler_with(options());
    let plan = Plan::new("cyc")
        .with_step(Step::new(1).depends_on([2]))
        .with_step(Step::new(2).depends_on([1]));

    let err = scheduler
        .execute_ready_steps_parallel(&plan, Arc::new(SucceedingExecutor::new()))
        .await
        .unwrap_err();

    match err {
        PlanflowError::Validation(e) => assert_eq!(e.code, ValidationCode::CycleDetected),
        other => panic!("unexpected error: {other}"),
    }
    assert!(scheduler.get_state("cyc").is_none());
}

#[tokio::test]
async fn test_resume_uses_supplier() {
    let (scheduler, _) = scheduler_with(options());
    let plan = linear_plan("res", 3);

    let mut supplier = MockPlanSupplier::new();
    let supplied = plan.clone();
    supplier
        .expect_load_plan()
        .withf(|id: &str| id == "res")
        .times(1)
        .returning(move |_| Some(supplied.clone()));

    scheduler.initialize_execution(&plan).unwrap();
    scheduler.machine().start_step("res", 1).unwrap();
    scheduler
        .machine()
        .complete_step("res", 1, StepCompletion::new())
        .unwrap();

    let executor = Arc::new(ScriptedExecutor::new());
    let report = scheduler.resume_plan("res", &supplier, executor.clone()).await.unwrap();

    assert!(report.outcome.is_success());
    assert_eq!(executor.calls(), vec![2, 3]);
}

#[tokio::test]
async fn test_resume_unknown_plan() {
    let (scheduler, _) = scheduler_with(options());
    let mut supplier = MockPlanSupplier::new();
    supplier.expect_load_plan().returning(|_| None);

    let err = scheduler
        .resume_plan("ghost", &supplier, Arc::new(SucceedingExecutor::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, PlanflowError::PlanNotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn test_resume_reinitializes_on_version_change() {
    let (scheduler, _) = scheduler_with(options());
    let v1 = linear_plan("ver", 2);
    scheduler.initialize_execution(&v1).unwrap();
    scheduler.machine().start_step("ver", 1).unwrap();
    scheduler.machine().complete_step("ver", 1, StepCompletion::new()).unwrap();

    let supplier = InMemoryPlanSupplier::with_plans([linear_plan("ver", 2).with_version(2)]);
    let executor = Arc::new(ScriptedExecutor::new());
    let report = scheduler.resume_plan("ver", &supplier, executor.clone()).await.unwrap();

    assert!(report.outcome.is_success());
    assert_eq!(executor.calls(), vec![1, 2]);
    assert_eq!(scheduler.get_state("ver").unwrap().plan_version, 2);
}

#[tokio::test]
async fn test_reset_execution_clears_abort() {
    let (scheduler, _) = scheduler_with(options());
    let supplier = InMemoryPlanSupplier::with_plans([linear_plan("rst", 2)]);
    scheduler.reset_execution("rst", &supplier).unwrap();
    scheduler.abort_plan_execution("rst");

    let state = scheduler.reset_execution("rst", &supplier).unwrap();
    assert_eq!(state.ready_steps, vec![1]);
    assert!(!scheduler.machine().control("rst").unwrap().is_aborted());

    let err = scheduler.reset_execution("nope", &supplier).unwrap_err();
    assert!(matches!(err, PlanflowError::PlanNotFound(_)));
}

#[tokio::test]
async fn test_export_import_between_schedulers() {
    let (scheduler, _) = scheduler_with(options());
    scheduler
        .execute_ready_steps_parallel(&diamond_plan("exp"), Arc::new(SucceedingExecutor::with_files(["x.rs"])))
        .await
        .unwrap();

    let exported = scheduler.export_state("exp").unwrap();
    let other = ParallelScheduler::default();
    assert_eq!(other.import_state(exported).unwrap(), "exp");
    assert_eq!(other.get_state("exp"), scheduler.get_state("exp"));
    assert_eq!(
        other.get_state("exp").unwrap().step(4).unwrap().files_modified,
        vec!["x.rs".to_string()]
    );
}

#[tokio::test]
async fn test_configure_and_reset_breaker() {
    let (scheduler, _) = scheduler_with(options());
    scheduler.configure_circuit_breaker(CircuitBreakerConfig::new().with_failure_threshold(1));
    assert_eq!(scheduler.get_circuit_breaker_state().config.failure_threshold, 1);

    scheduler
        .execute_ready_steps_parallel(&independent_plan("f", 1), Arc::new(FailingExecutor::always("x")))
        .await
        .unwrap();
    assert_eq!(scheduler.get_circuit_breaker_state().state, CircuitState::Open);

    scheduler.reset_circuit_breaker();
    let snapshot = scheduler.get_circuit_breaker_state();
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.total_failures, 0);
}

#[tokio::test]
async fn test_janitor_evicts_finished_runs() {
    let config = SchedulerConfig::new()
        .with_parallel(options())
        .with_janitor(JanitorConfig::new().with_ttl(Duration::ZERO).with_interval(Duration::from_millis(10)));
    let scheduler = ParallelScheduler::new(config);

    scheduler
        .execute_ready_steps_parallel(&linear_plan("done", 2), Arc::new(SlowExecutor::with_delay_ms(1)))
        .await
        .unwrap();
    scheduler.initialize_execution(&linear_plan("idle", 2)).unwrap();

    let handle = scheduler.spawn_janitor();
    tokio::time::sleep(Duration::from_millis(60)).await;
    handle.shutdown().await;

    assert!(scheduler.get_state("done").is_none());
    assert!(scheduler.get_state("idle").is_some());
}

#[test]
fn test_blocking_run_with_tokio_test() {
    let (scheduler, _) = scheduler_with(options());
    let report = tokio_test::block_on(
        scheduler.execute_ready_steps_parallel(&linear_plan("blk", 2), Arc::new(SucceedingExecutor::new())),
    )
    .unwrap();
    assert!(report.outcome.is_success());
    assert!(!report.run_id.is_empty());
}
