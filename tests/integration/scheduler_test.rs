//! Scheduler Integration Tests
//!
//! Admission, per-queue concurrency, retries and cancellation through the
//! public scheduler API, with analysis steps gated or failing on demand.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use automation_hub::services::engine::planner::step_ids;
use automation_hub::services::engine::scheduler::{SCHEDULER_INIT_FAILED, TASK_FAILED};
use automation_hub::{
    AppError, CancelOutcome, Capabilities, EngineConfig, EngineEvent, EventBus, ExecutionStatus,
    Executor, Planner, QueueConfig, RequirementPriority, Scheduler, StepHandler, SubmitOptions,
    STEP_EXECUTION_FAILED,
};
use automation_hub_core::Severity;

use crate::support::{
    analysis_requirement, collect_until, drain, fast_retry_config, wait_until, FailingAnalyzer,
    GatedAnalyzer, GatedStep, Harness, RecordingRecovery,
};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_critical_queue_caps_concurrency() {
    let analyzer = Arc::new(GatedAnalyzer::new());
    let h = Harness::new(EngineConfig::default(), analyzer.clone()).await;

    for i in 0..3 {
        h.scheduler
            .submit_task(
                analysis_requirement(&format!("req-{i}"), RequirementPriority::Critical),
                h.context(),
                None,
                SubmitOptions::default(),
            )
            .await
            .unwrap();
    }

    let status = h.scheduler.get_queue_status("critical").await.unwrap();
    assert_eq!(status.active_executions, 2);
    assert_eq!(status.queued_tasks, 1);
    assert!(wait_until(WAIT, || async { analyzer.started() == 2 }).await);

    analyzer.release(3);
    h.wait_idle().await;

    let stats = h.scheduler.get_scheduler_stats().await;
    assert_eq!(stats.completed, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.total_active, 0);
    assert!(h.recovery.reports().is_empty());
}

#[tokio::test]
async fn test_full_queue_rejects_submission() {
    let analyzer = Arc::new(GatedAnalyzer::new());
    let config = EngineConfig {
        max_queue_size: 1,
        ..Default::default()
    };
    let h = Harness::new(config, analyzer.clone()).await;

    for i in 0..3 {
        h.scheduler
            .submit_task(
                analysis_requirement(&format!("req-{i}"), RequirementPriority::Critical),
                h.context(),
                None,
                SubmitOptions::default(),
            )
            .await
            .unwrap();
    }
    let rejected = h
        .scheduler
        .submit_task(
            analysis_requirement("req-overflow", RequirementPriority::Critical),
            h.context(),
            None,
            SubmitOptions::default(),
        )
        .await;
    assert!(matches!(
        rejected,
        Err(AppError::QueueFull { ref queue_id, max_size: 1 }) if queue_id == "critical"
    ));

    analyzer.release(3);
    h.wait_idle().await;
    assert_eq!(h.scheduler.get_scheduler_stats().await.submitted, 3);
}

#[tokio::test]
async fn test_unknown_queue_is_rejected() {
    let h = Harness::new(EngineConfig::default(), Arc::new(GatedAnalyzer::new())).await;
    let result = h
        .scheduler
        .submit_task(
            analysis_requirement("req-1", RequirementPriority::Low),
            h.context(),
            Some("nope"),
            SubmitOptions::default(),
        )
        .await;
    assert!(matches!(result, Err(AppError::UnknownQueue(_))));
}

#[tokio::test]
async fn test_burst_never_exceeds_queue_limit() {
    let analyzer = Arc::new(GatedAnalyzer::new());
    let h = Harness::new(EngineConfig::default(), analyzer.clone()).await;

    for i in 0..20 {
        h.scheduler
            .submit_task(
                analysis_requirement(&format!("req-{i}"), RequirementPriority::Medium),
                h.context(),
                None,
                SubmitOptions::default(),
            )
            .await
            .unwrap();
    }
    let status = h.scheduler.get_queue_status("medium").await.unwrap();
    assert_eq!(status.active_executions, 5);
    assert_eq!(status.queued_tasks, 15);

    for _ in 0..20 {
        analyzer.release(1);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let status = h.scheduler.get_queue_status("medium").await.unwrap();
        assert!(status.active_executions <= 5);
    }
    h.wait_idle().await;
    assert_eq!(h.scheduler.get_scheduler_stats().await.completed, 20);
    assert_eq!(analyzer.started(), 20);
}

#[tokio::test]
async fn test_dispatch_order_is_priority_then_submission() {
    let analyzer = Arc::new(GatedAnalyzer::new());
    let h = Harness::new(EngineConfig::default(), analyzer.clone()).await;
    let lane = h
        .scheduler
        .create_queue("Serial Lane", RequirementPriority::Low, 1)
        .await
        .unwrap();
    assert_eq!(lane, "serial-lane");

    let submit = |id: &'static str, priority: i64| {
        let scheduler = h.scheduler.clone();
        let context = h.context();
        let lane = lane.clone();
        async move {
            scheduler
                .submit_task(
                    analysis_requirement(id, RequirementPriority::Low),
                    context,
                    Some(lane.as_str()),
                    SubmitOptions {
                        priority: Some(priority),
                        ..Default::default()
                    },
                )
                .await
                .unwrap()
        }
    };

    let blocker = submit("blocker", 1).await;
    let low = submit("low", 1).await;
    let first_high = submit("high-a", 5).await;
    let second_high = submit("high-b", 5).await;

    let mut rx = h.scheduler.events().subscribe();
    analyzer.release(4);
    h.wait_idle().await;

    let dispatched: Vec<String> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::TaskDispatched { task_id, .. } => Some(task_id),
            _ => None,
        })
        .collect();
    assert_eq!(dispatched, vec![first_high, second_high, low]);
    assert!(!dispatched.contains(&blocker));
}

#[tokio::test]
async fn test_scheduled_task_waits_for_its_time() {
    let analyzer = Arc::new(GatedAnalyzer::new());
    analyzer.release(1);
    let h = Harness::new(EngineConfig::default(), analyzer.clone()).await;

    let started = Instant::now();
    h.scheduler
        .submit_task(
            analysis_requirement("req-later", RequirementPriority::Medium),
            h.context(),
            None,
            SubmitOptions {
                scheduled_for: Some(Utc::now() + chrono::Duration::milliseconds(200)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let status = h.scheduler.get_queue_status("medium").await.unwrap();
    assert_eq!(status.active_executions, 0);
    assert_eq!(status.queued_tasks, 1);

    h.wait_idle().await;
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(h.scheduler.get_scheduler_stats().await.completed, 1);
}

#[tokio::test]
async fn test_cancel_queued_task_removes_it() {
    let analyzer = Arc::new(GatedAnalyzer::new());
    let h = Harness::new(EngineConfig::default(), analyzer.clone()).await;

    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(
            h.scheduler
                .submit_task(
                    analysis_requirement(&format!("req-{i}"), RequirementPriority::Critical),
                    h.context(),
                    None,
                    SubmitOptions::default(),
                )
                .await
                .unwrap(),
        );
    }

    let outcome = h.scheduler.cancel_task(&ids[2]).await.unwrap();
    assert_eq!(outcome, CancelOutcome::RemovedFromQueue);
    assert_eq!(
        h.scheduler.get_queue_status("critical").await.unwrap().queued_tasks,
        0
    );

    analyzer.release(2);
    h.wait_idle().await;
    let stats = h.scheduler.get_scheduler_stats().await;
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(analyzer.started(), 2);
    assert!(matches!(
        h.scheduler.cancel_task(&ids[2]).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_cancel_running_task_stops_at_step_boundary() {
    let analyzer = Arc::new(GatedAnalyzer::new());
    let h = Harness::new(EngineConfig::default(), analyzer.clone()).await;
    let mut rx = h.scheduler.events().subscribe();

    let task_id = h
        .scheduler
        .submit_task(
            analysis_requirement("req-running", RequirementPriority::Low),
            h.context(),
            None,
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    assert!(wait_until(WAIT, || async { analyzer.started() == 1 }).await);

    let outcome = h.scheduler.cancel_task(&task_id).await.unwrap();
    assert_eq!(outcome, CancelOutcome::CancellationRequested);

    analyzer.release(1);
    let events = collect_until(&mut rx, WAIT, |e| {
        matches!(e, EngineEvent::TaskCancelled { task_id: id } if *id == task_id)
    })
    .await;
    h.wait_idle().await;

    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::ExecutionFinished {
            status: ExecutionStatus::Cancelled,
            ..
        }
    )));
    assert!(!events.iter().any(|e| matches!(
        e,
        EngineEvent::StepStarted { step_id, .. } if step_id == step_ids::FINAL_VALIDATION
    )));
    // Settled executions are pruned from the executor.
    assert!(h.scheduler.executor().list_executions().await.is_empty());

    let stats = h.scheduler.get_scheduler_stats().await;
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.completed, 0);
    assert!(h.recovery.reports().is_empty());
}

#[tokio::test]
async fn test_cancelled_task_that_fails_is_not_retried() {
    let analyzer = Arc::new(GatedAnalyzer::failing_on_release());
    let h = Harness::new(fast_retry_config(2), analyzer.clone()).await;
    let mut rx = h.scheduler.events().subscribe();

    let task_id = h
        .scheduler
        .submit_task(
            analysis_requirement("req-cancel-fail", RequirementPriority::High),
            h.context(),
            None,
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    assert!(wait_until(WAIT, || async { analyzer.started() == 1 }).await);
    assert_eq!(
        h.scheduler.cancel_task(&task_id).await.unwrap(),
        CancelOutcome::CancellationRequested
    );

    analyzer.release(3);
    let events = collect_until(&mut rx, WAIT, |e| {
        matches!(e, EngineEvent::TaskCancelled { task_id: id } if *id == task_id)
    })
    .await;
    h.wait_idle().await;

    assert_eq!(analyzer.started(), 1);
    assert!(!events
        .iter()
        .any(|e| matches!(e, EngineEvent::RetryScheduled { .. } | EngineEvent::TaskFailed { .. })));

    let stats = h.scheduler.get_scheduler_stats().await;
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.retried, 0);
    assert_eq!(stats.failed, 0);
    // The step failure itself is still reported; the task failure is not.
    assert_eq!(h.recovery.count(STEP_EXECUTION_FAILED, Severity::High), 1);
    assert_eq!(h.recovery.count(TASK_FAILED, Severity::High), 0);
}

#[tokio::test]
async fn test_cancel_during_final_step_ends_cancelled() {
    let final_step = Arc::new(GatedStep::new());
    let h = Harness::with_custom(
        EngineConfig::default(),
        Arc::new(FailingAnalyzer::failing(0)),
        vec![("final_validation", final_step.clone() as Arc<dyn StepHandler>)],
    )
    .await;
    let mut rx = h.scheduler.events().subscribe();

    let task_id = h
        .scheduler
        .submit_task(
            analysis_requirement("req-last-step", RequirementPriority::Medium),
            h.context(),
            None,
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    assert!(wait_until(WAIT, || async { final_step.started() == 1 }).await);
    assert_eq!(
        h.scheduler.cancel_task(&task_id).await.unwrap(),
        CancelOutcome::CancellationRequested
    );

    final_step.release(1);
    let events = collect_until(&mut rx, WAIT, |e| {
        matches!(e, EngineEvent::TaskCancelled { task_id: id } if *id == task_id)
    })
    .await;
    h.wait_idle().await;

    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::ExecutionFinished {
            status: ExecutionStatus::Cancelled,
            ..
        }
    )));
    assert!(!events
        .iter()
        .any(|e| matches!(e, EngineEvent::TaskCompleted { .. })));
    let stats = h.scheduler.get_scheduler_stats().await;
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.completed, 0);
}

#[tokio::test]
async fn test_failed_task_moves_straight_to_pending_retry() {
    let analyzer = Arc::new(GatedAnalyzer::failing_on_release());
    let config = EngineConfig {
        retry_delay_ms: 60_000,
        default_max_retries: 1,
        ..Default::default()
    };
    let h = Harness::new(config, analyzer.clone()).await;

    let task_id = h
        .scheduler
        .submit_task(
            analysis_requirement("req-handoff", RequirementPriority::Low),
            h.context(),
            None,
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    assert!(wait_until(WAIT, || async { analyzer.started() == 1 }).await);

    analyzer.release(1);
    // The task is always either running or waiting to retry, never neither.
    let deadline = Instant::now() + Duration::from_millis(300);
    while Instant::now() < deadline {
        assert!(!h.scheduler.is_idle().await);
        if h.scheduler.get_scheduler_stats().await.pending_retries == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(h.scheduler.get_scheduler_stats().await.pending_retries, 1);

    assert_eq!(
        h.scheduler.cancel_task(&task_id).await.unwrap(),
        CancelOutcome::RetryCancelled
    );
    assert!(h.scheduler.is_idle().await);
    assert_eq!(h.scheduler.get_scheduler_stats().await.failed, 0);
}

#[tokio::test]
async fn test_retries_exhaust_then_fail_once() {
    let analyzer = Arc::new(FailingAnalyzer::always());
    let h = Harness::new(fast_retry_config(2), analyzer.clone()).await;
    let mut rx = h.scheduler.events().subscribe();

    let task_id = h
        .scheduler
        .submit_task(
            analysis_requirement("req-doomed", RequirementPriority::High),
            h.context(),
            None,
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    h.wait_idle().await;
    // The final failure is announced after the task leaves the running set.
    assert!(wait_until(WAIT, || async { h.recovery.count(TASK_FAILED, Severity::High) == 1 }).await);

    let events: Vec<EngineEvent> = drain(&mut rx)
        .into_iter()
        .filter(|e| e.task_id() == Some(task_id.as_str()))
        .collect();
    let retries: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::RetryScheduled { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(retries, vec![1, 2]);
    let failures = events
        .iter()
        .filter(|e| matches!(e, EngineEvent::TaskFailed { .. }))
        .count();
    assert_eq!(failures, 1);

    assert_eq!(analyzer.calls(), 3);
    assert_eq!(h.recovery.count(STEP_EXECUTION_FAILED, Severity::High), 3);
    assert_eq!(h.recovery.count(TASK_FAILED, Severity::High), 1);

    let stats = h.scheduler.get_scheduler_stats().await;
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.retried, 2);
    assert_eq!(stats.completed, 0);
}

#[tokio::test]
async fn test_flaky_task_succeeds_on_retry() {
    let analyzer = Arc::new(FailingAnalyzer::failing(1));
    let h = Harness::new(fast_retry_config(3), analyzer.clone()).await;

    h.scheduler
        .submit_task(
            analysis_requirement("req-flaky", RequirementPriority::Medium),
            h.context(),
            None,
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    h.wait_idle().await;

    let stats = h.scheduler.get_scheduler_stats().await;
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.retried, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(analyzer.calls(), 2);
    assert_eq!(h.recovery.count(STEP_EXECUTION_FAILED, Severity::High), 1);
    assert_eq!(h.recovery.count(TASK_FAILED, Severity::High), 0);
}

#[tokio::test]
async fn test_cancel_pending_retry() {
    let analyzer = Arc::new(FailingAnalyzer::always());
    let config = EngineConfig {
        retry_delay_ms: 60_000,
        default_max_retries: 1,
        ..Default::default()
    };
    let h = Harness::new(config, analyzer.clone()).await;

    let task_id = h
        .scheduler
        .submit_task(
            analysis_requirement("req-waiting", RequirementPriority::Low),
            h.context(),
            None,
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    assert!(
        wait_until(WAIT, || async {
            h.scheduler.get_scheduler_stats().await.pending_retries == 1
        })
        .await
    );

    let outcome = h.scheduler.cancel_task(&task_id).await.unwrap();
    assert_eq!(outcome, CancelOutcome::RetryCancelled);
    assert!(h.scheduler.is_idle().await);

    let stats = h.scheduler.get_scheduler_stats().await;
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(analyzer.calls(), 1);
    assert_eq!(h.recovery.count(TASK_FAILED, Severity::High), 0);
}

#[tokio::test]
async fn test_submit_after_shutdown_is_rejected() {
    let h = Harness::new(EngineConfig::default(), Arc::new(GatedAnalyzer::new())).await;
    h.scheduler.shutdown().await;
    let result = h
        .scheduler
        .submit_task(
            analysis_requirement("req-late", RequirementPriority::Low),
            h.context(),
            None,
            SubmitOptions::default(),
        )
        .await;
    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[tokio::test]
async fn test_invalid_config_is_reported_as_critical() {
    let recovery = Arc::new(RecordingRecovery::default());
    let capabilities = Capabilities::local_defaults().with_recovery(recovery.clone());
    let config = EngineConfig {
        queues: vec![
            QueueConfig::new("Fast", RequirementPriority::High, 2),
            QueueConfig::new("fast", RequirementPriority::Low, 2),
        ],
        ..Default::default()
    };

    let result = Scheduler::new(
        config,
        Planner::new(),
        Executor::new(&capabilities, EventBus::default()),
        recovery.clone(),
    )
    .await;
    assert!(matches!(result, Err(AppError::Config(_))));
    assert_eq!(recovery.count(SCHEDULER_INIT_FAILED, Severity::Critical), 1);
}
