//! Executor Integration Tests
//!
//! Plans from the planner executed over local and in-test capabilities:
//! - steps run strictly in plan order
//! - the first failure ends the execution and is reported once at high severity
//! - cancellation lands on a step boundary

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use automation_hub::services::engine::planner::step_ids;
use automation_hub::{
    AppError, AppResult, Capabilities, Context, EngineEvent, Environment, EventBus,
    ExecutionStatus, Executor, HandlerRegistry, PlanStep, Planner, Requirement,
    RequirementPriority, StepHandler, StepStatus, STEP_EXECUTION_FAILED,
};
use automation_hub_core::Severity;

use crate::support::{analysis_requirement, drain, wait_until, GatedAnalyzer, RecordingRecovery};

struct Explode;

#[async_trait]
impl StepHandler for Explode {
    async fn handle(&self, step: &PlanStep, _context: &Context) -> AppResult<Value> {
        Err(AppError::internal(format!("{} exploded", step.id)))
    }
}

fn executor_with(recovery: Arc<RecordingRecovery>, capabilities: Capabilities) -> Executor {
    let capabilities = capabilities.with_recovery(recovery);
    let mut handlers = HandlerRegistry::with_capabilities(&capabilities);
    handlers.register_custom("explode", Arc::new(Explode));
    Executor::with_handlers(handlers, &capabilities, EventBus::default())
}

fn chained_requirement(b_handler: &str) -> Requirement {
    serde_json::from_value(json!({
        "id": "req-chain",
        "title": "Chain",
        "description": "A then B then C",
        "type": "analysis",
        "priority": "medium",
        "estimatedDuration": 10,
        "constraints": {
            "steps": [
                {"id": "C", "title": "C", "kind": {"type": "custom", "handler": "c"}, "dependencies": ["A", "B"]},
                {"id": "B", "title": "B", "kind": {"type": "custom", "handler": b_handler}, "dependencies": ["A"]},
                {"id": "A", "title": "A", "kind": {"type": "custom", "handler": "a"}}
            ]
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_steps_execute_in_dependency_order() {
    let project = tempfile::tempdir().unwrap();
    let recovery = Arc::new(RecordingRecovery::default());
    let executor = executor_with(recovery.clone(), Capabilities::local_defaults());
    let context = Context::new(project.path());

    let plan = Planner::new()
        .create_execution_plan(&chained_requirement("b"), &context)
        .unwrap();
    let execution = executor.execute_plan(&plan, &context).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    let executed: Vec<&str> = execution
        .results
        .iter()
        .map(|r| r.step_id.as_str())
        .filter(|id| ["A", "B", "C"].contains(id))
        .collect();
    assert_eq!(executed, vec!["A", "B", "C"]);
    assert_eq!(execution.results.len(), plan.steps.len());
    assert_eq!(execution.current_step, plan.steps.len());
    assert!(recovery.reports().is_empty());
}

#[tokio::test]
async fn test_failing_handler_fails_fast() {
    let project = tempfile::tempdir().unwrap();
    let recovery = Arc::new(RecordingRecovery::default());
    let executor = executor_with(recovery.clone(), Capabilities::local_defaults());
    let context = Context::new(project.path());

    let plan = Planner::new()
        .create_execution_plan(&chained_requirement("explode"), &context)
        .unwrap();
    let execution = executor.execute_plan(&plan, &context).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    let failed: Vec<_> = execution
        .results
        .iter()
        .filter(|r| r.status == StepStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].step_id, "B");
    assert_eq!(execution.results.last().unwrap().step_id, "B");
    assert!(execution.results.iter().all(|r| r.step_id != "C"));
    assert!(execution
        .results
        .iter()
        .all(|r| r.step_id != step_ids::FINAL_VALIDATION));

    let error = execution.failure().unwrap();
    assert_eq!(error.code, STEP_EXECUTION_FAILED);
    assert!(error.message.contains("B exploded"));
    assert_eq!(recovery.count(STEP_EXECUTION_FAILED, Severity::High), 1);
}

#[tokio::test]
async fn test_production_rejects_unsafe_steps() {
    let project = tempfile::tempdir().unwrap();
    let recovery = Arc::new(RecordingRecovery::default());
    let executor = executor_with(recovery.clone(), Capabilities::local_defaults());
    let context = Context::new(project.path()).with_environment(Environment::Production);

    let requirement = analysis_requirement("req-prod", RequirementPriority::Low);
    let plan = Planner::new()
        .create_execution_plan(&requirement, &context)
        .unwrap();
    let execution = executor.execute_plan(&plan, &context).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.results.len(), 1);
    assert_eq!(execution.failure().unwrap().details["cause"], "production_safety");
}

#[tokio::test]
async fn test_production_safe_plan_runs() {
    let project = tempfile::tempdir().unwrap();
    let recovery = Arc::new(RecordingRecovery::default());
    let executor = executor_with(recovery, Capabilities::local_defaults());
    let context = Context::new(project.path()).with_environment(Environment::Production);

    let requirement = analysis_requirement("req-prod", RequirementPriority::Low)
        .with_constraint("productionSafe", json!(true));
    let plan = Planner::new()
        .create_execution_plan(&requirement, &context)
        .unwrap();
    let execution = executor.execute_plan(&plan, &context).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn test_cancel_takes_effect_after_current_step() {
    let project = tempfile::tempdir().unwrap();
    let analyzer = Arc::new(GatedAnalyzer::new());
    let recovery = Arc::new(RecordingRecovery::default());
    let executor = executor_with(
        recovery,
        Capabilities::local_defaults().with_code_analysis(analyzer.clone()),
    );
    let context = Context::new(project.path());

    let requirement = analysis_requirement("req-cancel", RequirementPriority::Low);
    let plan = Planner::new()
        .create_execution_plan(&requirement, &context)
        .unwrap();
    let registered = executor.register(&plan).await;

    let run = {
        let executor = executor.clone();
        let id = registered.id.clone();
        let plan = plan.clone();
        let context = context.clone();
        tokio::spawn(async move { executor.run(&id, &plan, &context).await })
    };

    assert!(wait_until(Duration::from_secs(5), || async { analyzer.started() == 1 }).await);
    assert!(executor.cancel_execution(&registered.id).await.unwrap());

    // The in-flight step is not interrupted.
    let mid = executor.get_execution(&registered.id).await.unwrap();
    assert_eq!(mid.status, ExecutionStatus::Running);

    analyzer.release(1);
    let execution = run.await.unwrap().unwrap();
    assert_eq!(execution.status, ExecutionStatus::Cancelled);
    let ids: Vec<&str> = execution.results.iter().map(|r| r.step_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![step_ids::VALIDATE_REQUIREMENTS, step_ids::ANALYZE_CODE_STRUCTURE]
    );
    assert!(execution.results.iter().all(|r| r.status == StepStatus::Completed));
    assert!(execution.end_time.is_some());
}

#[tokio::test]
async fn test_progress_events_follow_the_run() {
    let project = tempfile::tempdir().unwrap();
    let recovery = Arc::new(RecordingRecovery::default());
    let executor = executor_with(recovery, Capabilities::local_defaults());
    let mut rx = executor.events().subscribe();
    let context = Context::new(project.path());

    let requirement = analysis_requirement("req-events", RequirementPriority::Low);
    let plan = Planner::new()
        .create_execution_plan(&requirement, &context)
        .unwrap();
    executor.execute_plan(&plan, &context).await.unwrap();

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(EngineEvent::ExecutionStarted { total_steps: 3, .. })));
    assert!(matches!(
        events.last(),
        Some(EngineEvent::ExecutionFinished {
            status: ExecutionStatus::Completed,
            ..
        })
    ));
    let completed = events
        .iter()
        .filter(|e| matches!(e, EngineEvent::StepCompleted { .. }))
        .count();
    assert_eq!(completed, 3);
}
