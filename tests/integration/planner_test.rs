//! Planner Integration Tests
//!
//! Plans built from JSON requirements the way callers submit them:
//! - every plan is a topological order of its declared edges
//! - authored steps are reordered regardless of authoring order
//! - cycles abort planning with no partial plan

use std::collections::HashMap;

use serde_json::json;

use automation_hub::services::engine::planner::step_ids;
use automation_hub::{
    AppError, Context, Environment, ExecutionPlan, Planner, Requirement, RequirementPriority,
    RiskLevel, StepType,
};

fn from_json(value: serde_json::Value) -> Requirement {
    serde_json::from_value(value).unwrap()
}

fn assert_topological(plan: &ExecutionPlan) {
    let position: HashMap<&str, usize> = plan
        .steps
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();
    for step in &plan.steps {
        for dep in &step.dependencies {
            assert!(
                position[dep.as_str()] < position[step.id.as_str()],
                "{} runs before its dependency {}",
                step.id,
                dep
            );
        }
    }
    for (i, step) in plan.steps.iter().enumerate() {
        assert_eq!(step.order, i + 1);
    }
}

#[test]
fn test_every_requirement_type_yields_a_topological_plan() {
    let planner = Planner::new();
    for kind in ["development", "testing", "deployment", "analysis"] {
        let req = from_json(json!({
            "id": format!("req-{kind}"),
            "title": "Work",
            "description": "Do the work",
            "type": kind,
            "priority": "medium",
            "estimatedDuration": 30
        }));
        let plan = planner
            .create_execution_plan(&req, &Context::new("/tmp"))
            .unwrap();
        assert_topological(&plan);
        assert_eq!(plan.steps[0].id, step_ids::VALIDATE_REQUIREMENTS);
        assert_eq!(plan.steps.last().unwrap().id, step_ids::FINAL_VALIDATION);
        assert_eq!(plan.requirement_id, req.id);
    }
}

#[test]
fn test_authored_steps_resolve_to_a_b_c() {
    let req = from_json(json!({
        "id": "req-abc",
        "title": "ABC",
        "description": "Three chained steps",
        "type": "analysis",
        "priority": "low",
        "estimatedDuration": 10,
        "constraints": {
            "steps": [
                {"id": "C", "title": "C", "kind": {"type": "custom", "handler": "c"}, "dependencies": ["A", "B"]},
                {"id": "A", "title": "A", "kind": {"type": "custom", "handler": "a"}},
                {"id": "B", "title": "B", "kind": {"type": "custom", "handler": "b"}, "dependencies": ["A"]}
            ]
        }
    }));
    let plan = Planner::new()
        .create_execution_plan(&req, &Context::new("/tmp"))
        .unwrap();
    assert_topological(&plan);

    let authored: Vec<&str> = plan
        .step_ids()
        .into_iter()
        .filter(|id| ["A", "B", "C"].contains(id))
        .collect();
    assert_eq!(authored, vec!["A", "B", "C"]);

    let final_step = plan.step(step_ids::FINAL_VALIDATION).unwrap();
    assert!(final_step.dependencies.contains(&"C".to_string()));
}

#[test]
fn test_cycle_never_produces_a_plan() {
    let req = from_json(json!({
        "id": "req-cycle",
        "title": "Cycle",
        "description": "Steps that wait on each other",
        "type": "analysis",
        "priority": "low",
        "estimatedDuration": 10,
        "constraints": {
            "steps": [
                {"id": "A", "title": "A", "kind": {"type": "custom", "handler": "a"}, "dependencies": ["B"]},
                {"id": "B", "title": "B", "kind": {"type": "custom", "handler": "b"}, "dependencies": ["A"]}
            ]
        }
    }));
    let err = Planner::new()
        .create_execution_plan(&req, &Context::new("/tmp"))
        .unwrap_err();
    assert!(matches!(err, AppError::CircularDependency(_)));
}

#[test]
fn test_dangling_dependency_is_not_found() {
    let req = from_json(json!({
        "id": "req-dangling",
        "title": "Dangling",
        "description": "Depends on a step nobody defined",
        "type": "analysis",
        "priority": "low",
        "estimatedDuration": 10,
        "constraints": {
            "steps": [
                {"id": "A", "title": "A", "kind": {"type": "custom", "handler": "a"}, "dependencies": ["ghost"]}
            ]
        }
    }));
    assert!(matches!(
        Planner::new().create_execution_plan(&req, &Context::new("/tmp")),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn test_critical_production_deployment_is_high_risk() {
    let req = from_json(json!({
        "id": "req-deploy",
        "title": "Ship it",
        "description": "Deploy to production",
        "type": "deployment",
        "priority": "critical",
        "estimatedDuration": 45,
        "constraints": {"deployEndpoint": "https://deploy.example.test/hooks", "productionSafe": true}
    }));
    let ctx = Context::new("/tmp").with_environment(Environment::Production);
    let plan = Planner::new().create_execution_plan(&req, &ctx).unwrap();

    assert_eq!(plan.risk_level, RiskLevel::High);
    assert!(plan.has_step_type(StepType::ApiCall));
    assert!(plan
        .fallback_strategies
        .iter()
        .any(|s| s.contains("Rollback")));
    assert!(plan.steps.iter().all(|s| s.validation_rules.production_safe));
}

#[test]
fn test_testing_plan_serializes_typed_steps() {
    let req = from_json(json!({
        "id": "req-test",
        "title": "Smoke test",
        "description": "Screenshot the landing page",
        "type": "testing",
        "priority": "high",
        "estimatedDuration": 20,
        "constraints": {"testUrl": "http://localhost:8080", "fullPage": true}
    }));
    let plan = Planner::new()
        .create_execution_plan(&req, &Context::new("/tmp"))
        .unwrap();
    let value = serde_json::to_value(&plan).unwrap();
    let suite = value["steps"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == step_ids::RUN_TEST_SUITE)
        .unwrap();
    assert_eq!(suite["kind"]["type"], "browser_testing");
    assert_eq!(suite["kind"]["url"], "http://localhost:8080");
    assert_eq!(suite["kind"]["mode"]["action"], "screenshot");
    assert_eq!(suite["kind"]["mode"]["fullPage"], true);
    assert_eq!(value["riskLevel"], "low");
}

#[test]
fn test_missing_required_field_fails_before_steps() {
    let req = Requirement::new(
        "req-1",
        "",
        "No title",
        automation_hub::RequirementType::Analysis,
        RequirementPriority::Low,
        10,
    );
    assert!(matches!(
        Planner::new().create_execution_plan(&req, &Context::new("/tmp")),
        Err(AppError::MissingField(_))
    ));
}
