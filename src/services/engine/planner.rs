//! Execution Planner
//!
//! Turns a `Requirement` + `Context` into an `ExecutionPlan`:
//! a leading requirements check, type-specific steps, any authored steps
//! supplied through the `steps` constraint, and a trailing final validation
//! that depends on everything before it. Steps are then put in dependency
//! order with a depth-first traversal; a cycle aborts planning.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    BrowserMode, Context, Environment, ExecutionPlan, FileOp, PlanStep, Requirement,
    RequirementPriority, RequirementType, RiskLevel, StepKind, StepType, ValidationRules,
};
use crate::utils::error::{AppError, AppResult};

/// Stable ids of generated steps.
pub mod step_ids {
    pub const VALIDATE_REQUIREMENTS: &str = "validate-requirements";
    pub const ANALYZE_CODE_IMPACT: &str = "analyze-code-impact";
    pub const APPLY_FILE_OPERATIONS: &str = "apply-file-operations";
    pub const VALIDATE_TEST_CASES: &str = "validate-test-cases";
    pub const RUN_TEST_SUITE: &str = "run-test-suite";
    pub const VALIDATE_ENVIRONMENT: &str = "validate-environment";
    pub const EXECUTE_DEPLOYMENT: &str = "execute-deployment";
    pub const ANALYZE_CODE_STRUCTURE: &str = "analyze-code-structure";
    pub const FINAL_VALIDATION: &str = "final-validation";
}

/// Default browser target when a testing requirement names none.
pub const DEFAULT_TEST_URL: &str = "http://localhost:3000";

/// Duration assumed for authored steps that give none (minutes).
const DEFAULT_AUTHORED_STEP_MINUTES: u32 = 5;

/// A step authored in the requirement's `steps` constraint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepDefinition {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    kind: StepKind,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    estimated_duration: Option<u32>,
    #[serde(default)]
    validation_rules: ValidationRules,
}

/// Builds execution plans. Stateless; one instance can serve every dispatch.
#[derive(Debug, Clone, Default)]
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    /// Build a plan for `requirement` under `context`.
    ///
    /// Fails before generating any step if the requirement is malformed, and
    /// during ordering if the step graph has a cycle or a dangling dependency.
    pub fn create_execution_plan(
        &self,
        requirement: &Requirement,
        context: &Context,
    ) -> AppResult<ExecutionPlan> {
        self.validate_requirement(requirement)?;

        let generated = generate_steps(requirement, context)?;
        let steps = order_steps(&generated)?;

        let risk_level = assess_risk(requirement, context, steps.len());
        let fallback_strategies = fallback_strategies(requirement, &steps);
        let estimated_total_duration = steps.iter().map(|s| s.estimated_duration).sum();

        let now = Utc::now();
        let plan = ExecutionPlan {
            id: format!("plan-{}", Uuid::new_v4()),
            requirement_id: requirement.id.clone(),
            steps,
            estimated_total_duration,
            dependencies: requirement.dependencies.clone(),
            risk_level,
            fallback_strategies,
            created_at: now,
            updated_at: now,
        };

        info!(
            plan_id = %plan.id,
            requirement_id = %requirement.id,
            steps = plan.steps.len(),
            risk = %plan.risk_level,
            "Execution plan created"
        );
        Ok(plan)
    }

    /// Reject requirements with blank identity fields or no duration estimate.
    pub fn validate_requirement(&self, requirement: &Requirement) -> AppResult<()> {
        if requirement.id.trim().is_empty() {
            return Err(AppError::missing_field("requirement.id"));
        }
        if requirement.title.trim().is_empty() {
            return Err(AppError::missing_field("requirement.title"));
        }
        if requirement.description.trim().is_empty() {
            return Err(AppError::missing_field("requirement.description"));
        }
        if requirement.estimated_duration == 0 {
            return Err(AppError::validation(format!(
                "Requirement {} must have a positive estimatedDuration",
                requirement.id
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Step generation
// ============================================================================

fn generate_steps(requirement: &Requirement, context: &Context) -> AppResult<Vec<PlanStep>> {
    let production_safe = requirement.constraint_flag("productionSafe")
        || context
            .constraints
            .get("productionSafe")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

    let mut steps = vec![validate_requirements_step(requirement)];
    steps.extend(type_specific_steps(requirement, context)?);
    steps.extend(authored_steps(requirement)?);

    let prior: Vec<String> = steps.iter().map(|s| s.id.clone()).collect();
    steps.push(
        PlanStep::new(
            step_ids::FINAL_VALIDATION,
            "Final validation",
            "Confirm every prior step produced its result",
            StepKind::Custom {
                handler: "final_validation".to_string(),
                parameters: json!({
                    "requirementId": requirement.id,
                    "stepCount": prior.len(),
                }),
            },
            5,
        )
        .depends_on(prior),
    );

    for step in &mut steps {
        step.validation_rules.production_safe |= production_safe;
    }

    debug!(
        requirement_id = %requirement.id,
        count = steps.len(),
        "Generated plan steps"
    );
    Ok(steps)
}

fn validate_requirements_step(requirement: &Requirement) -> PlanStep {
    PlanStep::new(
        step_ids::VALIDATE_REQUIREMENTS,
        "Validate requirements",
        format!("Check that requirement '{}' is complete", requirement.title),
        StepKind::Custom {
            handler: "validate_requirements".to_string(),
            parameters: json!({
                "requirementId": requirement.id,
                "title": requirement.title,
                "type": requirement.requirement_type,
                "priority": requirement.priority,
                "resources": requirement.resources,
            }),
        },
        2,
    )
    .with_rules(ValidationRules {
        required_fields: vec!["requirementId".to_string(), "title".to_string()],
        ..Default::default()
    })
}

fn project_rules() -> ValidationRules {
    ValidationRules {
        project_path_exists: true,
        ..Default::default()
    }
}

fn type_specific_steps(requirement: &Requirement, context: &Context) -> AppResult<Vec<PlanStep>> {
    use step_ids::*;

    let steps = match requirement.requirement_type {
        RequirementType::Development => {
            let operations = match requirement.constraints.get("fileOperations") {
                Some(raw) => serde_json::from_value::<Vec<FileOp>>(raw.clone()).map_err(|e| {
                    AppError::validation(format!("Invalid fileOperations constraint: {e}"))
                })?,
                None => vec![FileOp::List {
                    path: PathBuf::from("."),
                }],
            };
            vec![
                PlanStep::new(
                    ANALYZE_CODE_IMPACT,
                    "Analyze code impact",
                    "Inspect the project structure affected by the change",
                    StepKind::CodeAnalysis {
                        project_path: context.project_path.clone(),
                    },
                    10,
                )
                .depends_on([VALIDATE_REQUIREMENTS])
                .with_rules(project_rules()),
                PlanStep::new(
                    APPLY_FILE_OPERATIONS,
                    "Apply file operations",
                    "Perform the requested file changes",
                    StepKind::FileOperation { operations },
                    15,
                )
                .depends_on([ANALYZE_CODE_IMPACT])
                .with_rules(ValidationRules {
                    required_fields: vec!["operations".to_string()],
                    project_path_exists: true,
                    ..Default::default()
                }),
            ]
        }
        RequirementType::Testing => {
            let url = requirement
                .constraint_str("testUrl")
                .unwrap_or(DEFAULT_TEST_URL)
                .to_string();
            let mode = match requirement.constraint_str("testScript") {
                Some(script) => BrowserMode::Script {
                    script: script.to_string(),
                },
                None => BrowserMode::Screenshot {
                    full_page: requirement.constraint_flag("fullPage"),
                },
            };
            vec![
                PlanStep::new(
                    VALIDATE_TEST_CASES,
                    "Validate test cases",
                    "Check the test target and mode are well-formed",
                    StepKind::Custom {
                        handler: "validate_test_cases".to_string(),
                        parameters: json!({ "testUrl": url, "mode": mode }),
                    },
                    5,
                )
                .depends_on([VALIDATE_REQUIREMENTS])
                .with_rules(ValidationRules {
                    required_fields: vec!["testUrl".to_string()],
                    ..Default::default()
                }),
                PlanStep::new(
                    RUN_TEST_SUITE,
                    "Run test suite",
                    "Drive a browser session against the test target",
                    StepKind::BrowserTesting { url, mode },
                    20,
                )
                .depends_on([VALIDATE_TEST_CASES])
                .with_rules(ValidationRules {
                    required_fields: vec!["url".to_string()],
                    ..Default::default()
                }),
            ]
        }
        RequirementType::Deployment => {
            let deploy_kind = match requirement.constraint_str("deployEndpoint") {
                Some(endpoint) => StepKind::ApiCall {
                    method: requirement
                        .constraint_str("deployMethod")
                        .unwrap_or("POST")
                        .to_uppercase(),
                    url: endpoint.to_string(),
                    headers: HashMap::from([(
                        "Content-Type".to_string(),
                        "application/json".to_string(),
                    )]),
                    body: Some(json!({
                        "requirementId": requirement.id,
                        "branch": context.current_branch,
                        "environment": context.environment,
                    })),
                },
                None => StepKind::Custom {
                    handler: "deploy".to_string(),
                    parameters: json!({
                        "requirementId": requirement.id,
                        "branch": context.current_branch,
                        "environment": context.environment,
                    }),
                },
            };
            vec![
                PlanStep::new(
                    VALIDATE_ENVIRONMENT,
                    "Validate environment",
                    format!("Check the {} environment is ready", context.environment),
                    StepKind::Custom {
                        handler: "validate_environment".to_string(),
                        parameters: json!({
                            "environment": context.environment,
                            "branch": context.current_branch,
                        }),
                    },
                    5,
                )
                .depends_on([VALIDATE_REQUIREMENTS])
                .with_rules(ValidationRules {
                    required_fields: vec!["environment".to_string(), "branch".to_string()],
                    project_path_exists: true,
                    ..Default::default()
                }),
                PlanStep::new(
                    EXECUTE_DEPLOYMENT,
                    "Execute deployment",
                    "Roll the change out",
                    deploy_kind,
                    30,
                )
                .depends_on([VALIDATE_ENVIRONMENT]),
            ]
        }
        RequirementType::Analysis => vec![PlanStep::new(
            ANALYZE_CODE_STRUCTURE,
            "Analyze code structure",
            "Summarize the project layout",
            StepKind::CodeAnalysis {
                project_path: context.project_path.clone(),
            },
            15,
        )
        .depends_on([VALIDATE_REQUIREMENTS])
        .with_rules(project_rules())],
    };
    Ok(steps)
}

fn authored_steps(requirement: &Requirement) -> AppResult<Vec<PlanStep>> {
    let Some(raw) = requirement.constraints.get("steps") else {
        return Ok(Vec::new());
    };
    let definitions: Vec<StepDefinition> = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::validation(format!("Invalid steps constraint: {e}")))?;

    Ok(definitions
        .into_iter()
        .map(|def| PlanStep {
            id: def.id,
            title: def.title,
            description: def.description,
            kind: def.kind,
            order: 0,
            estimated_duration: def
                .estimated_duration
                .unwrap_or(DEFAULT_AUTHORED_STEP_MINUTES),
            dependencies: def.dependencies,
            validation_rules: def.validation_rules,
        })
        .collect())
}

// ============================================================================
// Ordering
// ============================================================================

/// Put `steps` into dependency order.
///
/// Depth-first: each step's dependencies are emitted before the step itself,
/// visiting steps in their given order. Re-entering a step that is still on the
/// DFS stack is a cycle. `order` is renumbered from 1.
pub fn order_steps(steps: &[PlanStep]) -> AppResult<Vec<PlanStep>> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        if index.insert(step.id.as_str(), i).is_some() {
            return Err(AppError::validation(format!(
                "Duplicate step id: {}",
                step.id
            )));
        }
    }

    for step in steps {
        for dep in &step.dependencies {
            if !index.contains_key(dep.as_str()) {
                return Err(AppError::not_found(format!(
                    "Step '{}' depends on unknown step '{}'",
                    step.id, dep
                )));
            }
        }
    }

    let mut visited: HashSet<usize> = HashSet::with_capacity(steps.len());
    let mut visiting: Vec<usize> = Vec::new();
    let mut ordered: Vec<usize> = Vec::with_capacity(steps.len());

    for i in 0..steps.len() {
        visit(i, steps, &index, &mut visited, &mut visiting, &mut ordered)?;
    }

    Ok(ordered
        .into_iter()
        .enumerate()
        .map(|(pos, i)| {
            let mut step = steps[i].clone();
            step.order = pos + 1;
            step
        })
        .collect())
}

fn visit(
    i: usize,
    steps: &[PlanStep],
    index: &HashMap<&str, usize>,
    visited: &mut HashSet<usize>,
    visiting: &mut Vec<usize>,
    ordered: &mut Vec<usize>,
) -> AppResult<()> {
    if visited.contains(&i) {
        return Ok(());
    }
    if let Some(pos) = visiting.iter().position(|&v| v == i) {
        let mut cycle: Vec<&str> = visiting[pos..]
            .iter()
            .map(|&v| steps[v].id.as_str())
            .collect();
        cycle.push(steps[i].id.as_str());
        return Err(AppError::CircularDependency(cycle.join(" -> ")));
    }

    visiting.push(i);
    for dep in &steps[i].dependencies {
        // Dangling ids were rejected above.
        if let Some(&d) = index.get(dep.as_str()) {
            visit(d, steps, index, visited, visiting, ordered)?;
        }
    }
    visiting.pop();

    visited.insert(i);
    ordered.push(i);
    Ok(())
}

// ============================================================================
// Risk & fallbacks
// ============================================================================

/// Additive risk score: priority weight, +2 for more than 10 steps, +1 for an
/// estimate over two hours, +2 in production, +1 for more than 5 requirement
/// dependencies. Five or more is high, three or more medium.
pub fn assess_risk(requirement: &Requirement, context: &Context, step_count: usize) -> RiskLevel {
    let mut score = requirement.priority.risk_weight();
    if step_count > 10 {
        score += 2;
    }
    if requirement.estimated_duration > 120 {
        score += 1;
    }
    if context.environment == Environment::Production {
        score += 2;
    }
    if requirement.dependencies.len() > 5 {
        score += 1;
    }

    match score {
        s if s >= 5 => RiskLevel::High,
        s if s >= 3 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

/// Human-readable fallback hints for the plan.
pub fn fallback_strategies(requirement: &Requirement, steps: &[PlanStep]) -> Vec<String> {
    let mut strategies = Vec::new();
    if requirement.priority == RequirementPriority::Critical {
        strategies.push("Rollback to the last known good state".to_string());
        strategies.push("Escalate for manual intervention".to_string());
    }
    if steps.iter().any(|s| s.step_type() == StepType::BrowserTesting) {
        strategies.push("Fall back to manual testing if browser automation fails".to_string());
    }
    if steps.iter().any(|s| s.step_type() == StepType::FileOperation) {
        strategies.push("Restore modified files from backup".to_string());
    }
    strategies
}
