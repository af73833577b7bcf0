//! Execution Plan Models
//!
//! An `ExecutionPlan` is the ordered, dependency-resolved list of steps derived
//! from one requirement. Each step carries a strongly-typed `StepKind` instead
//! of an untyped parameter map, so handlers pattern-match on what they need.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Step kinds
// ============================================================================

/// Flat step type, used as the handler registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    CodeAnalysis,
    BrowserTesting,
    FileOperation,
    ApiCall,
    Custom,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::CodeAnalysis => "code_analysis",
            StepType::BrowserTesting => "browser_testing",
            StepType::FileOperation => "file_operation",
            StepType::ApiCall => "api_call",
            StepType::Custom => "custom",
        }
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Browser test sub-mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserMode {
    /// Evaluate a script in the page and return its result
    Script { script: String },
    /// Capture a screenshot
    Screenshot {
        #[serde(default, rename = "fullPage")]
        full_page: bool,
    },
}

/// One filesystem sub-operation. Relative paths resolve against the project path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FileOp {
    Read { path: PathBuf },
    Write { path: PathBuf, content: String },
    Delete { path: PathBuf },
    List { path: PathBuf },
}

impl FileOp {
    pub fn name(&self) -> &'static str {
        match self {
            FileOp::Read { .. } => "read",
            FileOp::Write { .. } => "write",
            FileOp::Delete { .. } => "delete",
            FileOp::List { .. } => "list",
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            FileOp::Read { path }
            | FileOp::Write { path, .. }
            | FileOp::Delete { path }
            | FileOp::List { path } => path,
        }
    }
}

/// What a step does, with its typed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    CodeAnalysis {
        #[serde(rename = "projectPath")]
        project_path: PathBuf,
    },
    BrowserTesting {
        url: String,
        mode: BrowserMode,
    },
    FileOperation {
        operations: Vec<FileOp>,
    },
    ApiCall {
        method: String,
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        body: Option<Value>,
    },
    Custom {
        handler: String,
        #[serde(default)]
        parameters: Value,
    },
}

impl StepKind {
    /// Flat type of this kind.
    pub fn step_type(&self) -> StepType {
        match self {
            StepKind::CodeAnalysis { .. } => StepType::CodeAnalysis,
            StepKind::BrowserTesting { .. } => StepType::BrowserTesting,
            StepKind::FileOperation { .. } => StepType::FileOperation,
            StepKind::ApiCall { .. } => StepType::ApiCall,
            StepKind::Custom { .. } => StepType::Custom,
        }
    }

    /// JSON object view of the parameters, without the type tag.
    ///
    /// For `custom` steps the user parameters are merged in at top level so
    /// required-field rules can name them directly.
    pub fn parameters(&self) -> serde_json::Map<String, Value> {
        let mut map = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        map.remove("type");
        if let StepKind::Custom {
            parameters: Value::Object(extra),
            ..
        } = self
        {
            for (k, v) in extra {
                map.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        map
    }
}

// ============================================================================
// Validation rules
// ============================================================================

/// Pre-dispatch checks applied to a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationRules {
    /// Parameter names that must be present and non-empty
    pub required_fields: Vec<String>,
    /// The context's project path must be an existing directory
    pub project_path_exists: bool,
    /// This directory must exist (relative paths resolve against the project)
    pub directory_exists: Option<PathBuf>,
    /// At least one browser session must already be open
    pub browser_available: bool,
    /// Step may run against a production environment
    pub production_safe: bool,
}

// ============================================================================
// Plan step
// ============================================================================

/// A single step in an execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Unique step identifier within the plan
    pub id: String,
    /// Step title
    pub title: String,
    /// What this step accomplishes
    pub description: String,
    /// Typed action and parameters
    pub kind: StepKind,
    /// 1-based position in the plan
    pub order: usize,
    /// Estimated duration in minutes
    pub estimated_duration: u32,
    /// Step ids that must run before this one
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Checks applied before dispatch
    #[serde(default)]
    pub validation_rules: ValidationRules,
}

impl PlanStep {
    /// Create a step with no dependencies and default validation rules.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        kind: StepKind,
        estimated_duration: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            kind,
            order: 0,
            estimated_duration,
            dependencies: Vec::new(),
            validation_rules: ValidationRules::default(),
        }
    }

    /// Builder-style dependency setter.
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style validation rules setter.
    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.validation_rules = rules;
        self
    }

    pub fn step_type(&self) -> StepType {
        self.kind.step_type()
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Plan risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Ordered, dependency-resolved steps for one requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    /// Plan identifier
    pub id: String,
    /// Requirement this plan was built from
    pub requirement_id: String,
    /// Steps in a valid topological order
    pub steps: Vec<PlanStep>,
    /// Sum of step estimates, in minutes
    pub estimated_total_duration: u32,
    /// Requirement-level dependencies carried from the requirement
    pub dependencies: Vec<String>,
    /// Assessed risk
    pub risk_level: RiskLevel,
    /// Human-readable fallback hints
    pub fallback_strategies: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionPlan {
    /// Look up a step by id.
    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Step ids in execution order.
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn has_step_type(&self, step_type: StepType) -> bool {
        self.steps.iter().any(|s| s.step_type() == step_type)
    }
}
