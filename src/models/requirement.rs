//! Requirement Models
//!
//! Abstract work requests submitted to the engine and the immutable context
//! they are planned and executed against.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of work a requirement asks for. Drives which steps the planner emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    Development,
    Testing,
    Deployment,
    Analysis,
}

impl std::fmt::Display for RequirementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequirementType::Development => write!(f, "development"),
            RequirementType::Testing => write!(f, "testing"),
            RequirementType::Deployment => write!(f, "deployment"),
            RequirementType::Analysis => write!(f, "analysis"),
        }
    }
}

/// Priority class of a requirement. Doubles as the queue priority class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl RequirementPriority {
    /// All classes, highest first.
    pub const ALL: [RequirementPriority; 4] = [
        RequirementPriority::Critical,
        RequirementPriority::High,
        RequirementPriority::Medium,
        RequirementPriority::Low,
    ];

    /// Numeric queue priority for this class.
    pub fn numeric_priority(&self) -> i64 {
        match self {
            RequirementPriority::Critical => 100,
            RequirementPriority::High => 75,
            RequirementPriority::Medium => 50,
            RequirementPriority::Low => 25,
        }
    }

    /// Contribution of this class to plan risk.
    pub fn risk_weight(&self) -> u32 {
        match self {
            RequirementPriority::Critical => 3,
            RequirementPriority::High => 2,
            RequirementPriority::Medium => 1,
            RequirementPriority::Low => 0,
        }
    }

    /// Lowercase class name; also the id of the default queue for the class.
    pub fn queue_class(&self) -> &'static str {
        match self {
            RequirementPriority::Critical => "critical",
            RequirementPriority::High => "high",
            RequirementPriority::Medium => "medium",
            RequirementPriority::Low => "low",
        }
    }
}

impl std::fmt::Display for RequirementPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.queue_class())
    }
}

/// A unit of requested work. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    /// Caller-assigned identifier
    pub id: String,
    /// Short title
    pub title: String,
    /// What should be done
    pub description: String,
    /// Kind of work
    #[serde(rename = "type")]
    pub requirement_type: RequirementType,
    /// Priority class
    pub priority: RequirementPriority,
    /// Estimated duration in minutes
    pub estimated_duration: u32,
    /// Other requirement ids this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Resources the work needs (e.g. "browser", "network")
    #[serde(default)]
    pub resources: Vec<String>,
    /// Free-form constraints; some keys steer plan generation
    #[serde(default)]
    pub constraints: HashMap<String, Value>,
}

impl Requirement {
    /// Create a requirement with empty dependencies, resources and constraints.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        requirement_type: RequirementType,
        priority: RequirementPriority,
        estimated_duration: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            requirement_type,
            priority,
            estimated_duration,
            dependencies: Vec::new(),
            resources: Vec::new(),
            constraints: HashMap::new(),
        }
    }

    /// Builder-style constraint setter.
    pub fn with_constraint(mut self, key: impl Into<String>, value: Value) -> Self {
        self.constraints.insert(key.into(), value);
        self
    }

    /// Read a string constraint.
    pub fn constraint_str(&self, key: &str) -> Option<&str> {
        self.constraints.get(key).and_then(|v| v.as_str())
    }

    /// Read a boolean constraint, defaulting to `false`.
    pub fn constraint_flag(&self, key: &str) -> bool {
        self.constraints
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// Deployment environment a context targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Immutable context a requirement is planned and executed against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// Project root on disk
    pub project_path: PathBuf,
    /// Checked-out branch
    #[serde(default)]
    pub current_branch: String,
    /// Resources available to steps
    #[serde(default)]
    pub available_resources: Vec<String>,
    /// Context-level constraints
    #[serde(default)]
    pub constraints: HashMap<String, Value>,
    /// Target environment
    #[serde(default)]
    pub environment: Environment,
}

impl Context {
    /// Create a development context rooted at `project_path`.
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            current_branch: "main".to_string(),
            available_resources: Vec::new(),
            constraints: HashMap::new(),
            environment: Environment::Development,
        }
    }

    /// Builder-style environment setter.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}
