//! Execution Models
//!
//! Runtime records of a plan being carried out. An `Execution` moves
//! pending -> running -> {completed | failed | cancelled}; terminal states are
//! absorbing and `transition_to` refuses anything else.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::{AppError, AppResult};

/// Error code attached to every failed step result.
pub const STEP_EXECUTION_FAILED: &str = "STEP_EXECUTION_FAILED";

/// Lifecycle status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    /// Whether moving from `self` to `next` is a legal lifecycle edge.
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        matches!(
            (self, next),
            (ExecutionStatus::Pending, ExecutionStatus::Running)
                | (ExecutionStatus::Pending, ExecutionStatus::Cancelled)
                | (ExecutionStatus::Running, ExecutionStatus::Completed)
                | (ExecutionStatus::Running, ExecutionStatus::Failed)
                | (ExecutionStatus::Running, ExecutionStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "pending"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

/// Error payload of a failed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepError {
    pub message: String,
    pub code: String,
    #[serde(default)]
    pub details: Value,
}

impl StepError {
    /// Step failure with the standard `STEP_EXECUTION_FAILED` code.
    pub fn step_failed(message: impl Into<String>, details: Value) -> Self {
        Self {
            message: message.into(),
            code: STEP_EXECUTION_FAILED.to_string(),
            details,
        }
    }
}

/// Log line captured during execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

impl ExecutionLog {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: "info".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Result of running one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Execution this step ran under
    pub task_id: String,
    pub step_id: String,
    pub status: StepStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Milliseconds
    pub duration: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<StepError>,
    #[serde(default)]
    pub logs: Vec<ExecutionLog>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl StepResult {
    /// A step result in the running state, started now.
    pub fn started(task_id: impl Into<String>, step_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            step_id: step_id.into(),
            status: StepStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            result: None,
            error: None,
            logs: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    fn stamp_end(&mut self) {
        let end = Utc::now();
        self.duration = Some(elapsed_ms(self.start_time, end));
        self.end_time = Some(end);
    }

    pub fn complete(mut self, result: Value) -> Self {
        self.stamp_end();
        self.status = StepStatus::Completed;
        self.result = Some(result);
        self
    }

    pub fn fail(mut self, error: StepError) -> Self {
        self.stamp_end();
        self.status = StepStatus::Failed;
        self.logs.push(ExecutionLog::error(error.message.clone()));
        self.error = Some(error);
        self
    }
}

/// Runtime record of one plan execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    pub plan_id: String,
    pub status: ExecutionStatus,
    /// Number of steps started so far; never decreases, never exceeds `total_steps`
    pub current_step: usize,
    pub total_steps: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Milliseconds
    pub duration: Option<u64>,
    pub results: Vec<StepResult>,
    /// Percent of steps completed (0-100)
    pub progress: f64,
    pub logs: Vec<ExecutionLog>,
    pub metadata: HashMap<String, Value>,
}

impl Execution {
    /// Create a pending execution for a plan with `total_steps` steps.
    pub fn new(id: impl Into<String>, plan_id: impl Into<String>, total_steps: usize) -> Self {
        Self {
            id: id.into(),
            plan_id: plan_id.into(),
            status: ExecutionStatus::Pending,
            current_step: 0,
            total_steps,
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            results: Vec::new(),
            progress: 0.0,
            logs: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Apply a lifecycle transition. Terminal transitions stamp end time and duration.
    pub fn transition_to(&mut self, next: ExecutionStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::validation(format!(
                "Illegal execution transition {} -> {} for {}",
                self.status, next, self.id
            )));
        }
        if next == ExecutionStatus::Running {
            self.start_time = Utc::now();
        }
        self.status = next;
        if next.is_terminal() {
            let end = Utc::now();
            self.duration = Some(elapsed_ms(self.start_time, end));
            self.end_time = Some(end);
        }
        self.logs.push(ExecutionLog::info(format!("status -> {next}")));
        Ok(())
    }

    /// Advance the started-step counter; never moves backwards.
    pub fn advance_to_step(&mut self, step_number: usize) {
        let bounded = step_number.min(self.total_steps);
        if bounded > self.current_step {
            self.current_step = bounded;
        }
    }

    /// Append a step result and refresh progress.
    pub fn record_result(&mut self, result: StepResult) {
        self.results.push(result);
        self.progress = self.completed_percentage();
    }

    pub fn completed_steps(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == StepStatus::Completed)
            .count()
    }

    fn completed_percentage(&self) -> f64 {
        if self.total_steps == 0 {
            return 100.0;
        }
        (self.completed_steps() as f64 / self.total_steps as f64) * 100.0
    }

    /// The error of the failing step, if the execution failed.
    pub fn failure(&self) -> Option<&StepError> {
        self.results.iter().rev().find_map(|r| r.error.as_ref())
    }
}

fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from((end - start).num_milliseconds()).unwrap_or(0)
}
