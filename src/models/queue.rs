//! Queue Models
//!
//! Priority queues owned by the scheduler, the tasks waiting in them, and the
//! read-only status snapshots handed to callers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::requirement::{Context, Requirement, RequirementPriority};

/// A requirement waiting for dispatch inside a queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedTask {
    pub id: String,
    pub requirement: Requirement,
    pub context: Context,
    /// Numeric priority; higher dispatches first
    pub priority: i64,
    /// Submission order, used to break priority ties (lower first)
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    /// Not eligible for dispatch before this instant
    pub scheduled_for: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl QueuedTask {
    /// Whether the task may be dispatched at `now`.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for.map_or(true, |at| at <= now)
    }

    /// Whether another retry is allowed.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

/// Optional knobs for `submit_task`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitOptions {
    /// Explicit numeric priority override
    pub priority: Option<i64>,
    /// Delay dispatch until this instant
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Override the configured retry limit
    pub max_retries: Option<u32>,
    pub metadata: HashMap<String, Value>,
}

/// A named priority queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    pub id: String,
    pub name: String,
    pub priority_class: RequirementPriority,
    pub max_concurrent: usize,
    pub active_executions: usize,
    /// Sorted by descending priority, then ascending sequence
    pub queued_tasks: Vec<QueuedTask>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Queue {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        priority_class: RequirementPriority,
        max_concurrent: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            priority_class,
            max_concurrent,
            active_executions: 0,
            queued_tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Free execution slots.
    pub fn available_slots(&self) -> usize {
        self.max_concurrent.saturating_sub(self.active_executions)
    }

    /// Load ratio used for queue selection.
    pub fn utilization(&self) -> f64 {
        if self.max_concurrent == 0 {
            return f64::INFINITY;
        }
        self.active_executions as f64 / self.max_concurrent as f64
    }

    /// Insert a task and restore ordering.
    pub fn enqueue(&mut self, task: QueuedTask) {
        self.queued_tasks.push(task);
        self.sort_tasks();
        self.updated_at = Utc::now();
    }

    /// Descending priority, ties by submission order.
    pub fn sort_tasks(&mut self) {
        self.queued_tasks
            .sort_by(|a, b| b.priority.cmp(&a.priority).then(a.sequence.cmp(&b.sequence)));
    }

    /// Remove and return up to `limit` of the highest-priority ready tasks.
    pub fn take_ready(&mut self, now: DateTime<Utc>, limit: usize) -> Vec<QueuedTask> {
        let mut taken = Vec::new();
        let mut i = 0;
        while i < self.queued_tasks.len() && taken.len() < limit {
            if self.queued_tasks[i].is_ready(now) {
                taken.push(self.queued_tasks.remove(i));
            } else {
                i += 1;
            }
        }
        if !taken.is_empty() {
            self.updated_at = now;
        }
        taken
    }

    /// Remove a waiting task by id.
    pub fn remove_task(&mut self, task_id: &str) -> Option<QueuedTask> {
        let pos = self.queued_tasks.iter().position(|t| t.id == task_id)?;
        self.updated_at = Utc::now();
        Some(self.queued_tasks.remove(pos))
    }

    /// Earliest future `scheduled_for` among waiting tasks.
    pub fn next_wake(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.queued_tasks
            .iter()
            .filter_map(|t| t.scheduled_for)
            .filter(|at| *at > now)
            .min()
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            id: self.id.clone(),
            name: self.name.clone(),
            priority_class: self.priority_class,
            max_concurrent: self.max_concurrent,
            active_executions: self.active_executions,
            queued_tasks: self.queued_tasks.len(),
            utilization: if self.max_concurrent == 0 {
                0.0
            } else {
                self.utilization()
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Read-only snapshot of a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub id: String,
    pub name: String,
    pub priority_class: RequirementPriority,
    pub max_concurrent: usize,
    pub active_executions: usize,
    pub queued_tasks: usize,
    pub utilization: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate scheduler counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub total_queues: usize,
    pub total_queued: usize,
    pub total_active: usize,
    /// Sum of every queue's `max_concurrent`
    pub total_capacity: usize,
    pub pending_retries: usize,
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub retried: u64,
    pub cancelled: u64,
    pub queues: Vec<QueueStatus>,
}

/// What `cancel_task` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// Removed from its queue before any execution existed
    RemovedFromQueue,
    /// A scheduled retry was cancelled before re-insertion
    RetryCancelled,
    /// Cancellation requested; takes effect at the next step boundary
    CancellationRequested,
}
