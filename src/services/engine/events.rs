//! Engine Events
//!
//! Progress notifications published by the scheduler and executor. Delivery is
//! fire-and-forget over a broadcast channel: a slow or missing subscriber never
//! blocks the engine, it just lags and loses the oldest events.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::ExecutionStatus;

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A progress event emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    TaskSubmitted {
        #[serde(rename = "taskId")]
        task_id: String,
        #[serde(rename = "queueId")]
        queue_id: String,
        priority: i64,
    },
    TaskDispatched {
        #[serde(rename = "taskId")]
        task_id: String,
        #[serde(rename = "queueId")]
        queue_id: String,
        #[serde(rename = "executionId")]
        execution_id: String,
    },
    RetryScheduled {
        #[serde(rename = "taskId")]
        task_id: String,
        attempt: u32,
        #[serde(rename = "delayMs")]
        delay_ms: u64,
    },
    TaskCompleted {
        #[serde(rename = "taskId")]
        task_id: String,
        #[serde(rename = "executionId")]
        execution_id: String,
    },
    TaskFailed {
        #[serde(rename = "taskId")]
        task_id: String,
        error: String,
    },
    TaskCancelled {
        #[serde(rename = "taskId")]
        task_id: String,
    },
    ExecutionStarted {
        #[serde(rename = "executionId")]
        execution_id: String,
        #[serde(rename = "planId")]
        plan_id: String,
        #[serde(rename = "totalSteps")]
        total_steps: usize,
    },
    StepStarted {
        #[serde(rename = "executionId")]
        execution_id: String,
        #[serde(rename = "stepId")]
        step_id: String,
        #[serde(rename = "stepNumber")]
        step_number: usize,
    },
    StepCompleted {
        #[serde(rename = "executionId")]
        execution_id: String,
        #[serde(rename = "stepId")]
        step_id: String,
        progress: f64,
    },
    StepFailed {
        #[serde(rename = "executionId")]
        execution_id: String,
        #[serde(rename = "stepId")]
        step_id: String,
        error: String,
    },
    ExecutionFinished {
        #[serde(rename = "executionId")]
        execution_id: String,
        status: ExecutionStatus,
    },
}

impl EngineEvent {
    /// Task id for task-level events.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            EngineEvent::TaskSubmitted { task_id, .. }
            | EngineEvent::TaskDispatched { task_id, .. }
            | EngineEvent::RetryScheduled { task_id, .. }
            | EngineEvent::TaskCompleted { task_id, .. }
            | EngineEvent::TaskFailed { task_id, .. }
            | EngineEvent::TaskCancelled { task_id } => Some(task_id),
            _ => None,
        }
    }
}

/// Broadcast channel shared by the scheduler and executor.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. No subscribers is not an error.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
