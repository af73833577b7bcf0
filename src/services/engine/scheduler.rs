//! Task Scheduler
//!
//! Owns the named priority queues and decides when queued work runs.
//!
//! - Admission: a submission is rejected once its queue holds `max_queue_size`
//!   waiting tasks; nothing else applies backpressure.
//! - Ordering: descending numeric priority, ties by submission sequence.
//! - Concurrency: a queue never has more than `max_concurrent` executions in
//!   flight. The aggregate bound is the sum over queues.
//! - Progress: finishing an execution re-runs `process_queue` for its queue.
//!   Tasks scheduled for later arm a one-shot wake-up; there is no poll loop.
//! - Retries: a failed task is re-inserted after a backoff delay until its
//!   retry budget is spent. The delay is an explicit, cancellable task.
//!
//! All queue and registry mutations happen under one async mutex. The mutex is
//! never held while a step runs or while the recovery sink is called.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use automation_hub_core::{ErrorRecovery, ErrorReport, Severity};

use crate::models::{
    CancelOutcome, Context, EngineConfig, Execution, ExecutionPlan, ExecutionStatus, Queue,
    QueueStatus, QueuedTask, Requirement, RequirementPriority, SchedulerStats, SubmitOptions,
};
use crate::utils::error::{AppError, AppResult};

use super::events::{EngineEvent, EventBus};
use super::executor::Executor;
use super::planner::Planner;

/// Error code reported for tasks that exhausted their retries.
pub const TASK_FAILED: &str = "TASK_FAILED";

/// Error code reported for scheduler initialization faults.
pub const SCHEDULER_INIT_FAILED: &str = "SCHEDULER_INIT_FAILED";

// ============================================================================
// State
// ============================================================================

struct RunningTask {
    execution_id: String,
    queue_id: String,
    task: QueuedTask,
    /// Set by `cancel_task`; a failure after this settles as cancelled
    cancel_requested: bool,
}

struct PendingRetry {
    cancel: CancellationToken,
}

struct ArmedWake {
    at: DateTime<Utc>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Counters {
    submitted: u64,
    completed: u64,
    failed: u64,
    retried: u64,
    cancelled: u64,
}

#[derive(Default)]
struct SchedulerState {
    queues: HashMap<String, Queue>,
    /// Queue ids in creation order
    queue_order: Vec<String>,
    running: HashMap<String, RunningTask>,
    pending_retries: HashMap<String, PendingRetry>,
    wakeups: HashMap<String, ArmedWake>,
    next_sequence: u64,
    counters: Counters,
}

impl SchedulerState {
    fn insert_queue(&mut self, queue: Queue) {
        self.queue_order.push(queue.id.clone());
        self.queues.insert(queue.id.clone(), queue);
    }

    fn ordered_queues(&self) -> impl Iterator<Item = &Queue> {
        self.queue_order.iter().filter_map(|id| self.queues.get(id))
    }

    /// Least-utilized queue of the requirement's class, else of any class.
    fn select_queue(&self, priority: RequirementPriority) -> AppResult<String> {
        let least_loaded = |candidates: Vec<&Queue>| {
            candidates
                .into_iter()
                .min_by(|a, b| a.utilization().total_cmp(&b.utilization()))
                .map(|q| q.id.clone())
        };

        let matching: Vec<&Queue> = self
            .ordered_queues()
            .filter(|q| q.priority_class == priority)
            .collect();
        if let Some(id) = least_loaded(matching) {
            return Ok(id);
        }
        least_loaded(self.ordered_queues().collect())
            .ok_or_else(|| AppError::UnknownQueue(format!("no queue for priority {priority}")))
    }
}

struct Dispatch {
    task_id: String,
    execution_id: String,
    plan: ExecutionPlan,
    context: Context,
}

/// Retry-or-fail decision for a failed task, taken under the state lock.
enum FailureAction {
    Retry {
        task: QueuedTask,
        delay: Duration,
        cancel: CancellationToken,
    },
    Fail {
        task: QueuedTask,
    },
}

/// How a finished execution settled its task.
enum Settled {
    Completed,
    Cancelled,
    Failed(FailureAction, String),
}

// ============================================================================
// Scheduler
// ============================================================================

struct SchedulerInner {
    config: EngineConfig,
    planner: Planner,
    executor: Executor,
    recovery: Arc<dyn ErrorRecovery>,
    state: Mutex<SchedulerState>,
    shutdown: CancellationToken,
}

/// Multi-queue priority scheduler. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Create a scheduler seeded with the configured queues.
    ///
    /// An invalid configuration is reported to `recovery` as a critical fault
    /// and returned as an error.
    pub async fn new(
        config: EngineConfig,
        planner: Planner,
        executor: Executor,
        recovery: Arc<dyn ErrorRecovery>,
    ) -> AppResult<Self> {
        let mut state = SchedulerState::default();
        let seeded = config.validate().map_err(AppError::config).and_then(|_| {
            for queue in &config.queues {
                let id = slugify(&queue.name);
                if id.is_empty() {
                    return Err(AppError::config(format!(
                        "Queue name '{}' has no usable characters",
                        queue.name
                    )));
                }
                if state.queues.contains_key(&id) {
                    return Err(AppError::config(format!("Duplicate queue id: {id}")));
                }
                state.insert_queue(Queue::new(
                    id,
                    queue.name.clone(),
                    queue.priority_class,
                    queue.max_concurrent,
                ));
            }
            Ok(())
        });

        if let Err(e) = seeded {
            error!(error = %e, "Scheduler initialization failed");
            recovery
                .handle_error(
                    ErrorReport::new(e.to_string(), SCHEDULER_INIT_FAILED)
                        .with("component", "scheduler"),
                    Severity::Critical,
                )
                .await;
            return Err(e);
        }

        info!(
            queues = state.queues.len(),
            max_queue_size = config.max_queue_size,
            backoff = %config.backoff,
            "Scheduler initialized"
        );

        Ok(Self {
            inner: Arc::new(SchedulerInner {
                config,
                planner,
                executor,
                recovery,
                state: Mutex::new(state),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn executor(&self) -> &Executor {
        &self.inner.executor
    }

    pub fn events(&self) -> &EventBus {
        self.inner.executor.events()
    }

    // ------------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------------

    /// Queue a requirement for execution and try to dispatch right away.
    ///
    /// Without `queue_id` the least-utilized queue of the requirement's
    /// priority class is chosen. Fails on a malformed requirement, an unknown
    /// queue, or a full queue.
    pub async fn submit_task(
        &self,
        requirement: Requirement,
        context: Context,
        queue_id: Option<&str>,
        options: SubmitOptions,
    ) -> AppResult<String> {
        if self.inner.shutdown.is_cancelled() {
            return Err(AppError::internal("Scheduler is shut down"));
        }
        self.inner.planner.validate_requirement(&requirement)?;

        let task_id = format!("task-{}", Uuid::new_v4());
        let (queue_id, priority) = {
            let mut state = self.inner.state.lock().await;
            let queue_id = match queue_id {
                Some(id) => {
                    if !state.queues.contains_key(id) {
                        return Err(AppError::UnknownQueue(id.to_string()));
                    }
                    id.to_string()
                }
                None => state.select_queue(requirement.priority)?,
            };

            let max_size = self.inner.config.max_queue_size;
            let queued = state
                .queues
                .get(&queue_id)
                .map_or(0, |q| q.queued_tasks.len());
            if queued >= max_size {
                warn!(queue_id = %queue_id, max_size, "Queue full, rejecting submission");
                return Err(AppError::QueueFull { queue_id, max_size });
            }

            let priority = options
                .priority
                .unwrap_or_else(|| requirement.priority.numeric_priority());
            let sequence = state.next_sequence;
            state.next_sequence += 1;

            let task = QueuedTask {
                id: task_id.clone(),
                requirement,
                context,
                priority,
                sequence,
                created_at: Utc::now(),
                scheduled_for: options.scheduled_for,
                retry_count: 0,
                max_retries: options
                    .max_retries
                    .unwrap_or(self.inner.config.default_max_retries),
                metadata: options.metadata,
            };
            if let Some(queue) = state.queues.get_mut(&queue_id) {
                queue.enqueue(task);
            }
            state.counters.submitted += 1;
            (queue_id, priority)
        };

        info!(task_id = %task_id, queue_id = %queue_id, priority, "Task submitted");
        self.events().emit(EngineEvent::TaskSubmitted {
            task_id: task_id.clone(),
            queue_id: queue_id.clone(),
            priority,
        });

        self.process_queue(&queue_id).await?;
        Ok(task_id)
    }

    /// Add a custom queue. Its id is the slugified name.
    pub async fn create_queue(
        &self,
        name: &str,
        priority_class: RequirementPriority,
        max_concurrent: usize,
    ) -> AppResult<String> {
        if max_concurrent == 0 {
            return Err(AppError::validation(
                "maxConcurrent must be at least 1",
            ));
        }
        let id = slugify(name);
        if id.is_empty() {
            return Err(AppError::validation(format!("Invalid queue name: '{name}'")));
        }

        let mut state = self.inner.state.lock().await;
        if state.queues.contains_key(&id) {
            return Err(AppError::validation(format!("Queue already exists: {id}")));
        }
        state.insert_queue(Queue::new(
            id.clone(),
            name.trim(),
            priority_class,
            max_concurrent,
        ));
        info!(queue_id = %id, priority_class = %priority_class, max_concurrent, "Queue created");
        Ok(id)
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Dispatch as many ready tasks as the queue has free slots.
    ///
    /// Returns the number of executions started.
    pub async fn process_queue(&self, queue_id: &str) -> AppResult<usize> {
        if self.inner.shutdown.is_cancelled() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut dispatches = Vec::new();
        let mut failures = Vec::new();
        {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            let queue = state
                .queues
                .get_mut(queue_id)
                .ok_or_else(|| AppError::UnknownQueue(queue_id.to_string()))?;

            let ready = queue.take_ready(now, queue.available_slots());
            let mut plan_failures = Vec::new();
            for task in ready {
                match self
                    .inner
                    .planner
                    .create_execution_plan(&task.requirement, &task.context)
                {
                    Ok(plan) => {
                        let execution = self.inner.executor.register(&plan).await;
                        queue.active_executions += 1;
                        dispatches.push(Dispatch {
                            task_id: task.id.clone(),
                            execution_id: execution.id.clone(),
                            plan,
                            context: task.context.clone(),
                        });
                        state.running.insert(
                            task.id.clone(),
                            RunningTask {
                                execution_id: execution.id,
                                queue_id: queue_id.to_string(),
                                task,
                                cancel_requested: false,
                            },
                        );
                    }
                    Err(e) => plan_failures.push((task, e.to_string())),
                }
            }

            if let Some(at) = queue.next_wake(now) {
                self.arm_wakeup(state, queue_id, at);
            }

            for (task, message) in plan_failures {
                warn!(task_id = %task.id, error = %message, "Planning failed at dispatch");
                failures.push((self.decide_failure(state, task), message));
            }
        }

        let dispatched = dispatches.len();
        for dispatch in dispatches {
            info!(
                task_id = %dispatch.task_id,
                execution_id = %dispatch.execution_id,
                queue_id = %queue_id,
                "Task dispatched"
            );
            self.events().emit(EngineEvent::TaskDispatched {
                task_id: dispatch.task_id.clone(),
                queue_id: queue_id.to_string(),
                execution_id: dispatch.execution_id.clone(),
            });
            self.spawn_execution(dispatch);
        }

        for (action, message) in failures {
            self.apply_failure(action, queue_id, message).await;
        }

        Ok(dispatched)
    }

    fn spawn_execution(&self, dispatch: Dispatch) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let result = scheduler
                .inner
                .executor
                .run(&dispatch.execution_id, &dispatch.plan, &dispatch.context)
                .await;
            scheduler.handle_completion(&dispatch.task_id, result).await;
        });
    }

    /// Settle a finished execution: free its slot, then count it, retry it or
    /// fail it. The decision and every registry change happen under one lock,
    /// so a cancel never finds the task between registries.
    async fn handle_completion(&self, task_id: &str, result: AppResult<Execution>) {
        let settled = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            let Some(RunningTask {
                execution_id,
                queue_id,
                task,
                cancel_requested,
            }) = state.running.remove(task_id)
            else {
                drop(guard);
                warn!(task_id = %task_id, "Completion for unknown task");
                return;
            };
            if let Some(queue) = state.queues.get_mut(&queue_id) {
                queue.active_executions = queue.active_executions.saturating_sub(1);
            }
            self.inner.executor.remove_execution(&execution_id).await;

            let settled = match &result {
                Ok(e) if e.status == ExecutionStatus::Completed => {
                    state.counters.completed += 1;
                    Settled::Completed
                }
                Ok(e) if e.status == ExecutionStatus::Cancelled => {
                    state.counters.cancelled += 1;
                    Settled::Cancelled
                }
                _ if cancel_requested => {
                    state.counters.cancelled += 1;
                    Settled::Cancelled
                }
                Ok(e) => {
                    let message = e
                        .failure()
                        .map(|f| f.message.clone())
                        .unwrap_or_else(|| format!("Execution ended as {}", e.status));
                    Settled::Failed(self.decide_failure(state, task), message)
                }
                Err(e) => Settled::Failed(self.decide_failure(state, task), e.to_string()),
            };
            (execution_id, queue_id, settled)
        };

        let (execution_id, queue_id, settled) = settled;
        match settled {
            Settled::Completed => {
                info!(task_id = %task_id, execution_id = %execution_id, "Task completed");
                self.events().emit(EngineEvent::TaskCompleted {
                    task_id: task_id.to_string(),
                    execution_id,
                });
            }
            Settled::Cancelled => {
                info!(task_id = %task_id, execution_id = %execution_id, "Task cancelled");
                self.events().emit(EngineEvent::TaskCancelled {
                    task_id: task_id.to_string(),
                });
            }
            Settled::Failed(action, message) => {
                self.apply_failure(action, &queue_id, message).await;
            }
        }

        if let Err(e) = self.process_queue(&queue_id).await {
            warn!(queue_id = %queue_id, error = %e, "Failed to advance queue");
        }
    }

    // ------------------------------------------------------------------------
    // Retry
    // ------------------------------------------------------------------------

    /// Retry if the budget allows, otherwise count a permanent failure.
    ///
    /// A retry is registered in `pending_retries` before the lock is released.
    fn decide_failure(&self, state: &mut SchedulerState, mut task: QueuedTask) -> FailureAction {
        if !task.can_retry() || self.inner.shutdown.is_cancelled() {
            state.counters.failed += 1;
            return FailureAction::Fail { task };
        }

        task.retry_count += 1;
        let delay = self
            .inner
            .config
            .backoff
            .delay(self.inner.config.retry_delay_ms, task.retry_count);
        let cancel = self.inner.shutdown.child_token();
        state.counters.retried += 1;
        state.pending_retries.insert(
            task.id.clone(),
            PendingRetry {
                cancel: cancel.clone(),
            },
        );
        FailureAction::Retry {
            task,
            delay,
            cancel,
        }
    }

    /// Announce a failure decision: arm the retry timer, or report the
    /// permanent failure once.
    async fn apply_failure(&self, action: FailureAction, queue_id: &str, message: String) {
        match action {
            FailureAction::Retry {
                task,
                delay,
                cancel,
            } => {
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                warn!(
                    task_id = %task.id,
                    attempt = task.retry_count,
                    max_retries = task.max_retries,
                    delay_ms,
                    error = %message,
                    "Task failed, retry scheduled"
                );
                self.events().emit(EngineEvent::RetryScheduled {
                    task_id: task.id.clone(),
                    attempt: task.retry_count,
                    delay_ms,
                });
                self.spawn_retry(task, queue_id.to_string(), delay, cancel);
            }
            FailureAction::Fail { task } => {
                error!(
                    task_id = %task.id,
                    retries = task.retry_count,
                    error = %message,
                    "Task failed permanently"
                );
                self.events().emit(EngineEvent::TaskFailed {
                    task_id: task.id.clone(),
                    error: message.clone(),
                });
                let report = ErrorReport::new(message, TASK_FAILED)
                    .with("component", "scheduler")
                    .with("taskId", task.id.as_str())
                    .with("queueId", queue_id)
                    .with("requirementId", task.requirement.id.as_str())
                    .with("retryCount", task.retry_count.to_string());
                self.inner.recovery.handle_error(report, Severity::High).await;
            }
        }
    }

    fn spawn_retry(
        &self,
        task: QueuedTask,
        queue_id: String,
        delay: Duration,
        cancel: CancellationToken,
    ) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(task_id = %task.id, "Pending retry cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            scheduler.requeue(task, &queue_id).await;
        });
    }

    async fn requeue(&self, task: QueuedTask, queue_id: &str) {
        {
            let mut state = self.inner.state.lock().await;
            // Cancelled between the timer firing and taking the lock.
            if state.pending_retries.remove(&task.id).is_none() {
                return;
            }
            match state.queues.get_mut(queue_id) {
                Some(queue) => {
                    debug!(task_id = %task.id, queue_id = %queue_id, attempt = task.retry_count, "Task re-queued");
                    queue.enqueue(task);
                }
                None => {
                    error!(task_id = %task.id, queue_id = %queue_id, "Retry target queue vanished");
                    return;
                }
            }
        }
        if let Err(e) = self.process_queue(queue_id).await {
            warn!(queue_id = %queue_id, error = %e, "Failed to process queue after retry");
        }
    }

    // ------------------------------------------------------------------------
    // Wake-ups
    // ------------------------------------------------------------------------

    /// Arm a one-shot `process_queue` for `at`, unless an earlier one is armed.
    fn arm_wakeup(&self, state: &mut SchedulerState, queue_id: &str, at: DateTime<Utc>) {
        if let Some(existing) = state.wakeups.get(queue_id) {
            if existing.at <= at && !existing.cancel.is_cancelled() {
                return;
            }
            existing.cancel.cancel();
        }

        let cancel = self.inner.shutdown.child_token();
        state.wakeups.insert(
            queue_id.to_string(),
            ArmedWake {
                at,
                cancel: cancel.clone(),
            },
        );

        let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        debug!(queue_id = %queue_id, delay_ms, "Wake-up armed");

        let scheduler = self.clone();
        let queue_id = queue_id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            {
                let mut state = scheduler.inner.state.lock().await;
                if state.wakeups.get(&queue_id).is_some_and(|w| w.at == at) {
                    state.wakeups.remove(&queue_id);
                }
            }
            if let Err(e) = scheduler.process_queue(&queue_id).await {
                warn!(queue_id = %queue_id, error = %e, "Wake-up failed to process queue");
            }
        });
    }

    // ------------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------------

    /// Cancel a task wherever it is.
    ///
    /// A queued task is removed before any execution exists. A pending retry is
    /// dropped. A running task has cancellation requested from the executor; it
    /// becomes cancelled once its current step finishes.
    pub async fn cancel_task(&self, task_id: &str) -> AppResult<CancelOutcome> {
        let (execution_id, requested) = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;

            let removed = state
                .queues
                .values_mut()
                .find_map(|q| q.remove_task(task_id));
            if removed.is_some() {
                state.counters.cancelled += 1;
                drop(guard);
                self.announce_cancelled(task_id, "queued");
                return Ok(CancelOutcome::RemovedFromQueue);
            }

            if let Some(retry) = state.pending_retries.remove(task_id) {
                retry.cancel.cancel();
                state.counters.cancelled += 1;
                drop(guard);
                self.announce_cancelled(task_id, "pending retry");
                return Ok(CancelOutcome::RetryCancelled);
            }

            let Some(running) = state.running.get_mut(task_id) else {
                return Err(AppError::not_found(format!("Task {task_id}")));
            };
            running.cancel_requested = true;
            // Under the lock, so completion cannot drop the execution first.
            let requested = self
                .inner
                .executor
                .cancel_execution(&running.execution_id)
                .await?;
            (running.execution_id.clone(), requested)
        };

        info!(
            task_id = %task_id,
            execution_id = %execution_id,
            still_running = requested,
            "Cancellation requested for running task"
        );
        Ok(CancelOutcome::CancellationRequested)
    }

    fn announce_cancelled(&self, task_id: &str, stage: &str) {
        info!(task_id = %task_id, stage, "Task cancelled");
        self.events().emit(EngineEvent::TaskCancelled {
            task_id: task_id.to_string(),
        });
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub async fn get_queue_status(&self, queue_id: &str) -> AppResult<QueueStatus> {
        self.inner
            .state
            .lock()
            .await
            .queues
            .get(queue_id)
            .map(Queue::status)
            .ok_or_else(|| AppError::UnknownQueue(queue_id.to_string()))
    }

    /// Every queue, in creation order.
    pub async fn get_all_queues(&self) -> Vec<QueueStatus> {
        self.inner
            .state
            .lock()
            .await
            .ordered_queues()
            .map(Queue::status)
            .collect()
    }

    pub async fn get_scheduler_stats(&self) -> SchedulerStats {
        let state = self.inner.state.lock().await;
        let queues: Vec<QueueStatus> = state.ordered_queues().map(Queue::status).collect();
        SchedulerStats {
            total_queues: queues.len(),
            total_queued: queues.iter().map(|q| q.queued_tasks).sum(),
            total_active: queues.iter().map(|q| q.active_executions).sum(),
            total_capacity: queues.iter().map(|q| q.max_concurrent).sum(),
            pending_retries: state.pending_retries.len(),
            submitted: state.counters.submitted,
            completed: state.counters.completed,
            failed: state.counters.failed,
            retried: state.counters.retried,
            cancelled: state.counters.cancelled,
            queues,
        }
    }

    /// Whether nothing is queued, running or waiting to retry.
    pub async fn is_idle(&self) -> bool {
        let state = self.inner.state.lock().await;
        state.running.is_empty()
            && state.pending_retries.is_empty()
            && state.queues.values().all(|q| q.queued_tasks.is_empty())
    }

    /// Stop scheduling: cancel pending retries and wake-ups, and request
    /// cancellation of every running execution. Queued tasks stay queued.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let running: Vec<String> = {
            let mut state = self.inner.state.lock().await;
            state.pending_retries.clear();
            state.wakeups.clear();
            state
                .running
                .values()
                .map(|r| r.execution_id.clone())
                .collect()
        };

        for execution_id in &running {
            if let Err(e) = self.inner.executor.cancel_execution(execution_id).await {
                warn!(execution_id = %execution_id, error = %e, "Failed to cancel execution on shutdown");
            }
        }
        info!(cancelled_executions = running.len(), "Scheduler shut down");
    }
}

/// Lowercase the name and collapse every non-alphanumeric run into one `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
