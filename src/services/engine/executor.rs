//! Plan Executor
//!
//! Runs a plan's steps strictly in array order. Each step is validated, then
//! dispatched to its handler; the first failure ends the execution as failed
//! and nothing after it runs. Cancellation is cooperative: it is observed only
//! once the step in flight has finished, never while one runs. A request that
//! lands during the last step still ends the execution as cancelled.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use automation_hub_core::{ErrorRecovery, ErrorReport, Severity};

use crate::models::{
    Context, Execution, ExecutionPlan, ExecutionStatus, StepError, StepResult,
    STEP_EXECUTION_FAILED,
};
use crate::services::capabilities::Capabilities;
use crate::utils::error::{AppError, AppResult};

use super::events::{EngineEvent, EventBus};
use super::handlers::HandlerRegistry;
use super::validation::StepValidator;

struct ExecutionEntry {
    execution: Execution,
    cancel: CancellationToken,
}

struct ExecutorInner {
    handlers: HandlerRegistry,
    validator: StepValidator,
    recovery: Arc<dyn ErrorRecovery>,
    events: EventBus,
    executions: RwLock<HashMap<String, ExecutionEntry>>,
}

/// Owns the registry of executions and drives them step by step.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

impl Executor {
    /// Executor with the built-in handler for every step type.
    pub fn new(capabilities: &Capabilities, events: EventBus) -> Self {
        Self::with_handlers(
            HandlerRegistry::with_capabilities(capabilities),
            capabilities,
            events,
        )
    }

    /// Executor with a caller-assembled handler registry.
    pub fn with_handlers(
        handlers: HandlerRegistry,
        capabilities: &Capabilities,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                handlers,
                validator: StepValidator::new(
                    capabilities.file_system.clone(),
                    capabilities.browser.clone(),
                ),
                recovery: capabilities.recovery.clone(),
                events,
                executions: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Register and run `plan` to completion.
    pub async fn execute_plan(
        &self,
        plan: &ExecutionPlan,
        context: &Context,
    ) -> AppResult<Execution> {
        let execution = self.register(plan).await;
        self.run(&execution.id, plan, context).await
    }

    /// Create a pending execution for `plan` without running it.
    pub async fn register(&self, plan: &ExecutionPlan) -> Execution {
        let execution = Execution::new(
            format!("exec-{}", Uuid::new_v4()),
            plan.id.clone(),
            plan.steps.len(),
        );
        self.inner.executions.write().await.insert(
            execution.id.clone(),
            ExecutionEntry {
                execution: execution.clone(),
                cancel: CancellationToken::new(),
            },
        );
        execution
    }

    /// Run a registered execution. Returns the execution in its terminal state.
    ///
    /// An execution cancelled while still pending returns immediately.
    pub async fn run(
        &self,
        execution_id: &str,
        plan: &ExecutionPlan,
        context: &Context,
    ) -> AppResult<Execution> {
        let token = {
            let mut executions = self.inner.executions.write().await;
            let entry = executions
                .get_mut(execution_id)
                .ok_or_else(|| AppError::not_found(format!("Execution {execution_id}")))?;
            if entry.execution.status != ExecutionStatus::Pending {
                return Ok(entry.execution.clone());
            }
            entry.execution.transition_to(ExecutionStatus::Running)?;
            entry.cancel.clone()
        };

        info!(
            execution_id = %execution_id,
            plan_id = %plan.id,
            steps = plan.steps.len(),
            "Execution started"
        );
        self.inner.events.emit(EngineEvent::ExecutionStarted {
            execution_id: execution_id.to_string(),
            plan_id: plan.id.clone(),
            total_steps: plan.steps.len(),
        });

        for (index, step) in plan.steps.iter().enumerate() {
            if token.is_cancelled() {
                debug!(execution_id = %execution_id, step_id = %step.id, "Cancellation observed");
                return self.finish(execution_id, ExecutionStatus::Cancelled).await;
            }

            let step_number = index + 1;
            self.update(execution_id, |e| e.advance_to_step(step_number))
                .await?;
            debug!(
                execution_id = %execution_id,
                step_id = %step.id,
                step_type = %step.step_type(),
                step_number,
                "Step started"
            );
            self.inner.events.emit(EngineEvent::StepStarted {
                execution_id: execution_id.to_string(),
                step_id: step.id.clone(),
                step_number,
            });

            let started = StepResult::started(execution_id, &step.id);
            let outcome = match self.inner.validator.validate(step, context).await {
                Ok(()) => self.inner.handlers.dispatch(step, context).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => {
                    let progress = self
                        .update(execution_id, |e| {
                            e.record_result(started.complete(value));
                            e.progress
                        })
                        .await?;
                    self.inner.events.emit(EngineEvent::StepCompleted {
                        execution_id: execution_id.to_string(),
                        step_id: step.id.clone(),
                        progress,
                    });
                }
                Err(err) => {
                    let message = err.to_string();
                    error!(
                        execution_id = %execution_id,
                        step_id = %step.id,
                        error = %message,
                        "Step failed"
                    );
                    let failure = StepError::step_failed(
                        message.clone(),
                        json!({
                            "stepId": step.id,
                            "stepType": step.step_type(),
                            "cause": err.kind(),
                        }),
                    );
                    self.update(execution_id, |e| e.record_result(started.fail(failure)))
                        .await?;
                    self.inner.events.emit(EngineEvent::StepFailed {
                        execution_id: execution_id.to_string(),
                        step_id: step.id.clone(),
                        error: message.clone(),
                    });

                    let report = ErrorReport::new(message, STEP_EXECUTION_FAILED)
                        .with("component", "executor")
                        .with("executionId", execution_id)
                        .with("planId", plan.id.as_str())
                        .with("stepId", step.id.as_str());
                    self.inner.recovery.handle_error(report, Severity::High).await;

                    return self.finish(execution_id, ExecutionStatus::Failed).await;
                }
            }
        }

        // A request that arrived during the last step still wins.
        if token.is_cancelled() {
            debug!(execution_id = %execution_id, "Cancellation observed after last step");
            return self.finish(execution_id, ExecutionStatus::Cancelled).await;
        }
        self.finish(execution_id, ExecutionStatus::Completed).await
    }

    /// Request cancellation.
    ///
    /// A pending execution is cancelled at once; a running one becomes
    /// cancelled once its current step finishes. Returns `false` if it already
    /// finished.
    pub async fn cancel_execution(&self, execution_id: &str) -> AppResult<bool> {
        let mut executions = self.inner.executions.write().await;
        let entry = executions
            .get_mut(execution_id)
            .ok_or_else(|| AppError::not_found(format!("Execution {execution_id}")))?;

        match entry.execution.status {
            ExecutionStatus::Pending => {
                entry.cancel.cancel();
                entry.execution.transition_to(ExecutionStatus::Cancelled)?;
                info!(execution_id = %execution_id, "Pending execution cancelled");
                Ok(true)
            }
            ExecutionStatus::Running => {
                entry.cancel.cancel();
                info!(execution_id = %execution_id, "Cancellation requested");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn get_execution(&self, execution_id: &str) -> Option<Execution> {
        self.inner
            .executions
            .read()
            .await
            .get(execution_id)
            .map(|e| e.execution.clone())
    }

    /// Every known execution, oldest first.
    pub async fn list_executions(&self) -> Vec<Execution> {
        let mut list: Vec<Execution> = self
            .inner
            .executions
            .read()
            .await
            .values()
            .map(|e| e.execution.clone())
            .collect();
        list.sort_by_key(|e| e.start_time);
        list
    }

    /// Executions not yet in a terminal state.
    pub async fn active_count(&self) -> usize {
        self.inner
            .executions
            .read()
            .await
            .values()
            .filter(|e| !e.execution.status.is_terminal())
            .count()
    }

    /// Drop finished executions from the registry. Returns how many were removed.
    pub async fn clear_finished(&self) -> usize {
        let mut executions = self.inner.executions.write().await;
        let before = executions.len();
        executions.retain(|_, e| !e.execution.status.is_terminal());
        before - executions.len()
    }

    /// Remove one finished execution. Running or pending executions stay.
    pub async fn remove_execution(&self, execution_id: &str) -> Option<Execution> {
        let mut executions = self.inner.executions.write().await;
        if !executions.get(execution_id)?.execution.status.is_terminal() {
            return None;
        }
        executions.remove(execution_id).map(|e| e.execution)
    }

    async fn update<T>(
        &self,
        execution_id: &str,
        f: impl FnOnce(&mut Execution) -> T,
    ) -> AppResult<T> {
        let mut executions = self.inner.executions.write().await;
        let entry = executions
            .get_mut(execution_id)
            .ok_or_else(|| AppError::not_found(format!("Execution {execution_id}")))?;
        Ok(f(&mut entry.execution))
    }

    async fn finish(&self, execution_id: &str, status: ExecutionStatus) -> AppResult<Execution> {
        let execution = {
            let mut executions = self.inner.executions.write().await;
            let entry = executions
                .get_mut(execution_id)
                .ok_or_else(|| AppError::not_found(format!("Execution {execution_id}")))?;
            entry.execution.transition_to(status)?;
            entry.execution.clone()
        };

        info!(
            execution_id = %execution_id,
            status = %status,
            completed_steps = execution.completed_steps(),
            total_steps = execution.total_steps,
            duration_ms = execution.duration.unwrap_or(0),
            "Execution finished"
        );
        self.inner.events.emit(EngineEvent::ExecutionFinished {
            execution_id: execution_id.to_string(),
            status,
        });
        Ok(execution)
    }
}
