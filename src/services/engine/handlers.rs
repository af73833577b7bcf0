//! Step Handlers
//!
//! One handler per step type, each a thin adapter from a typed `StepKind` to a
//! capability provider. `custom` steps can additionally be routed to named
//! handlers registered at runtime; an unknown name falls back to echoing the
//! step's parameters.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use automation_hub_core::{
    BrowserCapability, CodeAnalysisCapability, CoreError, FileSystemCapability, HttpCapability,
    HttpRequest, SessionOptions,
};

use crate::models::{BrowserMode, Context, FileOp, PlanStep, StepKind, StepType};
use crate::services::capabilities::Capabilities;
use crate::utils::error::{AppError, AppResult};

use super::validation::resolve;

/// Executes one kind of plan step.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Run `step` and return its JSON result.
    async fn handle(&self, step: &PlanStep, context: &Context) -> AppResult<Value>;
}

fn kind_mismatch(step: &PlanStep, expected: StepType) -> AppError {
    AppError::internal(format!(
        "Step '{}' of type {} routed to the {} handler",
        step.id,
        step.step_type(),
        expected
    ))
}

// ============================================================================
// Code analysis
// ============================================================================

pub struct CodeAnalysisHandler {
    analyzer: Arc<dyn CodeAnalysisCapability>,
}

impl CodeAnalysisHandler {
    pub fn new(analyzer: Arc<dyn CodeAnalysisCapability>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl StepHandler for CodeAnalysisHandler {
    async fn handle(&self, step: &PlanStep, context: &Context) -> AppResult<Value> {
        let StepKind::CodeAnalysis { project_path } = &step.kind else {
            return Err(kind_mismatch(step, StepType::CodeAnalysis));
        };
        let path = resolve(&context.project_path, project_path);
        let report = self.analyzer.analyze_structure(&path).await?;
        Ok(serde_json::to_value(report)?)
    }
}

// ============================================================================
// Browser testing
// ============================================================================

pub struct BrowserTestingHandler {
    browser: Arc<dyn BrowserCapability>,
}

impl BrowserTestingHandler {
    pub fn new(browser: Arc<dyn BrowserCapability>) -> Self {
        Self { browser }
    }

    async fn drive(&self, session_id: &str, url: &str, mode: &BrowserMode) -> AppResult<Value> {
        self.browser.navigate_to(session_id, url).await?;
        match mode {
            BrowserMode::Script { script } => {
                let result = self.browser.run_script(session_id, script).await?;
                Ok(json!({
                    "sessionId": session_id,
                    "url": url,
                    "mode": "script",
                    "result": result,
                }))
            }
            BrowserMode::Screenshot { full_page } => {
                let image = self.browser.take_screenshot(session_id, *full_page).await?;
                Ok(json!({
                    "sessionId": session_id,
                    "url": url,
                    "mode": "screenshot",
                    "fullPage": full_page,
                    "bytes": image.len(),
                }))
            }
        }
    }
}

#[async_trait]
impl StepHandler for BrowserTestingHandler {
    async fn handle(&self, step: &PlanStep, _context: &Context) -> AppResult<Value> {
        let StepKind::BrowserTesting { url, mode } = &step.kind else {
            return Err(kind_mismatch(step, StepType::BrowserTesting));
        };

        let session_id = self.browser.create_session(SessionOptions::default()).await?;
        let outcome = self.drive(&session_id, url, mode).await;

        // The session is closed whatever the outcome.
        if let Err(e) = self.browser.close_session(&session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to close browser session");
        }
        outcome
    }
}

// ============================================================================
// File operations
// ============================================================================

pub struct FileOperationHandler {
    file_system: Arc<dyn FileSystemCapability>,
}

impl FileOperationHandler {
    pub fn new(file_system: Arc<dyn FileSystemCapability>) -> Self {
        Self { file_system }
    }

    async fn apply(&self, op: &FileOp, context: &Context) -> AppResult<Value> {
        let path = resolve(&context.project_path, op.path());
        let output = match op {
            FileOp::Read { .. } => {
                let content = self.file_system.read_file(&path).await?;
                json!({ "op": op.name(), "path": path, "content": content })
            }
            FileOp::Write { content, .. } => {
                self.file_system.write_file(&path, content).await?;
                json!({ "op": op.name(), "path": path, "bytes": content.len() })
            }
            FileOp::Delete { .. } => {
                self.file_system.delete_file(&path).await?;
                json!({ "op": op.name(), "path": path })
            }
            FileOp::List { .. } => {
                let entries = self.file_system.list_directory(&path).await?;
                json!({ "op": op.name(), "path": path, "entries": entries })
            }
        };
        Ok(output)
    }
}

#[async_trait]
impl StepHandler for FileOperationHandler {
    async fn handle(&self, step: &PlanStep, context: &Context) -> AppResult<Value> {
        let StepKind::FileOperation { operations } = &step.kind else {
            return Err(kind_mismatch(step, StepType::FileOperation));
        };

        // Sequential; the first failing sub-operation fails the step.
        let mut outputs = Vec::with_capacity(operations.len());
        for op in operations {
            debug!(step_id = %step.id, op = op.name(), path = %op.path().display(), "File operation");
            outputs.push(self.apply(op, context).await?);
        }
        Ok(json!({ "operations": outputs }))
    }
}

// ============================================================================
// API call
// ============================================================================

pub struct ApiCallHandler {
    http: Arc<dyn HttpCapability>,
}

impl ApiCallHandler {
    pub fn new(http: Arc<dyn HttpCapability>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl StepHandler for ApiCallHandler {
    async fn handle(&self, step: &PlanStep, _context: &Context) -> AppResult<Value> {
        let StepKind::ApiCall {
            method,
            url,
            headers,
            body,
        } = &step.kind
        else {
            return Err(kind_mismatch(step, StepType::ApiCall));
        };

        let response = self
            .http
            .call(HttpRequest {
                method: method.clone(),
                url: url.clone(),
                headers: headers.clone(),
                body: body.clone(),
            })
            .await?;

        if !response.is_success() {
            return Err(CoreError::http(format!(
                "{} {} returned status {}",
                method, url, response.status
            ))
            .into());
        }
        Ok(json!({ "status": response.status, "body": response.body }))
    }
}

// ============================================================================
// Custom
// ============================================================================

/// Fallback for `custom` steps without a registered handler.
pub struct EchoHandler;

#[async_trait]
impl StepHandler for EchoHandler {
    async fn handle(&self, step: &PlanStep, _context: &Context) -> AppResult<Value> {
        let StepKind::Custom {
            handler,
            parameters,
        } = &step.kind
        else {
            return Err(kind_mismatch(step, StepType::Custom));
        };
        Ok(json!({ "handler": handler, "parameters": parameters }))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Handler lookup by step type, plus named `custom` handlers.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<StepType, Arc<dyn StepHandler>>,
    custom: HashMap<String, Arc<dyn StepHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in handler for every step type.
    pub fn with_capabilities(capabilities: &Capabilities) -> Self {
        let mut registry = Self::new();
        registry.register(
            StepType::CodeAnalysis,
            Arc::new(CodeAnalysisHandler::new(capabilities.code_analysis.clone())),
        );
        registry.register(
            StepType::BrowserTesting,
            Arc::new(BrowserTestingHandler::new(capabilities.browser.clone())),
        );
        registry.register(
            StepType::FileOperation,
            Arc::new(FileOperationHandler::new(capabilities.file_system.clone())),
        );
        registry.register(
            StepType::ApiCall,
            Arc::new(ApiCallHandler::new(capabilities.http.clone())),
        );
        registry.register(StepType::Custom, Arc::new(EchoHandler));
        registry
    }

    /// Register (or replace) the handler for a step type.
    pub fn register(&mut self, step_type: StepType, handler: Arc<dyn StepHandler>) {
        self.handlers.insert(step_type, handler);
    }

    /// Register a named handler for `custom` steps.
    pub fn register_custom(&mut self, name: impl Into<String>, handler: Arc<dyn StepHandler>) {
        self.custom.insert(name.into(), handler);
    }

    /// Resolve the handler for a step.
    pub fn resolve(&self, step: &PlanStep) -> AppResult<Arc<dyn StepHandler>> {
        if let StepKind::Custom { handler, .. } = &step.kind {
            if let Some(named) = self.custom.get(handler) {
                return Ok(named.clone());
            }
        }
        self.handlers
            .get(&step.step_type())
            .cloned()
            .ok_or_else(|| AppError::UnknownStepType(step.step_type().to_string()))
    }

    /// Resolve and run the handler for a step.
    pub async fn dispatch(&self, step: &PlanStep, context: &Context) -> AppResult<Value> {
        let handler = self.resolve(step)?;
        handler.handle(step, context).await
    }
}
