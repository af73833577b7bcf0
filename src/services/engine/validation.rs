//! Step Validation
//!
//! Pre-dispatch checks for a plan step. A step that fails validation never
//! reaches its handler; the executor records it as a failed step like any
//! handler error.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use automation_hub_core::{BrowserCapability, FileSystemCapability};

use crate::models::{Context, Environment, PlanStep};
use crate::utils::error::{AppError, AppResult};

/// Checks a step's `ValidationRules` against its parameters and the context.
#[derive(Clone)]
pub struct StepValidator {
    file_system: Arc<dyn FileSystemCapability>,
    browser: Arc<dyn BrowserCapability>,
}

impl StepValidator {
    pub fn new(
        file_system: Arc<dyn FileSystemCapability>,
        browser: Arc<dyn BrowserCapability>,
    ) -> Self {
        Self {
            file_system,
            browser,
        }
    }

    /// Validate `step` against `context`. Returns the first violated rule.
    pub async fn validate(&self, step: &PlanStep, context: &Context) -> AppResult<()> {
        let rules = &step.validation_rules;

        if context.environment == Environment::Production && !rules.production_safe {
            return Err(AppError::ProductionSafety(format!(
                "Step '{}' is not marked production safe",
                step.id
            )));
        }

        let params = step.kind.parameters();
        for field in &rules.required_fields {
            let present = params.get(field).is_some_and(|v| !is_empty(v));
            if !present {
                return Err(AppError::MissingField(format!("{}.{}", step.id, field)));
            }
        }

        if rules.project_path_exists
            && !self.file_system.directory_exists(&context.project_path).await
        {
            return Err(AppError::not_found(format!(
                "Project path does not exist: {}",
                context.project_path.display()
            )));
        }

        if let Some(dir) = &rules.directory_exists {
            let resolved = resolve(&context.project_path, dir);
            if !self.file_system.directory_exists(&resolved).await {
                return Err(AppError::not_found(format!(
                    "Directory does not exist: {}",
                    resolved.display()
                )));
            }
        }

        if rules.browser_available {
            let sessions = self.browser.list_sessions().await?;
            if sessions.is_empty() {
                return Err(AppError::validation(format!(
                    "Step '{}' requires an open browser session",
                    step.id
                )));
            }
        }

        Ok(())
    }
}

/// Resolve `path` against `root` unless it is already absolute.
pub fn resolve(root: &Path, path: &Path) -> std::path::PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
