//! Error Handling
//!
//! Unified error types for the engine.
//! Uses thiserror for ergonomic error definitions.

use automation_hub_core::CoreError;
use thiserror::Error;

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// A step type has no registered handler
    #[error("Unknown step type: {0}")]
    UnknownStepType(String),

    /// Queue id does not exist
    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    /// Queue already holds the configured maximum number of waiting tasks
    #[error("Queue '{queue_id}' is at capacity ({max_size} queued tasks)")]
    QueueFull { queue_id: String, max_size: usize },

    /// Required requirement or step field is missing or blank
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// The step dependency graph contains a cycle
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    /// A step would run against production without being marked safe
    #[error("Production safety violation: {0}")]
    ProductionSafety(String),

    /// Errors raised by capability providers
    #[error(transparent)]
    Capability(#[from] CoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for engine errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a missing-field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    /// Short machine-readable kind, carried in step error details.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::UnknownStepType(_) => "unknown_step_type",
            AppError::UnknownQueue(_) => "unknown_queue",
            AppError::QueueFull { .. } => "queue_full",
            AppError::MissingField(_) => "missing_field",
            AppError::CircularDependency(_) => "circular_dependency",
            AppError::ProductionSafety(_) => "production_safety",
            AppError::Capability(e) => e.code(),
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Serialization(_) => "serialization",
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal",
        }
    }
}

/// Convert AppError to a string suitable for tool-layer responses
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
