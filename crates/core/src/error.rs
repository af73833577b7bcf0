//! Core Error Types
//!
//! Defines the foundational error types returned by capability providers.
//! These error types are dependency-free (only thiserror + std) to keep the core
//! crate lightweight.
//!
//! The engine crate extends these with scheduling and planning variants
//! (unknown queue, queue at capacity, circular dependency, ...).

use thiserror::Error;

/// Core error type for capability providers.
///
/// This is the minimal error set a collaborator needs. The engine crate
/// defines additional variants for queueing, planning and execution.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Browser automation errors (session, navigation, script)
    #[error("Browser error: {0}")]
    Browser(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Capability is not available in this build or environment
    #[error("Capability unavailable: {0}")]
    Unavailable(String),

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

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a browser error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an unavailable-capability error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
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

    /// Short machine-readable code for this error, used in step error details.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Config(_) => "config",
            CoreError::Io(_) => "io",
            CoreError::Serialization(_) => "serialization",
            CoreError::Browser(_) => "browser",
            CoreError::Http(_) => "http",
            CoreError::Unavailable(_) => "unavailable",
            CoreError::Validation(_) => "validation",
            CoreError::NotFound(_) => "not_found",
            CoreError::Internal(_) => "internal",
        }
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
