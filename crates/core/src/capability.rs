//! Capability Provider Traits
//!
//! The task engine never talks to a browser, a disk, a network or an analyzer
//! directly. Step handlers go through these traits, which keeps the engine
//! testable with in-memory doubles and lets hosts plug in their own backends.
//!
//! - `BrowserCapability` - remote-debugging browser sessions
//! - `FileSystemCapability` - read/write/delete/list
//! - `CodeAnalysisCapability` - static project structure analysis
//! - `HttpCapability` - generic request/response calls
//! - `ErrorRecovery` - sink for failures the engine cannot handle itself

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreResult;

// ============================================================================
// Browser
// ============================================================================

/// Options used when opening a browser session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    /// Run without a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Viewport width in pixels
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    /// Viewport height in pixels
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

fn default_headless() -> bool {
    true
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    720
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

/// Summary of an open browser session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserSession {
    /// Session identifier
    pub id: String,
    /// URL of the current page, if any
    pub current_url: Option<String>,
}

/// Browser automation driven over a remote-debugging protocol.
#[async_trait]
pub trait BrowserCapability: Send + Sync {
    /// Open a new session and return its id.
    async fn create_session(&self, options: SessionOptions) -> CoreResult<String>;

    /// Navigate the session's page to `url`.
    async fn navigate_to(&self, session_id: &str, url: &str) -> CoreResult<()>;

    /// Evaluate a script in the page and return its JSON result.
    async fn run_script(&self, session_id: &str, script: &str) -> CoreResult<Value>;

    /// Capture the page as PNG bytes.
    async fn take_screenshot(&self, session_id: &str, full_page: bool) -> CoreResult<Vec<u8>>;

    /// Close the session. Closing an unknown session is an error.
    async fn close_session(&self, session_id: &str) -> CoreResult<()>;

    /// List currently open sessions.
    async fn list_sessions(&self) -> CoreResult<Vec<BrowserSession>>;
}

// ============================================================================
// Filesystem
// ============================================================================

/// A single directory entry returned by `list_directory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    /// Entry file name
    pub name: String,
    /// Full path of the entry
    pub path: PathBuf,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Size in bytes (0 for directories)
    pub size: u64,
}

/// Filesystem access used by file-operation steps and step validation.
#[async_trait]
pub trait FileSystemCapability: Send + Sync {
    /// Read a UTF-8 file.
    async fn read_file(&self, path: &Path) -> CoreResult<String>;

    /// Write (create or truncate) a file, creating parent directories.
    async fn write_file(&self, path: &Path, content: &str) -> CoreResult<()>;

    /// Delete a file.
    async fn delete_file(&self, path: &Path) -> CoreResult<()>;

    /// List the immediate children of a directory.
    async fn list_directory(&self, path: &Path) -> CoreResult<Vec<DirEntry>>;

    /// Whether `path` exists and is a directory.
    ///
    /// The default implementation treats a successful listing as existence.
    async fn directory_exists(&self, path: &Path) -> bool {
        self.list_directory(path).await.is_ok()
    }
}

// ============================================================================
// Code analysis
// ============================================================================

/// Structural summary of a project tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureReport {
    /// Analyzed root
    pub project_path: PathBuf,
    /// Number of files visited
    pub total_files: usize,
    /// Number of directories visited (root excluded)
    pub total_directories: usize,
    /// Total line count across text files
    pub total_lines: usize,
    /// File count keyed by lowercase extension ("" for none)
    pub files_by_extension: HashMap<String, usize>,
    /// Build manifests found at any depth (e.g. `Cargo.toml`)
    pub manifests: Vec<PathBuf>,
}

/// Static project/code analysis.
#[async_trait]
pub trait CodeAnalysisCapability: Send + Sync {
    /// Analyze the structure of the project rooted at `project_path`.
    async fn analyze_structure(&self, project_path: &Path) -> CoreResult<StructureReport>;
}

// ============================================================================
// HTTP
// ============================================================================

/// Outbound HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    /// HTTP method (GET, POST, ...)
    pub method: String,
    /// Absolute URL
    pub url: String,
    /// Request headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Optional JSON body
    #[serde(default)]
    pub body: Option<Value>,
}

/// Response to an `HttpRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Body, parsed as JSON when possible, otherwise a JSON string
    pub body: Value,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Generic HTTP call capability.
#[async_trait]
pub trait HttpCapability: Send + Sync {
    /// Send a request and return the response, whatever its status.
    async fn call(&self, request: HttpRequest) -> CoreResult<HttpResponse>;
}

// ============================================================================
// Error recovery
// ============================================================================

/// Severity attached to a reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A failure forwarded to the recovery collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Human-readable message
    pub message: String,
    /// Machine-readable code (e.g. `STEP_EXECUTION_FAILED`)
    pub code: String,
    /// Where the failure happened: component, task id, step id, ...
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorReport {
    /// Create a report with an empty context.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            context: HashMap::new(),
        }
    }

    /// Attach a context entry.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Recovery bookkeeping for terminal and initialization failures.
#[async_trait]
pub trait ErrorRecovery: Send + Sync {
    /// Record a failure. Implementations must not fail; recovery is best-effort.
    async fn handle_error(&self, report: ErrorReport, severity: Severity);
}
