//! Local Capability Providers
//!
//! Default implementations of the capability traits the step handlers consume,
//! plus `Capabilities`, the bundle an executor is built from.

pub mod analysis;
pub mod browser;
pub mod filesystem;
pub mod http;
pub mod recovery;

use std::sync::Arc;
use std::time::Duration;

use automation_hub_core::{
    BrowserCapability, CodeAnalysisCapability, ErrorRecovery, FileSystemCapability,
    HttpCapability,
};

use crate::models::EngineConfig;
use crate::utils::error::AppResult;

pub use analysis::StructureAnalyzer;
#[cfg(feature = "browser")]
pub use browser::CdpBrowser;
pub use browser::DisabledBrowser;
pub use filesystem::LocalFileSystem;
pub use http::HttpClient;
pub use recovery::{RecoveryLog, RecoveryRecord};

/// The providers a step handler may call.
#[derive(Clone)]
pub struct Capabilities {
    pub browser: Arc<dyn BrowserCapability>,
    pub file_system: Arc<dyn FileSystemCapability>,
    pub code_analysis: Arc<dyn CodeAnalysisCapability>,
    pub http: Arc<dyn HttpCapability>,
    pub recovery: Arc<dyn ErrorRecovery>,
}

impl Capabilities {
    /// Local providers configured from `config`.
    ///
    /// With the `browser` feature the browser is Chromium; otherwise it is disabled.
    pub fn local(config: &EngineConfig) -> AppResult<Self> {
        let http = HttpClient::new(Duration::from_secs(config.http_timeout_secs))?;
        Ok(Self {
            browser: default_browser(),
            file_system: Arc::new(LocalFileSystem::new()),
            code_analysis: Arc::new(StructureAnalyzer::new()),
            http: Arc::new(http),
            recovery: Arc::new(RecoveryLog::new(
                config.recovery_history_limit,
                config.backoff,
                config.retry_delay_ms,
            )),
        })
    }

    /// Local providers with default settings and an unconfigured HTTP client.
    pub fn local_defaults() -> Self {
        Self {
            browser: Arc::new(DisabledBrowser),
            file_system: Arc::new(LocalFileSystem::new()),
            code_analysis: Arc::new(StructureAnalyzer::new()),
            http: Arc::new(HttpClient::with_client(reqwest::Client::new())),
            recovery: Arc::new(RecoveryLog::default()),
        }
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserCapability>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_file_system(mut self, file_system: Arc<dyn FileSystemCapability>) -> Self {
        self.file_system = file_system;
        self
    }

    pub fn with_code_analysis(mut self, code_analysis: Arc<dyn CodeAnalysisCapability>) -> Self {
        self.code_analysis = code_analysis;
        self
    }

    pub fn with_http(mut self, http: Arc<dyn HttpCapability>) -> Self {
        self.http = http;
        self
    }

    pub fn with_recovery(mut self, recovery: Arc<dyn ErrorRecovery>) -> Self {
        self.recovery = recovery;
        self
    }
}

#[cfg(feature = "browser")]
fn default_browser() -> Arc<dyn BrowserCapability> {
    Arc::new(CdpBrowser::new())
}

#[cfg(not(feature = "browser"))]
fn default_browser() -> Arc<dyn BrowserCapability> {
    Arc::new(DisabledBrowser)
}
