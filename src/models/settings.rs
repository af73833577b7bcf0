//! Settings Models
//!
//! Engine configuration stored in config.json.

use automation_hub_core::BackoffStrategy;
use serde::{Deserialize, Serialize};

use super::requirement::RequirementPriority;

/// A queue seeded at scheduler start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueConfig {
    pub name: String,
    pub priority_class: RequirementPriority,
    pub max_concurrent: usize,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>, priority_class: RequirementPriority, max_concurrent: usize) -> Self {
        Self {
            name: name.into(),
            priority_class,
            max_concurrent,
        }
    }
}

/// The four default queues: critical(2), high(3), medium(5), low(10).
pub fn default_queues() -> Vec<QueueConfig> {
    vec![
        QueueConfig::new("critical", RequirementPriority::Critical, 2),
        QueueConfig::new("high", RequirementPriority::High, 3),
        QueueConfig::new("medium", RequirementPriority::Medium, 5),
        QueueConfig::new("low", RequirementPriority::Low, 10),
    ]
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum waiting tasks per queue before submissions are rejected
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// Base retry delay in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Retry limit for tasks submitted without an override
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
    /// Delay growth shared by scheduler retries and error recovery
    #[serde(default)]
    pub backoff: BackoffStrategy,
    /// Queues seeded at startup
    #[serde(default = "default_queues")]
    pub queues: Vec<QueueConfig>,
    /// Timeout for api_call steps, in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Number of error reports kept by the recovery log
    #[serde(default = "default_recovery_history_limit")]
    pub recovery_history_limit: usize,
}

fn default_max_queue_size() -> usize {
    100
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_recovery_history_limit() -> usize {
    200
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            retry_delay_ms: default_retry_delay_ms(),
            default_max_retries: default_max_retries(),
            backoff: BackoffStrategy::default(),
            queues: default_queues(),
            http_timeout_secs: default_http_timeout_secs(),
            log_level: default_log_level(),
            recovery_history_limit: default_recovery_history_limit(),
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub max_queue_size: Option<usize>,
    pub retry_delay_ms: Option<u64>,
    pub default_max_retries: Option<u32>,
    pub backoff: Option<BackoffStrategy>,
    pub http_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl EngineConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(size) = update.max_queue_size {
            self.max_queue_size = size;
        }
        if let Some(delay) = update.retry_delay_ms {
            self.retry_delay_ms = delay;
        }
        if let Some(retries) = update.default_max_retries {
            self.default_max_retries = retries;
        }
        if let Some(backoff) = update.backoff {
            self.backoff = backoff;
        }
        if let Some(timeout) = update.http_timeout_secs {
            self.http_timeout_secs = timeout;
        }
        if let Some(level) = update.log_level {
            self.log_level = level;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_queue_size == 0 {
            return Err("maxQueueSize must be at least 1".to_string());
        }

        if self.queues.is_empty() {
            return Err("At least one queue must be configured".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for queue in &self.queues {
            if queue.name.trim().is_empty() {
                return Err("Queue names cannot be empty".to_string());
            }
            if queue.max_concurrent == 0 {
                return Err(format!(
                    "Queue '{}' must allow at least one concurrent execution",
                    queue.name
                ));
            }
            if !seen.insert(queue.name.to_lowercase()) {
                return Err(format!("Duplicate queue name: {}", queue.name));
            }
        }

        if self.http_timeout_secs == 0 {
            return Err("httpTimeoutSecs must be at least 1".to_string());
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        Ok(())
    }
}
