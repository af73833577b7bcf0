//! Recovery Log
//!
//! `ErrorRecovery` implementation that logs each report through `tracing`,
//! keeps a bounded in-memory history and attaches the retry delay the shared
//! backoff policy would suggest for that failure's attempt number.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use automation_hub_core::{BackoffStrategy, ErrorRecovery, ErrorReport, Severity};

/// One recorded failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryRecord {
    pub report: ErrorReport,
    pub severity: Severity,
    pub recorded_at: DateTime<Utc>,
    /// How many times this failure key has been seen, this one included
    pub attempt: u32,
    /// Delay the backoff policy suggests before retrying
    pub suggested_delay_ms: u64,
}

/// Bounded, in-memory error-recovery sink.
pub struct RecoveryLog {
    history: RwLock<VecDeque<RecoveryRecord>>,
    limit: usize,
    backoff: BackoffStrategy,
    base_delay_ms: u64,
}

impl RecoveryLog {
    pub fn new(limit: usize, backoff: BackoffStrategy, base_delay_ms: u64) -> Self {
        Self {
            history: RwLock::new(VecDeque::new()),
            limit: limit.max(1),
            backoff,
            base_delay_ms,
        }
    }

    /// Recorded failures, oldest first.
    pub async fn history(&self) -> Vec<RecoveryRecord> {
        self.history.read().await.iter().cloned().collect()
    }

    /// Number of recorded failures at `severity`.
    pub async fn count(&self, severity: Severity) -> usize {
        self.history
            .read()
            .await
            .iter()
            .filter(|r| r.severity == severity)
            .count()
    }

    pub async fn clear(&self) {
        self.history.write().await.clear();
    }
}

impl Default for RecoveryLog {
    fn default() -> Self {
        Self::new(200, BackoffStrategy::default(), 5000)
    }
}

/// Failures with the same code against the same task/execution share a key.
fn failure_key(report: &ErrorReport) -> String {
    let subject = report
        .context
        .get("taskId")
        .or_else(|| report.context.get("executionId"))
        .map(String::as_str)
        .unwrap_or("");
    format!("{}:{}", report.code, subject)
}

#[async_trait]
impl ErrorRecovery for RecoveryLog {
    async fn handle_error(&self, report: ErrorReport, severity: Severity) {
        let key = failure_key(&report);
        let mut history = self.history.write().await;

        let seen = history
            .iter()
            .filter(|r| failure_key(&r.report) == key)
            .count();
        let attempt = u32::try_from(seen + 1).unwrap_or(u32::MAX);
        let suggested_delay_ms = self.backoff.delay_ms(self.base_delay_ms, attempt);

        match severity {
            Severity::Critical | Severity::High => error!(
                code = %report.code,
                severity = %severity,
                attempt,
                context = ?report.context,
                "{}",
                report.message
            ),
            Severity::Medium => warn!(code = %report.code, attempt, "{}", report.message),
            Severity::Low => info!(code = %report.code, attempt, "{}", report.message),
        }

        if history.len() >= self.limit {
            history.pop_front();
        }
        history.push_back(RecoveryRecord {
            report,
            severity,
            recorded_at: Utc::now(),
            attempt,
            suggested_delay_ms,
        });
    }
}
