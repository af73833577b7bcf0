//! Backoff Strategy
//!
//! A single delay policy shared by the scheduler's retry path and the
//! error-recovery collaborator, so both agree on how long a retry waits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound on any computed delay (one hour).
pub const MAX_BACKOFF_MS: u64 = 60 * 60 * 1000;

/// How the delay grows with the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Always `base`
    Fixed,
    /// `base * attempt`
    #[default]
    Linear,
    /// `base * 2^(attempt - 1)`
    Exponential,
}

impl BackoffStrategy {
    /// Delay in milliseconds before retry number `attempt` (1-based).
    ///
    /// Attempt 0 yields no delay. Results saturate at [`MAX_BACKOFF_MS`].
    pub fn delay_ms(&self, base_ms: u64, attempt: u32) -> u64 {
        if attempt == 0 {
            return 0;
        }
        let raw = match self {
            BackoffStrategy::Fixed => base_ms,
            BackoffStrategy::Linear => base_ms.saturating_mul(u64::from(attempt)),
            BackoffStrategy::Exponential => {
                let factor = 2u64.checked_pow(attempt - 1).unwrap_or(u64::MAX);
                base_ms.saturating_mul(factor)
            }
        };
        raw.min(MAX_BACKOFF_MS)
    }

    /// Same as [`delay_ms`](Self::delay_ms) as a `Duration`.
    pub fn delay(&self, base_ms: u64, attempt: u32) -> Duration {
        Duration::from_millis(self.delay_ms(base_ms, attempt))
    }
}

impl std::fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackoffStrategy::Fixed => write!(f, "fixed"),
            BackoffStrategy::Linear => write!(f, "linear"),
            BackoffStrategy::Exponential => write!(f, "exponential"),
        }
    }
}
