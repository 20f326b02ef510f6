//! Retry policy configuration shared by the store, fetch, and
//! classifier call sites.

use serde::{Deserialize, Serialize};

/// Bounded retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay strategy between attempts.
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffConfig::None,
        }
    }
}

/// Delay between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum BackoffConfig {
    /// Retry immediately.
    #[default]
    None,
    /// Wait the same delay before every retry.
    Fixed {
        /// Delay in milliseconds.
        delay_ms: u64,
    },
    /// Double the delay after every retry, capped at `max_delay_ms`.
    Exponential {
        /// Delay before the first retry, in milliseconds.
        initial_delay_ms: u64,
        /// Upper bound for any single delay, in milliseconds.
        max_delay_ms: u64,
    },
}

fn default_max_attempts() -> u32 {
    3
}
