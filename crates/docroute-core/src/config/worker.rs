//! Worker loop configuration.

use serde::{Deserialize, Serialize};

use super::retry::{BackoffConfig, RetryConfig};

/// Worker loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker loop is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds to sleep when no job is eligible (or the store is down).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Maximum number of jobs claimed and processed per cycle.
    #[serde(default = "default_jobs_per_cycle")]
    pub jobs_per_cycle: usize,
    /// Seconds to wait for in-flight jobs on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
    /// Retry policy for progress and terminal writes to the job store.
    #[serde(default = "default_store_retry")]
    pub store_retry: RetryConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            poll_interval_seconds: default_poll_interval(),
            jobs_per_cycle: default_jobs_per_cycle(),
            shutdown_grace_seconds: default_shutdown_grace(),
            store_retry: default_store_retry(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    5
}

fn default_jobs_per_cycle() -> usize {
    3
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_store_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        backoff: BackoffConfig::Exponential {
            initial_delay_ms: 200,
            max_delay_ms: 2_000,
        },
    }
}
