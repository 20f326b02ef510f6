//! Per-file processing configuration.

use serde::{Deserialize, Serialize};

use super::retry::{BackoffConfig, RetryConfig};

/// A concurrency step: jobs with at most `max_files` files use
/// `concurrency` parallel file tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyTier {
    /// Upper bound (inclusive) on the job's file count for this tier.
    pub max_files: usize,
    /// Concurrency ceiling for jobs in this tier.
    pub concurrency: usize,
}

/// Per-file processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Concurrency tiers, checked in ascending `max_files` order.
    #[serde(default = "default_tiers")]
    pub concurrency_tiers: Vec<ConcurrencyTier>,
    /// Hard cap used above the last tier and to clamp every tier.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Timeout in seconds for fetching one file's bytes.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    /// Retry policy for fetching file bytes.
    #[serde(default = "default_fetch_retry")]
    pub fetch_retry: RetryConfig,
    /// Number of extracted-text characters echoed into analyze outcomes.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrency_tiers: default_tiers(),
            max_concurrency: default_max_concurrency(),
            fetch_timeout_seconds: default_fetch_timeout(),
            fetch_retry: default_fetch_retry(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

fn default_tiers() -> Vec<ConcurrencyTier> {
    vec![
        ConcurrencyTier {
            max_files: 10,
            concurrency: 5,
        },
        ConcurrencyTier {
            max_files: 20,
            concurrency: 8,
        },
    ]
}

fn default_max_concurrency() -> usize {
    12
}

fn default_fetch_timeout() -> u64 {
    120
}

fn default_fetch_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 2,
        backoff: BackoffConfig::Fixed { delay_ms: 500 },
    }
}

fn default_excerpt_chars() -> usize {
    1000
}
