//! Text extraction configuration.

use serde::{Deserialize, Serialize};

/// Settings for the text extraction collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// URL of an extraction service accepting raw bytes. When unset only
    /// plain-text formats can be extracted.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Timeout in seconds for one extraction request.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    120
}
