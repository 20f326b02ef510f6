//! Classification service configuration.

use serde::{Deserialize, Serialize};

use super::retry::RetryConfig;

/// Settings for the OpenAI-compatible classification service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Base URL of the chat-completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key sent as a bearer token.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Timeout in seconds for a single classification attempt.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Retry policy around each classification call.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            request_timeout_seconds: default_request_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_request_timeout() -> u64 {
    120
}
