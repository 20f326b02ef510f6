//! Object storage configuration.

use serde::{Deserialize, Serialize};

/// Object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Provider type: `"local"` or `"http"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Root directory for the local provider.
    #[serde(default = "default_local_root")]
    pub local_root: String,
    /// Settings for the HTTP object storage provider.
    #[serde(default)]
    pub http: HttpStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            local_root: default_local_root(),
            http: HttpStorageConfig::default(),
        }
    }
}

/// HTTP object storage (`{base_url}/object/{bucket}/{path}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpStorageConfig {
    /// Storage API base URL, e.g. `https://<project>.example.co/storage/v1`.
    #[serde(default)]
    pub base_url: String,
    /// Bucket holding uploaded job files.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Service key sent as a bearer token.
    #[serde(default)]
    pub api_key: String,
}

impl Default for HttpStorageConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            bucket: default_bucket(),
            api_key: String::new(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}

fn default_local_root() -> String {
    "./data/storage".to_string()
}

fn default_bucket() -> String {
    "inbox-files".to_string()
}
