//! Provider selection from configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use docroute_core::config::StorageConfig;
use docroute_core::error::AppError;
use docroute_core::result::AppResult;
use docroute_core::traits::StorageProvider;

use crate::providers::{HttpStorageProvider, LocalStorageProvider};

/// Build the provider named by `storage.provider`.
pub async fn build_provider(
    config: &StorageConfig,
    request_timeout: Duration,
) -> AppResult<Arc<dyn StorageProvider>> {
    let provider: Arc<dyn StorageProvider> = match config.provider.as_str() {
        "local" => Arc::new(LocalStorageProvider::new(&config.local_root).await?),
        "http" => Arc::new(HttpStorageProvider::new(&config.http, request_timeout)?),
        other => {
            return Err(AppError::configuration(format!(
                "Unknown storage provider '{other}' (expected 'local' or 'http')"
            )));
        }
    };
    info!(provider = provider.provider_type(), "Storage provider ready");
    Ok(provider)
}
