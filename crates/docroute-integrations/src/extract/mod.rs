//! Text extractor implementations.

pub mod fallback;
pub mod http;
pub mod plain;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use docroute_core::config::ExtractorConfig;
use docroute_core::result::AppResult;
use docroute_core::traits::TextExtractor;

pub use fallback::FallbackExtractor;
pub use http::HttpTextExtractor;
pub use plain::PlainTextExtractor;

/// Build the extractor chain from configuration.
///
/// With an endpoint the extraction service handles every format and plain
/// text is the fallback; without one only text formats are supported.
pub fn build_extractor(config: &ExtractorConfig) -> AppResult<Arc<dyn TextExtractor>> {
    let primary = match config.endpoint.as_deref().map(str::trim) {
        Some(endpoint) if !endpoint.is_empty() => {
            info!(endpoint, "Using extraction service");
            Some(Box::new(HttpTextExtractor::new(
                endpoint,
                Duration::from_secs(config.timeout_seconds),
            )?) as Box<dyn TextExtractor>)
        }
        _ => {
            info!("No extraction service configured, only text formats are supported");
            None
        }
    };
    Ok(Arc::new(FallbackExtractor::new(primary)))
}
