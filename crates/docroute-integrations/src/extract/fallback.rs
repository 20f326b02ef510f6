//! Service extraction with a plain-text fallback.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use docroute_core::traits::{ExtractError, ExtractionHint, TextExtractor};

use super::plain::PlainTextExtractor;

/// Tries the primary extractor, then reads text formats directly.
#[derive(Debug)]
pub struct FallbackExtractor {
    primary: Option<Box<dyn TextExtractor>>,
    plain: PlainTextExtractor,
}

impl FallbackExtractor {
    /// Wrap an optional primary extractor.
    pub fn new(primary: Option<Box<dyn TextExtractor>>) -> Self {
        Self {
            primary,
            plain: PlainTextExtractor,
        }
    }
}

#[async_trait]
impl TextExtractor for FallbackExtractor {
    async fn extract(&self, bytes: Bytes, hint: &ExtractionHint) -> Result<String, ExtractError> {
        let Some(primary) = &self.primary else {
            return self.plain.extract(bytes, hint).await;
        };
        match primary.extract(bytes.clone(), hint).await {
            Ok(text) => Ok(text),
            Err(err) if PlainTextExtractor::supports(hint) => {
                warn!(filename = %hint.filename, error = %err, "Extraction service failed, reading as text");
                self.plain.extract(bytes, hint).await
            }
            Err(err) => Err(err),
        }
    }
}
