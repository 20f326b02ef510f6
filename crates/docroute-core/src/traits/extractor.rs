//! Text extraction collaborator.

use async_trait::async_trait;
use bytes::Bytes;

/// Format hints passed to the extractor alongside the raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionHint {
    /// Original filename.
    pub filename: String,
    /// Lowercase suffix including the dot, e.g. `".pdf"`.
    pub suffix: String,
    /// Content type supplied by the producer, if any.
    pub content_type: Option<String>,
}

/// Error returned by a [`TextExtractor`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractError {
    /// The extractor does not handle this format.
    #[error("unsupported format: {0}")]
    Unsupported(String),
    /// Extraction ran but failed.
    #[error("extraction failed: {0}")]
    Failed(String),
    /// Extraction did not finish in time.
    #[error("extraction timed out")]
    Timeout,
}

/// Converts raw document bytes into plain text. Format detection and OCR
/// fallback are the implementation's concern.
#[async_trait]
pub trait TextExtractor: Send + Sync + std::fmt::Debug {
    /// Extract plain text from `bytes`.
    async fn extract(&self, bytes: Bytes, hint: &ExtractionHint) -> Result<String, ExtractError>;
}
