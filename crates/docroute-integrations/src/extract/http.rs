//! Extraction through an external service.
//!
//! The service receives the raw bytes in the request body with the filename
//! and content type in headers, and answers `{"text": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use docroute_core::error::{AppError, ErrorKind};
use docroute_core::result::AppResult;
use docroute_core::traits::{ExtractError, ExtractionHint, TextExtractor};

#[derive(Debug, Deserialize)]
struct ExtractionResponse {
    #[serde(default)]
    text: String,
}

/// Posts documents to an extraction service.
#[derive(Debug, Clone)]
pub struct HttpTextExtractor {
    client: Client,
    endpoint: String,
}

impl HttpTextExtractor {
    /// Create an extractor for the given endpoint.
    pub fn new(endpoint: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
        })?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl TextExtractor for HttpTextExtractor {
    async fn extract(&self, bytes: Bytes, hint: &ExtractionHint) -> Result<String, ExtractError> {
        let content_type = hint
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let size = bytes.len();

        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", content_type)
            .header("x-filename", hint.filename.as_str())
            .header("x-file-suffix", hint.suffix.as_str())
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractError::Timeout
                } else {
                    ExtractError::Failed(e.to_string())
                }
            })?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::UNSUPPORTED_MEDIA_TYPE => {
                return Err(ExtractError::Unsupported(hint.filename.clone()));
            }
            s => return Err(ExtractError::Failed(format!("extraction service returned {s}"))),
        }

        let parsed: ExtractionResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Failed(format!("invalid extraction response: {e}")))?;
        debug!(filename = %hint.filename, bytes = size, chars = parsed.text.len(), "Extracted text");
        Ok(parsed.text)
    }
}
