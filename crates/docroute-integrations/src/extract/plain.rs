//! UTF-8 text formats.

use async_trait::async_trait;
use bytes::Bytes;

use docroute_core::traits::{ExtractError, ExtractionHint, TextExtractor};

const TEXT_SUFFIXES: &[&str] = &[
    ".txt", ".text", ".md", ".markdown", ".csv", ".tsv", ".json", ".xml", ".html", ".htm",
    ".eml", ".log",
];

/// Reads documents that already are text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    /// Whether the hint names a text format.
    pub fn supports(hint: &ExtractionHint) -> bool {
        TEXT_SUFFIXES.contains(&hint.suffix.as_str())
            || hint
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.starts_with("text/") || ct == "application/json")
    }
}

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, bytes: Bytes, hint: &ExtractionHint) -> Result<String, ExtractError> {
        if !Self::supports(hint) {
            return Err(ExtractError::Unsupported(format!(
                "{} ({})",
                hint.filename,
                if hint.suffix.is_empty() { "no suffix" } else { &hint.suffix }
            )));
        }
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes[..]);
        let text = String::from_utf8_lossy(bytes).replace('\0', "");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(suffix: &str, content_type: Option<&str>) -> ExtractionHint {
        ExtractionHint {
            filename: format!("doc{suffix}"),
            suffix: suffix.into(),
            content_type: content_type.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_reads_text_and_strips_bom() {
        let text = PlainTextExtractor
            .extract(Bytes::from_static(b"\xEF\xBB\xBFReminder: pay"), &hint(".txt", None))
            .await
            .unwrap();
        assert_eq!(text, "Reminder: pay");
    }

    #[tokio::test]
    async fn test_content_type_enables_unknown_suffix() {
        let text = PlainTextExtractor
            .extract(Bytes::from_static(b"hello"), &hint("", Some("text/plain")))
            .await
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_binary_formats_unsupported() {
        let err = PlainTextExtractor
            .extract(Bytes::from_static(b"%PDF-1.7"), &hint(".pdf", Some("application/pdf")))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(_)));
    }
}
