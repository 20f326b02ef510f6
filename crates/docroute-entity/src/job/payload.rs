//! Raw file payload representations as they are persisted.
//!
//! Three generations of producers wrote file data in different shapes. All of
//! them stay readable; the worker's resolver decides which one applies.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Nesting depth of JSON-string encodings accepted by [`decode_embedded`].
const MAX_ENCODING_DEPTH: usize = 3;

/// The three payload columns of a job record, untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilePayload {
    /// Current structured list (`file_storage_urls`).
    pub structured: Option<Value>,
    /// Legacy flat list of references (`file_urls`).
    pub references: Option<Vec<String>>,
    /// Oldest inline format (`file_data`).
    pub inline: Option<Value>,
}

impl FilePayload {
    /// Payload holding only a structured list.
    pub fn from_structured(entries: &[StoredFileEntry]) -> Result<Self, serde_json::Error> {
        Ok(Self {
            structured: Some(serde_json::to_value(entries)?),
            ..Self::default()
        })
    }

    /// Payload holding only inline file data.
    pub fn from_inline(entries: &[InlineFileEntry]) -> Result<Self, serde_json::Error> {
        Ok(Self {
            inline: Some(serde_json::to_value(entries)?),
            ..Self::default()
        })
    }

    /// Payload holding only a flat reference list.
    pub fn from_references(references: Vec<String>) -> Self {
        Self {
            references: Some(references),
            ..Self::default()
        }
    }

    /// Whether every representation is absent.
    pub fn is_absent(&self) -> bool {
        self.structured.as_ref().is_none_or(Value::is_null)
            && self.references.is_none()
            && self.inline.as_ref().is_none_or(Value::is_null)
    }
}

/// One entry of the current structured representation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFileEntry {
    /// Original filename.
    #[serde(default)]
    pub filename: String,
    /// Path inside the storage bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Full URL, written by some producers instead of a path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,
    /// Size in bytes.
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: Option<u64>,
    /// File suffix including the dot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// MIME type hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl StoredFileEntry {
    /// The reference to fetch, preferring the storage path.
    pub fn reference(&self) -> Option<&str> {
        self.file_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .or(self.storage_url.as_deref())
    }
}

/// One entry of the oldest inline representation.
///
/// Older producers wrote these rows with a storage path and no bytes, so
/// `content` and `file_path` are both optional; at least one must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineFileEntry {
    /// Original filename.
    #[serde(default)]
    pub filename: String,
    /// File bytes, base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Path inside the storage bucket, for rows written without bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Size in bytes.
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: Option<u64>,
    /// File suffix including the dot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// MIME type hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Decode a JSON value that may hold its payload directly or as a JSON
/// string, possibly encoded more than once.
pub fn decode_embedded<T: DeserializeOwned>(value: &Value) -> Result<T, serde_json::Error> {
    let mut current = value.clone();
    for _ in 0..MAX_ENCODING_DEPTH {
        match current {
            Value::String(ref text) => current = serde_json::from_str(text)?,
            _ => break,
        }
    }
    serde_json::from_value(current)
}

/// Sizes were written as integers, floats or strings depending on the
/// producer. Anything unusable becomes `None`.
fn lenient_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries() -> Value {
        json!([
            {"filename": "a.pdf", "file_path": "u1/a.pdf", "size": 10},
            {"filename": "b.txt", "file_path": "u1/b.txt", "size": "22"}
        ])
    }

    #[test]
    fn test_native_and_string_forms_decode_identically() {
        let native: Vec<StoredFileEntry> = decode_embedded(&entries()).unwrap();
        let once = Value::String(entries().to_string());
        let twice = Value::String(once.to_string());

        let from_once: Vec<StoredFileEntry> = decode_embedded(&once).unwrap();
        let from_twice: Vec<StoredFileEntry> = decode_embedded(&twice).unwrap();

        assert_eq!(native, from_once);
        assert_eq!(native, from_twice);
        assert_eq!(native[1].size, Some(22));
    }

    #[test]
    fn test_garbage_string_fails() {
        let bad = Value::String("[{not json".into());
        assert!(decode_embedded::<Vec<StoredFileEntry>>(&bad).is_err());
    }

    #[test]
    fn test_reference_prefers_path() {
        let entry = StoredFileEntry {
            filename: "a.pdf".into(),
            file_path: Some(String::new()),
            storage_url: Some("https://cdn/a.pdf".into()),
            ..Default::default()
        };
        assert_eq!(entry.reference(), Some("https://cdn/a.pdf"));
    }

    #[test]
    fn test_inline_rows_without_content_decode() {
        let rows = Value::String(
            json!([{"filename": "a.txt", "file_path": "/legacy/a.txt", "suffix": ".txt", "size": 10}])
                .to_string(),
        );
        let entries: Vec<InlineFileEntry> = decode_embedded(&rows).unwrap();
        assert_eq!(entries[0].content, None);
        assert_eq!(entries[0].file_path.as_deref(), Some("/legacy/a.txt"));
        assert_eq!(entries[0].size, Some(10));
    }

    #[test]
    fn test_is_absent() {
        assert!(FilePayload::default().is_absent());
        assert!(!FilePayload::from_references(vec![]).is_absent());
        let nulls = FilePayload {
            structured: Some(Value::Null),
            inline: Some(Value::Null),
            references: None,
        };
        assert!(nulls.is_absent());
    }
}
