//! Resolved file descriptors.

use bytes::Bytes;
use std::fmt;

/// Marker that precedes the bucket in a public object URL.
const PUBLIC_OBJECT_MARKER: &str = "/object/public/";

/// Where the bytes of one file live.
#[derive(Clone, PartialEq, Eq)]
pub enum FileLocator {
    /// Bytes embedded in the job record, already decoded.
    Inline(Bytes),
    /// Path inside the configured storage bucket.
    StoragePath(String),
    /// Absolute HTTP(S) URL fetched directly.
    Url(String),
}

impl FileLocator {
    /// Classify a stored reference string.
    ///
    /// Public object URLs are rewritten to the path inside their bucket, other
    /// `http(s)` references stay URLs, everything else is a storage path.
    pub fn from_reference(reference: &str) -> Self {
        let reference = reference.trim();
        if let Some(path) = public_object_path(reference) {
            return Self::StoragePath(path);
        }
        if reference.starts_with("http://") || reference.starts_with("https://") {
            Self::Url(reference.to_string())
        } else {
            Self::StoragePath(reference.trim_start_matches('/').to_string())
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Inline(_) => "inline",
            Self::StoragePath(_) => "storage",
            Self::Url(_) => "url",
        }
    }
}

impl fmt::Debug for FileLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(bytes) => write!(f, "Inline({} bytes)", bytes.len()),
            Self::StoragePath(path) => f.debug_tuple("StoragePath").field(path).finish(),
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
        }
    }
}

fn public_object_path(reference: &str) -> Option<String> {
    let start = reference.find(PUBLIC_OBJECT_MARKER)? + PUBLIC_OBJECT_MARKER.len();
    let after_marker = &reference[start..];
    let (_bucket, path) = after_marker.split_once('/')?;
    let path = path.split(['?', '#']).next().unwrap_or_default();
    (!path.is_empty()).then(|| path.to_string())
}

/// One file of a job, normalized from whichever representation it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Original filename.
    pub filename: String,
    /// Where to read the bytes.
    pub locator: FileLocator,
    /// Size in bytes, when recorded.
    pub size: Option<u64>,
    /// Suffix including the dot, lowercase.
    pub suffix: String,
    /// MIME type hint.
    pub content_type: Option<String>,
}

impl FileDescriptor {
    /// Build a descriptor, deriving the suffix from the filename when absent.
    pub fn new(
        filename: impl Into<String>,
        locator: FileLocator,
        size: Option<u64>,
        suffix: Option<String>,
        content_type: Option<String>,
    ) -> Self {
        let filename = filename.into();
        let suffix = suffix
            .filter(|s| !s.trim().is_empty())
            .map(|s| normalize_suffix(&s))
            .unwrap_or_else(|| suffix_of(&filename));
        Self {
            filename,
            locator,
            size,
            suffix,
            content_type: content_type.filter(|c| !c.trim().is_empty()),
        }
    }
}

/// Lowercase suffix of a filename including the dot, or empty.
pub fn suffix_of(filename: &str) -> String {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Trailing path segment of a reference, without query string.
pub fn filename_of(reference: &str) -> String {
    let trimmed = reference.split(['?', '#']).next().unwrap_or_default();
    trimmed
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn normalize_suffix(suffix: &str) -> String {
    let suffix = suffix.trim().to_ascii_lowercase();
    if suffix.starts_with('.') {
        suffix
    } else {
        format!(".{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_becomes_storage_path() {
        let locator = FileLocator::from_reference(
            "https://proj.example.co/storage/v1/object/public/inbox-files/u1/job/a.pdf",
        );
        assert_eq!(locator, FileLocator::StoragePath("u1/job/a.pdf".into()));
    }

    #[test]
    fn test_reference_classification() {
        assert_eq!(
            FileLocator::from_reference("https://files.example.com/a.pdf"),
            FileLocator::Url("https://files.example.com/a.pdf".into())
        );
        assert_eq!(
            FileLocator::from_reference("/u1/a.pdf"),
            FileLocator::StoragePath("u1/a.pdf".into())
        );
    }

    #[test]
    fn test_suffix_derivation() {
        let d = FileDescriptor::new("Report.PDF", FileLocator::Url("x".into()), None, None, None);
        assert_eq!(d.suffix, ".pdf");
        let d = FileDescriptor::new("noext", FileLocator::Url("x".into()), None, Some("TXT".into()), None);
        assert_eq!(d.suffix, ".txt");
        assert_eq!(suffix_of(".bashrc"), "");
    }

    #[test]
    fn test_filename_of_strips_query() {
        assert_eq!(filename_of("https://h/x/y/scan.png?token=1"), "scan.png");
        assert_eq!(filename_of("u1/doc.txt"), "doc.txt");
    }
}
