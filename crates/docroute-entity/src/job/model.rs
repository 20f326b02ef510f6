//! Job entity model.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docroute_core::error::AppError;
use docroute_core::result::AppResult;

use super::descriptor::{FileDescriptor, FileLocator};
use super::payload::{FilePayload, InlineFileEntry, StoredFileEntry};
use super::status::{JobKind, JobState};

/// A batch of uploaded files processed as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: Uuid,
    /// Identity of the submitter.
    pub owner: Option<String>,
    /// What to do with each file.
    pub kind: JobKind,
    /// Lifecycle state.
    pub state: JobState,
    /// Percentage of files processed, 0 to 100.
    pub progress: i32,
    /// Number of files submitted.
    pub total_files: i32,
    /// Number of files finished, successfully or not.
    pub processed_files: i32,
    /// File data in whichever representation the producer wrote.
    pub payload: FilePayload,
    /// Summary, set only when completed.
    pub result: Option<serde_json::Value>,
    /// Reason, set only when failed.
    pub failure_reason: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Check if the job reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    /// What to do with each file.
    pub kind: JobKind,
    /// Identity of the submitter.
    pub owner: Option<String>,
    /// Complete file data.
    pub payload: FilePayload,
    /// Number of files in the payload.
    pub total_files: i32,
}

impl NewJob {
    /// Build a job from resolved descriptors.
    ///
    /// Inline descriptors are written in the inline representation, remote ones
    /// in the structured representation. A job cannot mix both.
    pub fn from_descriptors(
        kind: JobKind,
        owner: Option<String>,
        descriptors: &[FileDescriptor],
    ) -> AppResult<Self> {
        if descriptors.is_empty() {
            return Err(AppError::validation("A job needs at least one file"));
        }
        let total_files = i32::try_from(descriptors.len())
            .map_err(|_| AppError::validation("Too many files for one job"))?;

        let inline_count = descriptors
            .iter()
            .filter(|d| matches!(d.locator, FileLocator::Inline(_)))
            .count();

        let payload = if inline_count == descriptors.len() {
            let entries: Vec<InlineFileEntry> = descriptors
                .iter()
                .filter_map(|d| match &d.locator {
                    FileLocator::Inline(bytes) => Some(InlineFileEntry {
                        filename: d.filename.clone(),
                        content: Some(STANDARD.encode(bytes)),
                        file_path: None,
                        size: Some(d.size.unwrap_or(bytes.len() as u64)),
                        suffix: Some(d.suffix.clone()),
                        content_type: d.content_type.clone(),
                    }),
                    _ => None,
                })
                .collect();
            FilePayload::from_inline(&entries)?
        } else if inline_count == 0 {
            let entries: Vec<StoredFileEntry> = descriptors
                .iter()
                .map(|d| {
                    let (file_path, storage_url) = match &d.locator {
                        FileLocator::StoragePath(p) => (Some(p.clone()), None),
                        FileLocator::Url(u) => (None, Some(u.clone())),
                        FileLocator::Inline(_) => (None, None),
                    };
                    StoredFileEntry {
                        filename: d.filename.clone(),
                        file_path,
                        storage_url,
                        size: d.size,
                        suffix: Some(d.suffix.clone()),
                        content_type: d.content_type.clone(),
                    }
                })
                .collect();
            FilePayload::from_structured(&entries)?
        } else {
            return Err(AppError::validation(
                "A job cannot mix inline files with stored files",
            ));
        };

        Ok(Self {
            kind,
            owner,
            payload,
            total_files,
        })
    }
}

/// Percentage of processed files, rounded half up. Zero when there are no
/// files.
pub fn progress_percent(processed: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    let processed = processed.clamp(0, total) as i64;
    let total = total as i64;
    ((200 * processed + total) / (2 * total)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn stored(name: &str) -> FileDescriptor {
        FileDescriptor::new(name, FileLocator::StoragePath(format!("u/{name}")), Some(4), None, None)
    }

    fn inline(name: &str) -> FileDescriptor {
        FileDescriptor::new(name, FileLocator::Inline(Bytes::from_static(b"data")), None, None, None)
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(0, 3), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(1, 8), 13);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(5, 3), 100);
    }

    #[test]
    fn test_stored_descriptors_use_structured_payload() {
        let job = NewJob::from_descriptors(JobKind::Classify, None, &[stored("a.pdf"), stored("b.txt")])
            .unwrap();
        assert_eq!(job.total_files, 2);
        assert!(job.payload.structured.is_some());
        assert!(job.payload.inline.is_none());
    }

    #[test]
    fn test_inline_descriptors_are_base64_encoded() {
        let job = NewJob::from_descriptors(JobKind::Analyze, Some("u1".into()), &[inline("a.txt")])
            .unwrap();
        let inline = job.payload.inline.unwrap();
        assert_eq!(inline[0]["content"], "ZGF0YQ==");
        assert_eq!(inline[0]["size"], 4);
    }

    #[test]
    fn test_invalid_descriptor_sets() {
        assert!(NewJob::from_descriptors(JobKind::Classify, None, &[]).is_err());
        assert!(
            NewJob::from_descriptors(JobKind::Classify, None, &[inline("a.txt"), stored("b.txt")])
                .is_err()
        );
    }
}
