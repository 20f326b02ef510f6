//! Normalizes the stored file payload of a job into file descriptors.
//!
//! Representations are tried newest first and the first non-empty one wins:
//! the structured list, then the flat reference list, then inline bytes.
//! A representation that is present but cannot be parsed is logged and
//! skipped. Resolution reads nothing but the job record, so resolving the
//! same record twice gives the same ordered list.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use docroute_entity::job::descriptor::filename_of;
use docroute_entity::job::payload::decode_embedded;
use docroute_entity::job::{
    FileDescriptor, FileLocator, FilePayload, InlineFileEntry, Job, StoredFileEntry,
};

/// Why a job's files could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No representation holds any file.
    #[error("no file data found")]
    NoFileData,
}

/// Stateless resolver for job payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResolver;

impl FileResolver {
    /// Resolve the files of a job in submission order.
    pub fn resolve(&self, job: &Job) -> Result<Vec<FileDescriptor>, ResolveError> {
        resolve_payload(job.id, &job.payload)
    }
}

fn resolve_payload(job_id: Uuid, payload: &FilePayload) -> Result<Vec<FileDescriptor>, ResolveError> {
    if let Some(files) = structured(job_id, payload).filter(|f| !f.is_empty()) {
        debug!(%job_id, files = files.len(), "Resolved structured file list");
        return Ok(files);
    }
    if let Some(files) = references(payload).filter(|f| !f.is_empty()) {
        debug!(%job_id, files = files.len(), "Resolved legacy reference list");
        return Ok(files);
    }
    if let Some(files) = inline(job_id, payload).filter(|f| !f.is_empty()) {
        debug!(%job_id, files = files.len(), "Resolved inline file data");
        return Ok(files);
    }
    Err(ResolveError::NoFileData)
}

fn structured(job_id: Uuid, payload: &FilePayload) -> Option<Vec<FileDescriptor>> {
    let raw = payload.structured.as_ref().filter(|v| !v.is_null())?;
    let entries: Vec<StoredFileEntry> = match decode_embedded(raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(%job_id, error = %e, "Ignoring unparseable structured file list");
            return None;
        }
    };
    Some(entries.into_iter().map(stored_descriptor).collect())
}

fn stored_descriptor(entry: StoredFileEntry) -> FileDescriptor {
    let reference = entry.reference().unwrap_or_default().to_string();
    let locator = FileLocator::from_reference(&reference);
    let filename = if entry.filename.trim().is_empty() {
        filename_of(&reference)
    } else {
        entry.filename
    };
    FileDescriptor::new(filename, locator, entry.size, entry.suffix, entry.content_type)
}

fn references(payload: &FilePayload) -> Option<Vec<FileDescriptor>> {
    let refs = payload.references.as_ref()?;
    Some(
        refs.iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(|r| FileDescriptor::new(filename_of(r), FileLocator::from_reference(r), None, None, None))
            .collect(),
    )
}

fn inline(job_id: Uuid, payload: &FilePayload) -> Option<Vec<FileDescriptor>> {
    let raw = payload.inline.as_ref().filter(|v| !v.is_null())?;
    let entries: Vec<InlineFileEntry> = match decode_embedded(raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(%job_id, error = %e, "Ignoring unparseable inline file data");
            return None;
        }
    };

    let mut files = Vec::with_capacity(entries.len());
    for entry in entries {
        match inline_descriptor(entry) {
            Ok(file) => files.push(file),
            Err(reason) => {
                warn!(%job_id, reason = %reason, "Ignoring malformed inline file data");
                return None;
            }
        }
    }
    Some(files)
}

/// Rows carry either base64 bytes or a storage path. Bytes win when both
/// are present.
fn inline_descriptor(entry: InlineFileEntry) -> Result<FileDescriptor, String> {
    let content = entry.content.as_deref().map(str::trim);
    let path = entry
        .file_path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let (locator, size) = match (content, path) {
        (Some(content), _) if !content.is_empty() => {
            let bytes = STANDARD
                .decode(content)
                .map_err(|e| format!("invalid base64 for {}: {e}", entry.filename))?;
            let size = entry.size.unwrap_or(bytes.len() as u64);
            (FileLocator::Inline(Bytes::from(bytes)), Some(size))
        }
        (_, Some(path)) => (FileLocator::from_reference(path), entry.size),
        (Some(_), None) => (FileLocator::Inline(Bytes::new()), Some(entry.size.unwrap_or(0))),
        (None, None) => return Err(format!("{} has neither content nor file_path", entry.filename)),
    };

    let filename = match path {
        Some(path) if entry.filename.trim().is_empty() => filename_of(path),
        _ => entry.filename,
    };
    Ok(FileDescriptor::new(filename, locator, size, entry.suffix, entry.content_type))
}
