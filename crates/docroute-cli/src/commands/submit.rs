//! Reference producer: upload local files, then create the job.

use std::path::PathBuf;

use bytes::Bytes;
use clap::Args;
use serde::Serialize;

use crate::output::{self, OutputFormat};
use docroute_core::error::AppError;
use docroute_database::JobStore;
use docroute_entity::job::{FileDescriptor, FileLocator, JobKind, NewJob};

/// Arguments for the submit command
#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Files to process
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Job kind: classify or analyze
    #[arg(short, long, default_value = "classify")]
    pub kind: JobKind,

    /// Identity recorded as the job owner
    #[arg(short, long)]
    pub owner: Option<String>,

    /// Embed file bytes in the job instead of uploading them
    #[arg(long)]
    pub inline: bool,
}

#[derive(Debug, Serialize)]
struct Submitted {
    id: uuid::Uuid,
    kind: JobKind,
    files: usize,
}

/// Execute the submit command
pub async fn execute(
    args: &SubmitArgs,
    config: &docroute_core::config::AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let storage = if args.inline {
        None
    } else {
        Some(super::open_storage(config).await?)
    };
    let batch = uuid::Uuid::new_v4();

    let mut descriptors = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::validation(format!("Not a file: {}", path.display())))?
            .to_string();
        let content = tokio::fs::read(path).await.map_err(|e| {
            AppError::not_found(format!("Failed to read {}: {e}", path.display()))
        })?;
        let size = content.len() as u64;
        let content_type = content_type_for(&filename);

        let locator = match &storage {
            Some(storage) => {
                let object = format!("submissions/{batch}/{filename}");
                storage.write(&object, Bytes::from(content)).await?;
                tracing::debug!(object = %object, size, "Uploaded file");
                FileLocator::StoragePath(object)
            }
            None => FileLocator::Inline(Bytes::from(content)),
        };
        descriptors.push(FileDescriptor::new(filename, locator, Some(size), None, content_type));
    }

    let new = NewJob::from_descriptors(args.kind, args.owner.clone(), &descriptors)?;
    let store = super::open_store(config).await?;
    let id = store.create_job(&new).await?;

    match format {
        OutputFormat::Json => output::print_json(&Submitted {
            id,
            kind: args.kind,
            files: descriptors.len(),
        }),
        OutputFormat::Table => output::print_success(&format!(
            "Created {} job {} with {} file(s)",
            args.kind,
            id,
            descriptors.len()
        )),
    }
    Ok(())
}

/// Content type recorded on the job; unknown extensions are left unset.
fn content_type_for(filename: &str) -> Option<String> {
    mime_guess::from_path(filename).first().map(|m| m.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for_known_extensions() {
        assert_eq!(content_type_for("scan.PDF").as_deref(), Some("application/pdf"));
        assert_eq!(content_type_for("notes.txt").as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_content_type_for_unknown_is_unset() {
        assert_eq!(content_type_for("README"), None);
    }
}
