//! Per-file processing with bounded concurrency.
//!
//! Every file runs as its own task: fetch bytes, extract text, hand the text
//! to the job handler. A semaphore sized from the job's file count bounds how
//! many run at once. The calling task is the only one that writes progress,
//! one write per finished file, so persisted values never go backwards.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

use docroute_core::config::ProcessingConfig;
use docroute_core::traits::{ExtractionHint, TextExtractor};
use docroute_entity::job::{FileDescriptor, FileOutcome};
use docroute_storage::{ByteFetcher, FetchError};

use crate::executor::{JobExecutionError, JobHandler};
use crate::queue::JobQueue;
use crate::retry::RetryPolicy;

/// Error detail recorded when no usable text comes out of a file.
pub const NO_TEXT_EXTRACTED: &str = "No text extracted";

/// Concurrency ceiling for a job with `total_files` files.
pub fn concurrency_for(total_files: usize, config: &ProcessingConfig) -> usize {
    let mut tiers = config.concurrency_tiers.clone();
    tiers.sort_by_key(|t| t.max_files);
    let limit = tiers
        .iter()
        .find(|t| total_files <= t.max_files)
        .map(|t| t.concurrency.min(config.max_concurrency))
        .unwrap_or(config.max_concurrency);
    limit.max(1)
}

#[derive(Debug)]
struct FileStage {
    fetcher: ByteFetcher,
    extractor: Arc<dyn TextExtractor>,
    fetch_retry: RetryPolicy,
}

impl FileStage {
    async fn run(&self, descriptor: &FileDescriptor, handler: &dyn JobHandler) -> FileOutcome {
        let filename = descriptor.filename.as_str();
        let bytes = match self
            .fetch_retry
            .run(
                "fetch_file",
                |_| self.fetcher.fetch(&descriptor.locator),
                FetchError::is_transient,
            )
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(filename, locator = descriptor.locator.kind(), error = %e, "Could not fetch file");
                return handler.failed_outcome(filename, &format!("Failed to fetch file: {e}"));
            }
        };

        let hint = ExtractionHint {
            filename: descriptor.filename.clone(),
            suffix: descriptor.suffix.clone(),
            content_type: descriptor.content_type.clone(),
        };
        let text = match self.extractor.extract(bytes, &hint).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                debug!(filename, "Extractor returned no text");
                return handler.failed_outcome(filename, NO_TEXT_EXTRACTED);
            }
            Err(e) => {
                warn!(filename, error = %e, "Text extraction failed");
                return handler.failed_outcome(filename, &format!("{NO_TEXT_EXTRACTED}: {e}"));
            }
        };

        handler.handle_file(descriptor, &text).await
    }
}

/// Runs the files of one job.
#[derive(Debug)]
pub struct FileProcessor {
    stage: Arc<FileStage>,
    config: ProcessingConfig,
}

impl FileProcessor {
    /// Create a processor.
    pub fn new(
        fetcher: ByteFetcher,
        extractor: Arc<dyn TextExtractor>,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            stage: Arc::new(FileStage {
                fetcher,
                extractor,
                fetch_retry: RetryPolicy::from_config(&config.fetch_retry),
            }),
            config,
        }
    }

    /// Process every file and return the outcomes in submission order.
    ///
    /// Only a failed progress write aborts the job; every per-file problem
    /// is recorded in that file's outcome.
    pub async fn process(
        &self,
        job_id: Uuid,
        descriptors: Vec<FileDescriptor>,
        handler: Arc<dyn JobHandler>,
        queue: &JobQueue,
    ) -> Result<Vec<FileOutcome>, JobExecutionError> {
        let total = descriptors.len();
        let total_i32 = i32::try_from(total)
            .map_err(|_| JobExecutionError::Permanent("too many files".into()))?;
        let limit = concurrency_for(total, &self.config);
        debug!(%job_id, files = total, concurrency = limit, "Starting file tasks");

        let semaphore = Arc::new(Semaphore::new(limit));
        let filenames: Vec<String> = descriptors.iter().map(|d| d.filename.clone()).collect();
        let mut tasks = JoinSet::new();

        for (index, descriptor) in descriptors.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let stage = Arc::clone(&self.stage);
            let handler = Arc::clone(&handler);
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => stage.run(&descriptor, handler.as_ref()).await,
                    Err(_) => handler.failed_outcome(&descriptor.filename, "processing was shut down"),
                };
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<FileOutcome>> = vec![None; total];
        let mut processed: i32 = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    debug!(%job_id, filename = %outcome.filename, status = ?outcome.status, "File finished");
                    outcomes[index] = Some(outcome);
                }
                Err(e) => warn!(%job_id, error = %e, "File task aborted"),
            }
            processed += 1;
            if let Err(e) = queue.record_progress(job_id, processed, total_i32).await {
                tasks.abort_all();
                return Err(JobExecutionError::Store(e));
            }
        }

        Ok(outcomes
            .into_iter()
            .zip(filenames)
            .map(|(outcome, filename)| {
                outcome.unwrap_or_else(|| handler.failed_outcome(&filename, "file task aborted"))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docroute_core::config::ConcurrencyTier;

    #[test]
    fn test_default_tiers() {
        let config = ProcessingConfig::default();
        assert_eq!(concurrency_for(1, &config), 5);
        assert_eq!(concurrency_for(10, &config), 5);
        assert_eq!(concurrency_for(11, &config), 8);
        assert_eq!(concurrency_for(20, &config), 8);
        assert_eq!(concurrency_for(21, &config), 12);
        assert_eq!(concurrency_for(500, &config), 12);
    }

    #[test]
    fn test_tiers_are_clamped_and_sorted() {
        let config = ProcessingConfig {
            concurrency_tiers: vec![
                ConcurrencyTier {
                    max_files: 50,
                    concurrency: 40,
                },
                ConcurrencyTier {
                    max_files: 2,
                    concurrency: 0,
                },
            ],
            max_concurrency: 6,
            ..ProcessingConfig::default()
        };
        assert_eq!(concurrency_for(1, &config), 1);
        assert_eq!(concurrency_for(30, &config), 6);
        assert_eq!(concurrency_for(51, &config), 6);
    }
}
