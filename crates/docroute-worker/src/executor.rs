//! Job executor: resolves a claimed job's files, dispatches them to the
//! handler for the job's kind, and aggregates the outcomes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use docroute_core::error::AppError;
use docroute_entity::job::{FileDescriptor, FileOutcome, Job, JobKind, JobSummary};

use crate::aggregator::aggregate;
use crate::processor::FileProcessor;
use crate::queue::JobQueue;
use crate::resolver::{FileResolver, ResolveError};

/// Turns the extracted text of one file into its outcome.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// The job kind this handler processes.
    fn kind(&self) -> JobKind;

    /// Produce the outcome for one file. Never fails: problems become error
    /// or safe-default outcomes.
    async fn handle_file(&self, descriptor: &FileDescriptor, text: &str) -> FileOutcome;

    /// Outcome for a file that failed before reaching the handler.
    fn failed_outcome(&self, filename: &str, error: &str) -> FileOutcome {
        FileOutcome::failed(filename, error)
    }
}

/// Conditions that prevent a job from completing.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// None of the payload representations holds a file.
    #[error("{0}")]
    NoFileData(#[from] ResolveError),

    /// A store write failed after retries.
    #[error("job store write failed: {0}")]
    Store(#[source] AppError),

    /// The job cannot be processed at all.
    #[error("{0}")]
    Permanent(String),
}

/// Dispatches claimed jobs to the handler registered for their kind.
#[derive(Debug)]
pub struct JobExecutor {
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
    resolver: FileResolver,
    processor: FileProcessor,
}

impl JobExecutor {
    /// Create an executor without handlers.
    pub fn new(processor: FileProcessor) -> Self {
        Self {
            handlers: HashMap::new(),
            resolver: FileResolver,
            processor,
        }
    }

    /// Register a handler for its job kind.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        info!(kind = %handler.kind(), "Registered job handler");
        self.handlers.insert(handler.kind(), handler);
    }

    /// Check if a handler is registered for a kind.
    pub fn has_handler(&self, kind: JobKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Process every file of a claimed job and build its summary.
    pub async fn execute(&self, job: &Job, queue: &JobQueue) -> Result<JobSummary, JobExecutionError> {
        let started = Instant::now();
        let handler = self.handlers.get(&job.kind).ok_or_else(|| {
            JobExecutionError::Permanent(format!("no handler registered for job kind '{}'", job.kind))
        })?;

        let descriptors = self.resolver.resolve(job)?;
        let total = i32::try_from(descriptors.len())
            .map_err(|_| JobExecutionError::Permanent("too many files".into()))?;
        if total != job.total_files {
            warn!(
                job_id = %job.id,
                stored = job.total_files,
                resolved = total,
                "Stored file count disagrees with payload, correcting"
            );
            queue
                .set_total_files(job.id, total)
                .await
                .map_err(JobExecutionError::Store)?;
        }

        info!(job_id = %job.id, kind = %job.kind, files = total, "Processing job");
        let outcomes = self
            .processor
            .process(job.id, descriptors, Arc::clone(handler), queue)
            .await?;

        Ok(aggregate(job.kind, outcomes, started.elapsed()))
    }
}
