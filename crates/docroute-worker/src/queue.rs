//! Worker-side access to the job store.
//!
//! Wraps every write the worker makes in the store retry policy and keeps
//! progress arithmetic in one place.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use docroute_core::error::AppError;
use docroute_database::JobStore;
use docroute_entity::job::{Job, JobSummary, progress_percent};

use crate::retry::RetryPolicy;

/// Job queue backed by a [`JobStore`].
#[derive(Debug, Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    retry: RetryPolicy,
}

impl JobQueue {
    /// Create a queue over a store with the given write retry policy.
    pub fn new(store: Arc<dyn JobStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Claim up to `limit` eligible jobs. Not retried: the worker loop tries
    /// again on its next cycle.
    pub async fn claim(&self, limit: usize) -> Result<Vec<Job>, AppError> {
        let jobs = self.store.claim_next(limit).await?;
        if !jobs.is_empty() {
            debug!(claimed = jobs.len(), "Claimed jobs");
        }
        Ok(jobs)
    }

    /// Persist that `processed` of `total` files are done.
    pub async fn record_progress(&self, job_id: Uuid, processed: i32, total: i32) -> Result<(), AppError> {
        let progress = progress_percent(processed, total);
        self.retry
            .run(
                "update_progress",
                |_| self.store.update_progress(job_id, processed, progress),
                AppError::is_transient,
            )
            .await?;
        debug!(%job_id, processed, total, progress, "Progress recorded");
        Ok(())
    }

    /// Correct the file count of a claimed job whose stored count disagrees
    /// with its resolved payload.
    pub async fn set_total_files(&self, job_id: Uuid, total: i32) -> Result<(), AppError> {
        self.retry
            .run(
                "set_total_files",
                |_| self.store.set_total_files(job_id, total),
                AppError::is_transient,
            )
            .await
    }

    /// Persist the summary and mark the job completed.
    pub async fn complete(&self, job_id: Uuid, summary: &JobSummary) -> Result<(), AppError> {
        let value = serde_json::to_value(summary)?;
        self.retry
            .run(
                "complete",
                |_| self.store.complete(job_id, &value),
                AppError::is_transient,
            )
            .await
    }

    /// Mark the job failed with a reason.
    pub async fn fail(&self, job_id: Uuid, reason: &str) -> Result<(), AppError> {
        self.retry
            .run(
                "fail",
                |_| self.store.fail(job_id, reason),
                AppError::is_transient,
            )
            .await
    }
}
