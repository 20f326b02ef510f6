//! The job store abstraction.
//!
//! The store is the only state shared between the producer and the worker.
//! Every mutation the worker makes goes through one of these operations, and
//! the guarded writes refuse to move a job that is not where the caller
//! expects it to be.

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use docroute_core::result::AppResult;
use docroute_entity::job::{Job, JobState, NewJob};

/// Number of jobs in one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateCount {
    /// The state.
    pub state: JobState,
    /// Jobs currently in it.
    pub count: i64,
}

/// Durable job records.
#[async_trait]
pub trait JobStore: Send + Sync + Debug + 'static {
    /// Insert a job in the `created` state with its complete file payload.
    async fn create_job(&self, job: &NewJob) -> AppResult<Uuid>;

    /// Atomically move up to `limit` claimable jobs, oldest first, into
    /// `processing` with zero progress and return them.
    async fn claim_next(&self, limit: usize) -> AppResult<Vec<Job>>;

    /// Record progress of a job in `processing`.
    async fn update_progress(&self, id: Uuid, processed_files: i32, progress: i32)
    -> AppResult<()>;

    /// Correct the file count of a job in `processing`. Used when the stored
    /// count disagrees with the files its payload resolves to.
    async fn set_total_files(&self, id: Uuid, total_files: i32) -> AppResult<()>;

    /// Move a job in `processing` to `completed` with its summary and full
    /// progress in one write.
    async fn complete(&self, id: Uuid, result: &Value) -> AppResult<()>;

    /// Move a non-terminal job to `failed`.
    async fn fail(&self, id: Uuid, reason: &str) -> AppResult<()>;

    /// Fetch one job.
    async fn get(&self, id: Uuid) -> AppResult<Option<Job>>;

    /// Remove a job. Returns whether a row was deleted.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Put a failed job back in `ready`, clearing its progress and reason.
    /// With `force`, a job stuck in `processing` is reset too.
    async fn reset(&self, id: Uuid, force: bool) -> AppResult<bool>;

    /// Jobs of one owner, newest first.
    async fn list_by_owner(
        &self,
        owner: &str,
        state: Option<JobState>,
        limit: i64,
    ) -> AppResult<Vec<Job>>;

    /// Job counts per state, legacy aliases folded in.
    async fn count_by_state(&self) -> AppResult<Vec<StateCount>>;
}
