//! PostgreSQL job store over the `inbox_jobs` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

use docroute_core::error::{AppError, ErrorKind};
use docroute_core::result::AppResult;
use docroute_entity::job::{FilePayload, Job, JobKind, JobState, NewJob};

use crate::store::{JobStore, StateCount};

const ACTIVE_STATES: [&str; 4] = ["created", "ready", "pending", "processing"];

/// One row of `inbox_jobs` as stored.
#[derive(Debug, Clone, FromRow)]
struct JobRow {
    id: Uuid,
    user_id: Option<String>,
    endpoint_type: Option<String>,
    status: String,
    progress: Option<i32>,
    total_files: Option<i32>,
    processed_files: Option<i32>,
    file_storage_urls: Option<Value>,
    file_urls: Option<Vec<String>>,
    file_data: Option<Value>,
    result: Option<Value>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = AppError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            owner: row.user_id,
            kind: JobKind::from_stored(row.endpoint_type.as_deref()),
            state: row.status.parse()?,
            progress: row.progress.unwrap_or(0),
            total_files: row.total_files.unwrap_or(0),
            processed_files: row.processed_files.unwrap_or(0),
            payload: FilePayload {
                structured: row.file_storage_urls,
                references: row.file_urls,
                inline: row.file_data,
            },
            result: row.result,
            failure_reason: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Split claimed rows into usable jobs and the ids of rows that could not
/// be read. One bad row must not hold back the rest of the batch.
fn partition_claimed(rows: Vec<JobRow>) -> (Vec<Job>, Vec<(Uuid, AppError)>) {
    let mut jobs = Vec::with_capacity(rows.len());
    let mut unreadable = Vec::new();
    for row in rows {
        let id = row.id;
        match Job::try_from(row) {
            Ok(job) => jobs.push(job),
            Err(e) => unreadable.push((id, e)),
        }
    }
    (jobs, unreadable)
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}

fn stored(states: &[&str]) -> Vec<String> {
    states.iter().map(|s| s.to_string()).collect()
}

/// Job store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Turn a guarded write that matched nothing into `NotFound` or
    /// `Conflict`.
    async fn explain_miss(&self, id: Uuid, operation: &str) -> AppError {
        let status: Result<Option<String>, _> =
            sqlx::query_scalar("SELECT status FROM inbox_jobs WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await;
        match status {
            Ok(None) => AppError::not_found(format!("Job {id} not found")),
            Ok(Some(status)) => AppError::conflict(format!(
                "Cannot {operation} job {id} in state '{status}'"
            )),
            Err(e) => AppError::with_source(ErrorKind::Database, "Failed to inspect job", e),
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(&self, job: &NewJob) -> AppResult<Uuid> {
        sqlx::query_scalar(
            "INSERT INTO inbox_jobs (user_id, endpoint_type, status, progress, total_files, \
             processed_files, file_storage_urls, file_urls, file_data) \
             VALUES ($1, $2, 'created', 0, $3, 0, $4, $5, $6) RETURNING id",
        )
        .bind(job.owner.as_deref())
        .bind(job.kind.as_str())
        .bind(job.total_files)
        .bind(job.payload.structured.as_ref())
        .bind(job.payload.references.as_ref())
        .bind(job.payload.inline.as_ref())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create job"))
    }

    async fn claim_next(&self, limit: usize) -> AppResult<Vec<Job>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, JobRow>(
            "UPDATE inbox_jobs SET status = 'processing', progress = 0, processed_files = 0, \
             updated_at = NOW() \
             WHERE id IN ( \
                SELECT id FROM inbox_jobs \
                WHERE status = ANY($1) \
                ORDER BY created_at ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT $2 \
             ) RETURNING *",
        )
        .bind(stored(&JobState::claimable_stored_values()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to claim jobs"))?;

        let (mut jobs, unreadable) = partition_claimed(rows);
        for (id, err) in unreadable {
            warn!(job_id = %id, error = %err, "Failing unreadable claimed job");
            let reason = format!("Job processing failed: unreadable job record: {}", err.message);
            if let Err(e) = self.fail(id, &reason).await {
                warn!(job_id = %id, error = %e, "Failed to mark unreadable job as failed");
            }
        }
        jobs.sort_by_key(|j| j.created_at);
        debug!(claimed = jobs.len(), "Claimed jobs");
        Ok(jobs)
    }

    async fn update_progress(
        &self,
        id: Uuid,
        processed_files: i32,
        progress: i32,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE inbox_jobs SET processed_files = $2, progress = $3, updated_at = NOW() \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(processed_files)
        .bind(progress)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update job progress"))?;

        if result.rows_affected() == 0 {
            return Err(self.explain_miss(id, "update progress of").await);
        }
        Ok(())
    }

    async fn set_total_files(&self, id: Uuid, total_files: i32) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE inbox_jobs SET total_files = $2, processed_files = 0, progress = 0, \
             updated_at = NOW() \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(total_files)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update file count"))?;

        if result.rows_affected() == 0 {
            return Err(self.explain_miss(id, "update file count of").await);
        }
        Ok(())
    }

    async fn complete(&self, id: Uuid, summary: &Value) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE inbox_jobs SET status = 'completed', result = $2, error = NULL, \
             progress = 100, processed_files = total_files, updated_at = NOW() \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(summary)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to complete job"))?;

        if result.rows_affected() == 0 {
            return Err(self.explain_miss(id, "complete").await);
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid, reason: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE inbox_jobs SET status = 'failed', error = $2, result = NULL, \
             updated_at = NOW() \
             WHERE id = $1 AND status = ANY($3)",
        )
        .bind(id)
        .bind(reason)
        .bind(stored(&ACTIVE_STATES))
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to mark job as failed"))?;

        if result.rows_affected() == 0 {
            return Err(self.explain_miss(id, "fail").await);
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM inbox_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find job"))?
            .map(Job::try_from)
            .transpose()
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM inbox_jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete job"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset(&self, id: Uuid, force: bool) -> AppResult<bool> {
        let from: &[&str] = if force {
            &["failed", "processing"]
        } else {
            &["failed"]
        };
        let result = sqlx::query(
            "UPDATE inbox_jobs SET status = 'ready', error = NULL, result = NULL, \
             progress = 0, processed_files = 0, updated_at = NOW() \
             WHERE id = $1 AND status = ANY($2)",
        )
        .bind(id)
        .bind(stored(from))
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to reset job"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_owner(
        &self,
        owner: &str,
        state: Option<JobState>,
        limit: i64,
    ) -> AppResult<Vec<Job>> {
        let states = state.map(|s| stored(s.stored_values()));
        sqlx::query_as::<_, JobRow>(
            "SELECT * FROM inbox_jobs \
             WHERE user_id = $1 AND ($2::text[] IS NULL OR status = ANY($2)) \
             ORDER BY created_at DESC LIMIT $3",
        )
        .bind(owner)
        .bind(states)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list jobs"))?
        .into_iter()
        .map(Job::try_from)
        .collect()
    }

    async fn count_by_state(&self) -> AppResult<Vec<StateCount>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM inbox_jobs GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to count jobs"))?;

        let mut counts: Vec<StateCount> = Vec::new();
        for (status, count) in rows {
            let state: JobState = status.parse()?;
            match counts.iter_mut().find(|c| c.state == state) {
                Some(existing) => existing.count += count,
                None => counts.push(StateCount { state, count }),
            }
        }
        counts.sort_by_key(|c| c.state.as_str());
        Ok(counts)
    }
}
