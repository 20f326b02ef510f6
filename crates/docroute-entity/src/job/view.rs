//! Reader-facing projection of a job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Job;
use super::status::{JobKind, JobState};

/// What a poller sees of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    /// Job identifier.
    pub id: Uuid,
    /// Job kind.
    pub kind: JobKind,
    /// Lifecycle state.
    pub state: JobState,
    /// Percentage complete.
    pub progress: i32,
    /// Files submitted.
    pub total_files: i32,
    /// Files finished.
    pub processed_files: i32,
    /// Summary of a completed job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Reason of a failed job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<&Job> for JobStatusView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            kind: job.kind,
            state: job.state,
            progress: job.progress,
            total_files: job.total_files,
            processed_files: job.processed_files,
            result: job.result.clone(),
            failure_reason: job.failure_reason.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
