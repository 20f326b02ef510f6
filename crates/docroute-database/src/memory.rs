//! In-memory job store for tests.
//!
//! Mirrors the guarded-write semantics and table constraints of the
//! PostgreSQL store, and adds hooks for injecting store outages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use docroute_core::error::AppError;
use docroute_core::result::AppResult;
use docroute_entity::job::{Job, JobState, NewJob};

use crate::store::{JobStore, StateCount};

#[derive(Debug, Default)]
struct Inner {
    /// Jobs in insertion order.
    jobs: Vec<Job>,
    /// Every accepted progress write per job, `(processed, progress)`.
    progress_log: HashMap<Uuid, Vec<(i32, i32)>>,
}

impl Inner {
    fn find_mut(&mut self, id: Uuid) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }
}

/// Job store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
    failing_writes: AtomicU32,
    claim_unavailable: AtomicBool,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed record, e.g. one carrying a legacy payload.
    pub async fn insert(&self, job: Job) {
        self.inner.lock().await.jobs.push(job);
    }

    /// Make the next `count` progress or completion writes fail with a
    /// database error.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Make claiming fail until switched back.
    pub fn set_claim_unavailable(&self, unavailable: bool) {
        self.claim_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Accepted progress writes for a job, in order.
    pub async fn progress_log(&self, id: Uuid) -> Vec<(i32, i32)> {
        self.inner
            .lock()
            .await
            .progress_log
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    fn injected_failure(&self) -> AppResult<()> {
        let consumed = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match consumed {
            Ok(_) => Err(AppError::database("Injected write failure")),
            Err(_) => Ok(()),
        }
    }
}

fn miss(job: Option<&Job>, id: Uuid, operation: &str) -> AppError {
    match job {
        None => AppError::not_found(format!("Job {id} not found")),
        Some(job) => AppError::conflict(format!(
            "Cannot {operation} job {id} in state '{}'",
            job.state
        )),
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, new: &NewJob) -> AppResult<Uuid> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::now_v7(),
            owner: new.owner.clone(),
            kind: new.kind,
            state: JobState::Created,
            progress: 0,
            total_files: new.total_files,
            processed_files: 0,
            payload: new.payload.clone(),
            result: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        let id = job.id;
        self.inner.lock().await.jobs.push(job);
        Ok(id)
    }

    async fn claim_next(&self, limit: usize) -> AppResult<Vec<Job>> {
        if self.claim_unavailable.load(Ordering::SeqCst) {
            return Err(AppError::database("Job store unavailable"));
        }
        let mut inner = self.inner.lock().await;
        let now = Utc::now();

        let mut order: Vec<usize> = (0..inner.jobs.len())
            .filter(|&i| inner.jobs[i].state.is_claimable())
            .collect();
        order.sort_by_key(|&i| inner.jobs[i].created_at);

        let mut claimed = Vec::new();
        for idx in order.into_iter().take(limit) {
            let job = &mut inner.jobs[idx];
            job.state = JobState::Processing;
            job.progress = 0;
            job.processed_files = 0;
            job.updated_at = now;
            claimed.push(job.clone());
        }
        Ok(claimed)
    }

    async fn update_progress(
        &self,
        id: Uuid,
        processed_files: i32,
        progress: i32,
    ) -> AppResult<()> {
        self.injected_failure()?;
        let mut inner = self.inner.lock().await;
        match inner.find_mut(id) {
            Some(job) if job.state == JobState::Processing => {
                if processed_files > job.total_files || !(0..=100).contains(&progress) {
                    return Err(AppError::validation(format!(
                        "Progress {processed_files}/{} ({progress}%) violates job constraints",
                        job.total_files
                    )));
                }
                job.processed_files = processed_files;
                job.progress = progress;
                job.updated_at = Utc::now();
            }
            other => {
                let other = other.map(|j| &*j);
                return Err(miss(other, id, "update progress of"));
            }
        }
        inner
            .progress_log
            .entry(id)
            .or_default()
            .push((processed_files, progress));
        Ok(())
    }

    async fn set_total_files(&self, id: Uuid, total_files: i32) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        match inner.find_mut(id) {
            Some(job) if job.state == JobState::Processing => {
                job.total_files = total_files;
                job.processed_files = 0;
                job.progress = 0;
                job.updated_at = Utc::now();
                Ok(())
            }
            other => {
                let other = other.map(|j| &*j);
                Err(miss(other, id, "update file count of"))
            }
        }
    }

    async fn complete(&self, id: Uuid, result: &Value) -> AppResult<()> {
        self.injected_failure()?;
        let mut inner = self.inner.lock().await;
        match inner.find_mut(id) {
            Some(job) if job.state == JobState::Processing => {
                job.state = JobState::Completed;
                job.result = Some(result.clone());
                job.failure_reason = None;
                job.progress = 100;
                job.processed_files = job.total_files;
                job.updated_at = Utc::now();
                Ok(())
            }
            other => {
                let other = other.map(|j| &*j);
                Err(miss(other, id, "complete"))
            }
        }
    }

    async fn fail(&self, id: Uuid, reason: &str) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        match inner.find_mut(id) {
            Some(job) if !job.state.is_terminal() => {
                job.state = JobState::Failed;
                job.failure_reason = Some(reason.to_string());
                job.result = None;
                job.updated_at = Utc::now();
                Ok(())
            }
            other => {
                let other = other.map(|j| &*j);
                Err(miss(other, id, "fail"))
            }
        }
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Job>> {
        Ok(self
            .inner
            .lock()
            .await
            .jobs
            .iter()
            .find(|j| j.id == id)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.jobs.len();
        inner.jobs.retain(|j| j.id != id);
        inner.progress_log.remove(&id);
        Ok(inner.jobs.len() < before)
    }

    async fn reset(&self, id: Uuid, force: bool) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        let Some(job) = inner.find_mut(id) else {
            return Ok(false);
        };
        let resettable = job.state == JobState::Failed
            || (force && job.state == JobState::Processing);
        if !resettable {
            return Ok(false);
        }
        job.state = JobState::Ready;
        job.failure_reason = None;
        job.result = None;
        job.progress = 0;
        job.processed_files = 0;
        job.updated_at = Utc::now();
        Ok(true)
    }

    async fn list_by_owner(
        &self,
        owner: &str,
        state: Option<JobState>,
        limit: i64,
    ) -> AppResult<Vec<Job>> {
        let inner = self.inner.lock().await;
        let mut jobs: Vec<Job> = inner
            .jobs
            .iter()
            .filter(|j| j.owner.as_deref() == Some(owner))
            .filter(|j| state.is_none_or(|s| j.state == s))
            .cloned()
            .collect();
        jobs.reverse();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(jobs)
    }

    async fn count_by_state(&self) -> AppResult<Vec<StateCount>> {
        let inner = self.inner.lock().await;
        let mut counts: Vec<StateCount> = Vec::new();
        for job in &inner.jobs {
            match counts.iter_mut().find(|c| c.state == job.state) {
                Some(existing) => existing.count += 1,
                None => counts.push(StateCount {
                    state: job.state,
                    count: 1,
                }),
            }
        }
        counts.sort_by_key(|c| c.state.as_str());
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docroute_core::error::ErrorKind;
    use docroute_entity::job::{FilePayload, JobKind};

    fn new_job(files: i32) -> NewJob {
        NewJob {
            kind: JobKind::Classify,
            owner: Some("user-1".into()),
            payload: FilePayload::from_references(vec!["u/a.txt".into()]),
            total_files: files,
        }
    }

    #[tokio::test]
    async fn test_claim_is_fifo_and_exclusive() {
        let store = MemoryJobStore::new();
        let first = store.create_job(&new_job(1)).await.unwrap();
        let second = store.create_job(&new_job(1)).await.unwrap();
        let third = store.create_job(&new_job(1)).await.unwrap();

        let claimed = store.claim_next(2).await.unwrap();
        let ids: Vec<Uuid> = claimed.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert!(claimed.iter().all(|j| j.state == JobState::Processing));

        let rest = store.claim_next(5).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, third);
        assert!(store.claim_next(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guarded_writes() {
        let store = MemoryJobStore::new();
        let id = store.create_job(&new_job(2)).await.unwrap();

        let err = store.update_progress(id, 1, 50).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        store.claim_next(1).await.unwrap();
        store.update_progress(id, 1, 50).await.unwrap();
        let err = store.update_progress(id, 3, 100).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        store.complete(id, &serde_json::json!({"ok": true})).await.unwrap();
        let err = store.fail(id, "late").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let job = store.get(id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.processed_files, 2);
        assert!(job.failure_reason.is_none());

        let err = store.complete(Uuid::now_v7(), &Value::Null).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_reset_requires_force_for_processing() {
        let store = MemoryJobStore::new();
        let id = store.create_job(&new_job(1)).await.unwrap();
        store.claim_next(1).await.unwrap();

        assert!(!store.reset(id, false).await.unwrap());
        assert!(store.reset(id, true).await.unwrap());
        assert_eq!(store.get(id).await.unwrap().unwrap().state, JobState::Ready);

        store.claim_next(1).await.unwrap();
        store.fail(id, "boom").await.unwrap();
        assert!(store.reset(id, false).await.unwrap());
        let job = store.get(id).await.unwrap().unwrap();
        assert!(job.failure_reason.is_none());
        assert_eq!(job.processed_files, 0);
    }

    #[tokio::test]
    async fn test_injected_write_failures_are_consumed() {
        let store = MemoryJobStore::new();
        let id = store.create_job(&new_job(1)).await.unwrap();
        store.claim_next(1).await.unwrap();

        store.fail_next_writes(1);
        assert!(store.update_progress(id, 1, 100).await.is_err());
        store.update_progress(id, 1, 100).await.unwrap();
        assert_eq!(store.progress_log(id).await, vec![(1, 100)]);
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let store = MemoryJobStore::new();
        let a = store.create_job(&new_job(1)).await.unwrap();
        store.create_job(&new_job(1)).await.unwrap();
        store.claim_next(1).await.unwrap();

        let processing = store
            .list_by_owner("user-1", Some(JobState::Processing), 10)
            .await
            .unwrap();
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].id, a);
        assert!(store.list_by_owner("nobody", None, 10).await.unwrap().is_empty());

        let counts = store.count_by_state().await.unwrap();
        assert!(counts.contains(&StateCount {
            state: JobState::Created,
            count: 1
        }));
        assert!(counts.contains(&StateCount {
            state: JobState::Processing,
            count: 1
        }));
    }
}
