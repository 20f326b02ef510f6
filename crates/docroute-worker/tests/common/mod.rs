//! Shared fixtures for worker integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde_json::{Value, json};
use tempfile::TempDir;
use uuid::Uuid;

use docroute_core::config::{BackoffConfig, ProcessingConfig, RetryConfig, WorkerConfig};
use docroute_core::traits::{ClassifyError, Classifier, StorageProvider};
use docroute_core::types::{AnalysisContext, Routing, RoutingDecision};
use docroute_database::{JobStore, MemoryJobStore};
use docroute_entity::job::{
    FileDescriptor, FileLocator, FilePayload, Job, JobKind, JobState, JobSummary, NewJob,
};
use docroute_integrations::PlainTextExtractor;
use docroute_storage::ByteFetcher;
use docroute_storage::providers::LocalStorageProvider;
use docroute_worker::jobs::{AnalyzeJobHandler, ClassifyJobHandler};
use docroute_worker::{FileProcessor, JobExecutor, JobQueue, RetryPolicy, WorkerRunner};

/// Classifier whose answer is chosen by markers in the document text:
/// `INBOX` routes to the inbox, `REJECT` is refused, `FAIL` fails
/// transiently, anything else is archived.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    pub calls: AtomicU32,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    delay: Duration,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every call for `delay` so overlapping calls can be observed.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, text: &str) -> Result<RoutingDecision, ClassifyError> {
        self.enter().await;
        if text.contains("REJECT") {
            return Err(ClassifyError::Rejected("input refused".into()));
        }
        if text.contains("FAIL") {
            return Err(ClassifyError::Upstream {
                status: 503,
                message: "overloaded".into(),
            });
        }
        let routing = if text.contains("INBOX") {
            Routing::Inbox
        } else {
            Routing::Archive
        };
        Ok(RoutingDecision {
            routing,
            channel: (if routing == Routing::Inbox { "TAX" } else { "ARCHIVE" }).into(),
            topic_type: None,
            topic_title: None,
            urgency: Some("MEDIUM".into()),
            deadline: None,
            authority: None,
            reasoning: Some("scripted".into()),
        })
    }

    async fn analyze(&self, text: &str, _context: &AnalysisContext) -> Result<Value, ClassifyError> {
        self.enter().await;
        if text.contains("FAIL") {
            return Err(ClassifyError::Timeout);
        }
        Ok(json!({ "summary": "scripted analysis", "status": "OPEN" }))
    }
}

/// A worker wired to an in-memory store and a temporary storage root.
pub struct Harness {
    pub store: Arc<MemoryJobStore>,
    pub storage: Arc<dyn StorageProvider>,
    pub classifier: Arc<ScriptedClassifier>,
    pub queue: Arc<JobQueue>,
    pub runner: WorkerRunner,
    _dir: TempDir,
}

pub fn worker_config() -> WorkerConfig {
    WorkerConfig {
        poll_interval_seconds: 1,
        jobs_per_cycle: 3,
        shutdown_grace_seconds: 5,
        store_retry: RetryConfig {
            max_attempts: 3,
            backoff: BackoffConfig::None,
        },
        ..WorkerConfig::default()
    }
}

impl Harness {
    pub async fn new() -> Self {
        Self::with(ScriptedClassifier::new(), ProcessingConfig::default()).await
    }

    pub async fn with(classifier: ScriptedClassifier, processing: ProcessingConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let storage: Arc<dyn StorageProvider> = Arc::new(
            LocalStorageProvider::new(dir.path().to_str().unwrap())
                .await
                .unwrap(),
        );
        let store = Arc::new(MemoryJobStore::new());
        let classifier = Arc::new(classifier);
        let config = worker_config();

        let fetcher = ByteFetcher::new(Arc::clone(&storage), Duration::from_secs(10)).unwrap();
        let processor = FileProcessor::new(fetcher, Arc::new(PlainTextExtractor), processing);
        let mut executor = JobExecutor::new(processor);
        executor.register(Arc::new(ClassifyJobHandler::new(
            classifier.clone(),
            RetryPolicy::new(3, BackoffConfig::None),
            Duration::from_secs(10),
        )));
        executor.register(Arc::new(AnalyzeJobHandler::new(
            classifier.clone(),
            RetryPolicy::new(3, BackoffConfig::None),
            Duration::from_secs(10),
            1000,
        )));

        let store_dyn: Arc<dyn JobStore> = store.clone();
        let queue = Arc::new(JobQueue::new(
            store_dyn,
            RetryPolicy::from_config(&config.store_retry),
        ));
        let runner = WorkerRunner::new(Arc::clone(&queue), Arc::new(executor), config);

        Self {
            store,
            storage,
            classifier,
            queue,
            runner,
            _dir: dir,
        }
    }

    /// Upload `files` as `(name, text)` pairs and create a job over them.
    pub async fn submit(&self, kind: JobKind, files: &[(&str, &str)]) -> Uuid {
        let mut descriptors = Vec::new();
        for (name, text) in files {
            let path = format!("uploads/{name}");
            self.storage
                .write(&path, Bytes::from(text.to_string()))
                .await
                .unwrap();
            descriptors.push(FileDescriptor::new(
                *name,
                FileLocator::StoragePath(path),
                Some(text.len() as u64),
                None,
                None,
            ));
        }
        let new = NewJob::from_descriptors(kind, Some("owner-1".into()), &descriptors).unwrap();
        self.store.create_job(&new).await.unwrap()
    }

    /// Insert a record the way an older producer would have written it.
    pub async fn insert_legacy(&self, payload: FilePayload, total_files: i32) -> Uuid {
        let now = Utc::now();
        let job = Job {
            id: Uuid::now_v7(),
            owner: Some("owner-1".into()),
            kind: JobKind::Classify,
            state: JobState::Ready,
            progress: 0,
            total_files,
            processed_files: 0,
            payload,
            result: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        let id = job.id;
        self.store.insert(job).await;
        id
    }

    pub async fn job(&self, id: Uuid) -> Job {
        self.store.get(id).await.unwrap().unwrap()
    }

    pub async fn summary(&self, id: Uuid) -> JobSummary {
        let job = self.job(id).await;
        assert_eq!(job.state, JobState::Completed, "job failed: {:?}", job.failure_reason);
        serde_json::from_value(job.result.unwrap()).unwrap()
    }
}
