//! Worker runner: main loop that claims jobs and drives them to a terminal
//! state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;

use docroute_core::config::WorkerConfig;
use docroute_core::error::AppError;
use docroute_entity::job::Job;

use crate::executor::JobExecutor;
use crate::queue::JobQueue;

/// Prefix of every job-level failure reason.
pub const FAILURE_PREFIX: &str = "Job processing failed: ";

/// Main worker runner that polls the store and executes jobs
#[derive(Debug)]
pub struct WorkerRunner {
    /// Job queue for claiming and persisting
    queue: Arc<JobQueue>,
    /// Job executor for dispatching
    executor: Arc<JobExecutor>,
    /// Worker configuration
    config: WorkerConfig,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
        }
    }

    /// Run until the cancel signal is received. In-flight jobs of the
    /// current cycle get `shutdown_grace_seconds` to finish.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            "Worker started with poll_interval={}s, jobs_per_cycle={}",
            self.config.poll_interval_seconds,
            self.config.jobs_per_cycle
        );

        loop {
            if *cancel.borrow() {
                break;
            }

            let mut batch = match self.dispatch().await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!("Failed to claim jobs: {}", e);
                    if self.idle(&mut cancel).await {
                        break;
                    }
                    continue;
                }
            };

            if batch.is_empty() {
                tracing::trace!("No eligible jobs");
                if self.idle(&mut cancel).await {
                    break;
                }
                continue;
            }

            let interrupted = tokio::select! {
                _ = drain(&mut batch) => false,
                _ = cancelled(&mut cancel) => true,
            };
            if interrupted {
                tracing::info!("Shutdown requested, waiting for {} in-flight jobs", batch.len());
                let grace = Duration::from_secs(self.config.shutdown_grace_seconds);
                if tokio::time::timeout(grace, drain(&mut batch)).await.is_err() {
                    tracing::warn!(
                        "{} jobs still running after {}s, leaving them in processing",
                        batch.len(),
                        grace.as_secs()
                    );
                    batch.abort_all();
                }
                break;
            }
        }

        tracing::info!("Worker shut down complete");
    }

    /// Run a single cycle to completion and return how many jobs it claimed.
    pub async fn run_once(&self) -> Result<usize, AppError> {
        let mut batch = self.dispatch().await?;
        let claimed = batch.len();
        drain(&mut batch).await;
        Ok(claimed)
    }

    /// Claim up to `jobs_per_cycle` jobs and start each on its own task.
    async fn dispatch(&self) -> Result<JoinSet<()>, AppError> {
        let jobs = self.queue.claim(self.config.jobs_per_cycle.max(1)).await?;
        let mut batch = JoinSet::new();
        for job in jobs {
            let queue = Arc::clone(&self.queue);
            let executor = Arc::clone(&self.executor);
            batch.spawn(supervise(queue, executor, job));
        }
        Ok(batch)
    }

    /// Sleep for the poll interval. Returns true when shutdown was requested.
    async fn idle(&self, cancel: &mut watch::Receiver<bool>) -> bool {
        let interval = Duration::from_secs(self.config.poll_interval_seconds);
        tokio::select! {
            _ = cancelled(cancel) => true,
            _ = tokio::time::sleep(interval) => false,
        }
    }
}

/// Runs one job on a child task so a panic still lands the job in FAILED.
async fn supervise(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, job: Job) {
    let job_id = job.id;
    let child = tokio::spawn(execute(Arc::clone(&queue), executor, job));
    if let Err(e) = child.await {
        tracing::error!("Job {} task ended abnormally: {}", job_id, e);
        let reason = format!("{FAILURE_PREFIX}worker task panicked");
        if let Err(e) = queue.fail(job_id, &reason).await {
            tracing::error!("Failed to mark job {} as failed: {}", job_id, e);
        }
    }
}

async fn execute(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, job: Job) {
    let job_id = job.id;
    tracing::info!("Processing job: id={}, kind='{}', files={}", job_id, job.kind, job.total_files);

    match executor.execute(&job, &queue).await {
        Ok(summary) => match queue.complete(job_id, &summary).await {
            Ok(()) => tracing::info!(
                "Job {} completed: {} successful, {} failed in {:.2}s",
                job_id,
                summary.successful,
                summary.failed,
                summary.processing_time
            ),
            Err(e) => {
                tracing::error!("Failed to mark job {} as completed: {}", job_id, e);
                let reason = format!("{FAILURE_PREFIX}{e}");
                if let Err(e) = queue.fail(job_id, &reason).await {
                    tracing::error!("Failed to mark job {} as failed: {}", job_id, e);
                }
            }
        },
        Err(err) => {
            tracing::error!("Job {} failed: {}", job_id, err);
            let reason = format!("{FAILURE_PREFIX}{err}");
            if let Err(e) = queue.fail(job_id, &reason).await {
                tracing::error!("Failed to mark job {} as failed: {}", job_id, e);
            }
        }
    }
}

async fn drain(batch: &mut JoinSet<()>) {
    while let Some(joined) = batch.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Job supervisor ended abnormally: {}", e);
        }
    }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            return;
        }
    }
}
