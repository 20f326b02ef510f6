//! DocRoute worker: claims batch document jobs and drives each one to
//! COMPLETED or FAILED.
//!
//! Main entry point that wires all crates together and starts the worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use docroute_core::config::AppConfig;
use docroute_core::error::AppError;
use docroute_database::{DatabasePool, JobStore, PgJobStore};
use docroute_integrations::OpenAiClassifier;
use docroute_storage::ByteFetcher;
use docroute_worker::jobs::{AnalyzeJobHandler, ClassifyJobHandler};
use docroute_worker::{FileProcessor, JobExecutor, JobQueue, RetryPolicy, WorkerRunner};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Worker error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from the layered files and the environment
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("DOCROUTE_CONFIG") {
        Ok(path) => AppConfig::load_file(&path),
        Err(_) => {
            let env = std::env::var("DOCROUTE_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main worker run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting DocRoute worker v{}", env!("CARGO_PKG_VERSION"));

    if !config.worker.enabled {
        tracing::warn!("Worker is disabled by configuration, exiting");
        return Ok(());
    }

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db_pool = DatabasePool::connect(&config.database).await?;
    docroute_database::migration::run_migrations(db_pool.pool()).await?;
    let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(db_pool.pool().clone()));

    // ── Step 2: Collaborators ────────────────────────────────────
    let fetch_timeout = Duration::from_secs(config.processing.fetch_timeout_seconds);
    tracing::info!("Initializing storage provider '{}'...", config.storage.provider);
    let storage = docroute_storage::build_provider(&config.storage, fetch_timeout).await?;
    if !storage.health_check().await.unwrap_or(false) {
        tracing::warn!("Storage provider '{}' failed its health check", storage.provider_type());
    }
    let fetcher = ByteFetcher::new(storage, fetch_timeout)?;
    let extractor = docroute_integrations::build_extractor(&config.extractor)?;
    let classifier = Arc::new(OpenAiClassifier::new(&config.classifier)?);
    tracing::info!("Classifier model: {}", config.classifier.model);

    // ── Step 3: Job handlers ─────────────────────────────────────
    let classify_retry = RetryPolicy::from_config(&config.classifier.retry);
    let classify_timeout = Duration::from_secs(config.classifier.request_timeout_seconds);

    let processor = FileProcessor::new(fetcher, extractor, config.processing.clone());
    let mut executor = JobExecutor::new(processor);
    executor.register(Arc::new(ClassifyJobHandler::new(
        classifier.clone(),
        classify_retry,
        classify_timeout,
    )));
    executor.register(Arc::new(AnalyzeJobHandler::new(
        classifier,
        classify_retry,
        classify_timeout,
        config.processing.excerpt_chars,
    )));

    // ── Step 4: Worker loop ──────────────────────────────────────
    let queue = Arc::new(JobQueue::new(
        store,
        RetryPolicy::from_config(&config.worker.store_retry),
    ));
    let runner = WorkerRunner::new(queue, Arc::new(executor), config.worker.clone());

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let worker = tokio::spawn(async move { runner.run(cancel_rx).await });

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    let _ = cancel_tx.send(true);

    if let Err(e) = worker.await {
        tracing::error!("Worker task ended abnormally: {}", e);
    }

    db_pool.close().await;
    tracing::info!("DocRoute worker stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
