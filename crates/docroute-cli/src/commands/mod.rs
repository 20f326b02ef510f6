//! CLI command definitions and dispatch.

pub mod job;
pub mod migrate;
pub mod stats;
pub mod submit;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use docroute_core::config::AppConfig;
use docroute_core::error::AppError;
use docroute_core::traits::StorageProvider;
use docroute_database::{DatabasePool, PgJobStore};

/// DocRoute: batch document classification jobs
#[derive(Debug, Parser)]
#[command(name = "docroute", version, about, long_about = None)]
pub struct Cli {
    /// Explicit configuration file; defaults to config/default.toml plus the
    /// DOCROUTE_ENV overlay
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload local files and create a job over them
    Submit(submit::SubmitArgs),
    /// Show the status of a job
    Status(job::StatusArgs),
    /// List the jobs of an owner, newest first
    List(job::ListArgs),
    /// Make a failed (or, with --force, stuck) job eligible again
    Reset(job::ResetArgs),
    /// Delete a job and its stored files
    Delete(job::DeleteArgs),
    /// Count jobs per state
    Stats,
    /// Apply pending database migrations
    Migrate,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(self.config.as_deref())?;
        match &self.command {
            Commands::Submit(args) => submit::execute(args, &config, self.format).await,
            Commands::Status(args) => job::status(args, &config, self.format).await,
            Commands::List(args) => job::list(args, &config, self.format).await,
            Commands::Reset(args) => job::reset(args, &config).await,
            Commands::Delete(args) => job::delete(args, &config).await,
            Commands::Stats => stats::execute(&config, self.format).await,
            Commands::Migrate => migrate::execute(&config).await,
        }
    }
}

/// Helper: load configuration from an explicit file or the layered defaults
pub fn load_config(path: Option<&str>) -> Result<AppConfig, AppError> {
    match path {
        Some(path) => AppConfig::load_file(path),
        None => {
            let env = std::env::var("DOCROUTE_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Helper: connect to the job store
pub async fn open_store(config: &AppConfig) -> Result<PgJobStore, AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    Ok(PgJobStore::new(pool.into_pool()))
}

/// Helper: build the configured storage provider
pub async fn open_storage(config: &AppConfig) -> Result<Arc<dyn StorageProvider>, AppError> {
    docroute_storage::build_provider(&config.storage, storage_timeout(config)).await
}

/// Parse a job id argument
pub fn parse_job_id(raw: &str) -> Result<uuid::Uuid, AppError> {
    uuid::Uuid::parse_str(raw.trim())
        .map_err(|e| AppError::validation(format!("Invalid job id '{raw}': {e}")))
}

/// Timeout applied to storage requests made by the CLI
pub fn storage_timeout(config: &AppConfig) -> Duration {
    Duration::from_secs(config.processing.fetch_timeout_seconds)
}
