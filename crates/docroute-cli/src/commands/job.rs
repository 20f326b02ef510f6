//! Job inspection and recovery commands.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use docroute_core::config::AppConfig;
use docroute_core::error::AppError;
use docroute_database::JobStore;
use docroute_entity::job::{FileLocator, Job, JobState, JobStatusView};
use docroute_worker::FileResolver;

/// Arguments for the status command
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Job id
    pub id: String,
}

/// Arguments for the list command
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Owner whose jobs to list
    #[arg(short, long)]
    pub owner: String,

    /// Only jobs in this state (the legacy `pending` is accepted)
    #[arg(short, long)]
    pub state: Option<JobState>,

    /// Maximum number of jobs
    #[arg(short, long, default_value_t = 20)]
    pub limit: i64,
}

/// Arguments for the reset command
#[derive(Debug, Args)]
pub struct ResetArgs {
    /// Job id
    pub id: String,

    /// Also reset a job stuck in processing
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the delete command
#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Job id
    pub id: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Job display row for table output
#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    id: String,
    kind: String,
    state: String,
    progress: String,
    files: String,
    created_at: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            kind: job.kind.to_string(),
            state: job.state.to_string(),
            progress: format!("{}%", job.progress),
            files: format!("{}/{}", job.processed_files, job.total_files),
            created_at: job.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Show a single job
pub async fn status(args: &StatusArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let id = super::parse_job_id(&args.id)?;
    let store = super::open_store(config).await?;
    let job = store
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))?;
    let view = JobStatusView::from(&job);

    match format {
        OutputFormat::Json => output::print_json(&view),
        OutputFormat::Table => {
            output::print_kv("Job", &view.id.to_string());
            output::print_kv("Kind", view.kind.as_str());
            output::print_kv("State", view.state.as_str());
            output::print_kv("Progress", &format!("{}%", view.progress));
            output::print_kv(
                "Files",
                &format!("{}/{}", view.processed_files, view.total_files),
            );
            output::print_kv("Created", &view.created_at.to_rfc3339());
            output::print_kv("Updated", &view.updated_at.to_rfc3339());
            if let Some(reason) = &view.failure_reason {
                output::print_kv("Failure", reason);
            }
            if let Some(result) = &view.result {
                for key in ["successful", "failed", "defaulted", "inbox_count", "archive_count"] {
                    if let Some(value) = result.get(key) {
                        output::print_kv(key, &value.to_string());
                    }
                }
            }
        }
    }
    Ok(())
}

/// List the jobs of an owner
pub async fn list(args: &ListArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let store = super::open_store(config).await?;
    let jobs = store.list_by_owner(&args.owner, args.state, args.limit).await?;
    let rows: Vec<JobRow> = jobs.iter().map(JobRow::from).collect();
    output::print_list(&rows, format);
    Ok(())
}

/// Reset a failed or stuck job
pub async fn reset(args: &ResetArgs, config: &AppConfig) -> Result<(), AppError> {
    let id = super::parse_job_id(&args.id)?;
    let store = super::open_store(config).await?;
    if store.reset(id, args.force).await? {
        output::print_success(&format!("Job {id} is ready again"));
    } else if args.force {
        output::print_warning(&format!("Job {id} is neither failed nor processing"));
    } else {
        output::print_warning(&format!(
            "Job {id} is not failed; use --force for a job stuck in processing"
        ));
    }
    Ok(())
}

/// Delete a job and the objects it references in storage
pub async fn delete(args: &DeleteArgs, config: &AppConfig) -> Result<(), AppError> {
    let id = super::parse_job_id(&args.id)?;
    let store = super::open_store(config).await?;
    let Some(job) = store.get(id).await? else {
        output::print_warning(&format!("Job {id} not found"));
        return Ok(());
    };

    if job.state == JobState::Processing {
        output::print_warning("The job is still processing; a worker may write to it.");
    }
    if !args.yes {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!("Delete job {id} and its stored files?"))
            .default(false)
            .interact()
            .map_err(prompt_error)?;
        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let objects: Vec<String> = FileResolver
        .resolve(&job)
        .map(|descriptors| {
            descriptors
                .into_iter()
                .filter_map(|d| match d.locator {
                    FileLocator::StoragePath(path) if !path.is_empty() => Some(path),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if !objects.is_empty() {
        let storage = super::open_storage(config).await?;
        for object in &objects {
            if let Err(e) = storage.delete(object).await {
                output::print_warning(&format!("Could not delete {object}: {e}"));
            }
        }
    }

    if store.delete(id).await? {
        output::print_success(&format!(
            "Deleted job {id} and {} stored file(s)",
            objects.len()
        ));
    } else {
        output::print_warning(&format!("Job {id} was already gone"));
    }
    Ok(())
}

/// A failed confirmation prompt (closed stdin, no terminal) is a usage problem.
fn prompt_error(e: dialoguer::Error) -> AppError {
    AppError::validation(format!("Input error: {e}"))
}
