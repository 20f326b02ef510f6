//! Per-state job counts.

use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use docroute_core::config::AppConfig;
use docroute_core::error::AppError;
use docroute_database::JobStore;

#[derive(Debug, Serialize, Tabled)]
struct StateRow {
    state: String,
    count: i64,
}

/// Execute the stats command
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let store = super::open_store(config).await?;
    let rows: Vec<StateRow> = store
        .count_by_state()
        .await?
        .into_iter()
        .map(|c| StateRow {
            state: c.state.to_string(),
            count: c.count,
        })
        .collect();
    output::print_list(&rows, format);
    Ok(())
}
