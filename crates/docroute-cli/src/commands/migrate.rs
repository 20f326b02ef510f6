//! Database migration command.

use crate::output;
use docroute_core::config::AppConfig;
use docroute_core::error::AppError;
use docroute_database::DatabasePool;
use docroute_database::migration::run_migrations;

/// Apply all pending migrations
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    println!("Running database migrations...");
    run_migrations(pool.pool()).await?;
    pool.close().await;
    output::print_success("All migrations applied successfully.");
    Ok(())
}
