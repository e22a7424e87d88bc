//! Token command - Issue an API token for an existing user.

use std::sync::Arc;

use crate::cli::args::TokenArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{Cache, Database};
use crate::jobs::{connect_job_pool, ApalisQueue};
use crate::services::{ServiceContainer, Services};

/// Execute the token command
pub async fn execute(args: TokenArgs, config: Config) -> AppResult<()> {
    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;
    let cache = Cache::connect(&config)
        .await
        .map_err(|e| AppError::internal(format!("Redis connection failed: {}", e)))?;
    let jobs = Arc::new(ApalisQueue::new(connect_job_pool(&config.database_url).await?));

    let services = Services::from_connection(db.get_connection(), cache, jobs, config)?;
    let token = services.auth().issue_token(args.user_id).await?;

    tracing::info!(user_id = %args.user_id, "Issued API token");
    let json = serde_json::to_string_pretty(&token)
        .map_err(|e| AppError::internal(format!("Failed to encode token: {}", e)))?;
    println!("{}", json);
    Ok(())
}
