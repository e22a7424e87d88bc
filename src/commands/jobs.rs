//! Jobs command - Background job management.
//!
//! Provides CLI commands to manage background jobs:
//! - `work`: Start the email, notification and confirmation workers
//! - `list`: Show pending/failed jobs
//! - `clear`: Remove failed jobs from the queue
//! - `cleanup`: Expire substitute requests past their deadline
//!
//! ## Usage
//!
//! ```bash
//! # Start the job workers
//! league-coordinator jobs work
//!
//! # List job queue status
//! league-coordinator jobs list
//!
//! # Expire open requests older than 14 days
//! league-coordinator jobs cleanup --days 14
//! ```

use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};

use crate::cli::args::{JobsAction, JobsArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{Cache, Database, EmailGateway, HttpEmailGateway};
use crate::jobs::{connect_job_pool, ApalisQueue, JobQueue};
use crate::services::{ServiceContainer, Services};

/// Execute the jobs command
pub async fn execute(args: JobsArgs, config: Config) -> AppResult<()> {
    match args.action {
        JobsAction::Work => run_worker(config).await,
        JobsAction::List => list_jobs(&config).await,
        JobsAction::Clear => clear_failed_jobs(&config).await,
        JobsAction::Cleanup { days } => cleanup_expired(config, days).await,
    }
}

/// Build the service graph the workers call into.
async fn connect_services(config: Config) -> AppResult<(Services, apalis_sql::sqlx::PgPool)> {
    let db = Database::connect(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;
    let cache = Cache::connect(&config)
        .await
        .map_err(|e| AppError::internal(format!("Redis connection failed: {}", e)))?;
    let pool = connect_job_pool(&config.database_url).await?;
    let jobs: Arc<dyn JobQueue> = Arc::new(ApalisQueue::new(pool.clone()));

    let services = Services::from_connection(db.get_connection(), cache, jobs, config)?;
    Ok((services, pool))
}

/// Start the background job workers
///
/// One apalis worker per job kind, all reading from PostgreSQL storage.
async fn run_worker(config: Config) -> AppResult<()> {
    use apalis::prelude::*;
    use apalis_sql::postgres::PostgresStorage;

    use crate::jobs::{
        confirmation_job_handler, email_job_handler, notification_job_handler, ConfirmationJob,
        EmailJob, EmailWorkerContext, NotificationJob,
    };

    tracing::info!("Connecting to database for job worker...");

    let email_context = EmailWorkerContext {
        gateway: Arc::new(HttpEmailGateway::from_config(&config)?) as Arc<dyn EmailGateway>,
        default_from: config.email_from.clone(),
    };
    let (services, pool) = connect_services(config).await?;

    let email_storage: PostgresStorage<EmailJob> = PostgresStorage::new(pool.clone());
    let notification_storage: PostgresStorage<NotificationJob> =
        PostgresStorage::new(pool.clone());
    let confirmation_storage: PostgresStorage<ConfirmationJob> = PostgresStorage::new(pool);

    let email_worker = WorkerBuilder::new("email-worker")
        .data(email_context)
        .backend(email_storage)
        .build_fn(email_job_handler);

    let notification_worker = WorkerBuilder::new("notification-worker")
        .data(services.notifications())
        .backend(notification_storage)
        .build_fn(notification_job_handler);

    let confirmation_worker = WorkerBuilder::new("confirmation-worker")
        .data(services.sub_notifications())
        .backend(confirmation_storage)
        .build_fn(confirmation_job_handler);

    tracing::info!("Job workers started. Press Ctrl+C to stop.");

    let monitor = Monitor::new()
        .register(email_worker)
        .register(notification_worker)
        .register(confirmation_worker);

    tokio::select! {
        result = monitor.run() => {
            if let Err(e) = result {
                tracing::error!("Worker error: {}", e);
                return Err(AppError::internal(format!("Worker failed: {}", e)));
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping workers...");
        }
    }

    tracing::info!("Job workers stopped.");
    Ok(())
}

/// Expire open substitute requests older than `days`
async fn cleanup_expired(config: Config, days: i64) -> AppResult<()> {
    if days < 1 {
        return Err(AppError::validation("--days must be at least 1"));
    }

    let (services, _) = connect_services(config).await?;
    let expired = services.substitutes().cleanup_expired(days).await?;

    tracing::info!(expired, days, "Substitute request cleanup finished");
    println!("Expired {} substitute request(s).", expired);
    Ok(())
}

/// Connect with plain sea-orm and report whether apalis has created its schema
async fn connect_queue_db(config: &Config) -> AppResult<Option<DatabaseConnection>> {
    tracing::info!("Connecting to database...");

    let db = sea_orm::Database::connect(&config.database_url)
        .await
        .map_err(|e| AppError::internal(format!("Failed to connect to database: {}", e)))?;

    let result = db
        .query_one(Statement::from_string(
            DatabaseBackend::Postgres,
            "SELECT EXISTS(SELECT 1 FROM information_schema.schemata WHERE schema_name = 'apalis') as exists".to_string(),
        ))
        .await
        .map_err(|e| AppError::internal(format!("Query failed: {}", e)))?;

    let schema_exists = result
        .and_then(|r| r.try_get::<bool>("", "exists").ok())
        .unwrap_or(false);

    Ok(schema_exists.then_some(db))
}

/// List job counts per type and status
async fn list_jobs(config: &Config) -> AppResult<()> {
    let Some(db) = connect_queue_db(config).await? else {
        println!("\n=== Job Queue Status ===");
        println!("Job queue not initialized.");
        println!("Run 'jobs work' first to create the queue tables.");
        println!("========================\n");
        return Ok(());
    };

    let rows = db
        .query_all(Statement::from_string(
            DatabaseBackend::Postgres,
            "SELECT job_type, status::text as status, COUNT(*)::bigint as count \
             FROM apalis.jobs GROUP BY job_type, status ORDER BY job_type, status"
                .to_string(),
        ))
        .await
        .map_err(|e| AppError::internal(format!("Query failed: {}", e)))?;

    println!("\n=== Job Queue Status ===");
    if rows.is_empty() {
        println!("No jobs recorded.");
    }
    for row in rows {
        if let (Ok(job_type), Ok(status), Ok(count)) = (
            row.try_get::<String>("", "job_type"),
            row.try_get::<String>("", "status"),
            row.try_get::<i64>("", "count"),
        ) {
            println!("{:<40} {:<10} {}", short_job_type(&job_type), status, count);
        }
    }
    println!("========================\n");

    Ok(())
}

/// Clear failed jobs from the queue
async fn clear_failed_jobs(config: &Config) -> AppResult<()> {
    let Some(db) = connect_queue_db(config).await? else {
        println!("Job queue not initialized. Nothing to clear.");
        return Ok(());
    };

    let result = db
        .execute(Statement::from_string(
            DatabaseBackend::Postgres,
            "DELETE FROM apalis.jobs WHERE status = 'Failed'".to_string(),
        ))
        .await
        .map_err(|e| AppError::internal(format!("Failed to clear jobs: {}", e)))?;

    println!("Cleared {} failed job(s) from the queue.", result.rows_affected());
    Ok(())
}

/// `league_coordinator::jobs::email_job::EmailJob` -> `EmailJob`
fn short_job_type(job_type: &str) -> &str {
    job_type.rsplit("::").next().unwrap_or(job_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_job_type() {
        assert_eq!(
            short_job_type("league_coordinator::jobs::email_job::EmailJob"),
            "EmailJob"
        );
        assert_eq!(short_job_type("ConfirmationJob"), "ConfirmationJob");
    }
}
