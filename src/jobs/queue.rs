//! Job queue port and its apalis PostgreSQL implementation.

use apalis::prelude::Storage;
use apalis_sql::postgres::PostgresStorage;
use apalis_sql::sqlx::postgres::PgPoolOptions;
use apalis_sql::sqlx::PgPool;
use async_trait::async_trait;

use super::{ConfirmationJob, EmailJob, NotificationJob};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Enqueue background work.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue_email(&self, job: EmailJob) -> AppResult<()>;

    async fn enqueue_notification(&self, job: NotificationJob) -> AppResult<()>;

    async fn enqueue_confirmation(&self, job: ConfirmationJob) -> AppResult<()>;
}

/// Open the job database pool and create the apalis tables.
pub async fn connect_job_pool(database_url: &str) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|e| AppError::internal(format!("Failed to connect to database: {}", e)))?;

    PostgresStorage::setup(&pool)
        .await
        .map_err(|e| AppError::internal(format!("Failed to setup job storage: {}", e)))?;

    Ok(pool)
}

fn enqueue_error(kind: &str, e: impl std::fmt::Display) -> AppError {
    tracing::error!(kind, error = %e, "Failed to enqueue job");
    AppError::external(format!("Failed to enqueue {} job: {}", kind, e))
}

/// apalis storages backed by PostgreSQL.
#[derive(Clone)]
pub struct ApalisQueue {
    email: PostgresStorage<EmailJob>,
    notifications: PostgresStorage<NotificationJob>,
    confirmations: PostgresStorage<ConfirmationJob>,
}

impl ApalisQueue {
    pub fn new(pool: PgPool) -> Self {
        Self {
            email: PostgresStorage::new(pool.clone()),
            notifications: PostgresStorage::new(pool.clone()),
            confirmations: PostgresStorage::new(pool),
        }
    }
}

#[async_trait]
impl JobQueue for ApalisQueue {
    async fn enqueue_email(&self, job: EmailJob) -> AppResult<()> {
        let mut storage = self.email.clone();
        storage
            .push(job)
            .await
            .map_err(|e| enqueue_error("email", e))?;
        Ok(())
    }

    async fn enqueue_notification(&self, job: NotificationJob) -> AppResult<()> {
        let mut storage = self.notifications.clone();
        storage
            .push(job)
            .await
            .map_err(|e| enqueue_error("notification", e))?;
        Ok(())
    }

    async fn enqueue_confirmation(&self, job: ConfirmationJob) -> AppResult<()> {
        let mut storage = self.confirmations.clone();
        storage
            .push(job)
            .await
            .map_err(|e| enqueue_error("confirmation", e))?;
        Ok(())
    }
}
