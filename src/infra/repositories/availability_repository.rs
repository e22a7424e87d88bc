//! Availability (RSVP) repository with row-locked writes.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, QueryFilter, QuerySelect, Set, SqlErr, Statement, TransactionTrait,
};
use uuid::Uuid;

use super::entities::availability::{self, ActiveModel, Entity as AvailabilityEntity};
use crate::domain::{
    plan_transition, AppliedChange, Availability, AvailabilityWrite, RsvpResponse, RsvpTransition,
};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// How long a write waits for a competing row lock.
const ROW_LOCK_TIMEOUT: &str = "SET LOCAL lock_timeout = '2s'";

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    async fn find(&self, match_id: Uuid, player_id: Uuid) -> AppResult<Option<Availability>>;

    async fn list_for_match(&self, match_id: Uuid) -> AppResult<Vec<Availability>>;

    /// Apply `write` under a row lock in its own transaction.
    ///
    /// Lock timeouts and lost insert races surface as `ConcurrentUpdate`.
    async fn apply_change(&self, write: AvailabilityWrite) -> AppResult<AppliedChange>;

    /// Database round-trip for health checks.
    async fn ping(&self) -> AppResult<()>;
}

/// Concrete implementation of AvailabilityRepository
pub struct AvailabilityStore {
    db: DatabaseConnection,
}

impl AvailabilityStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Map errors caused by competing writers to `ConcurrentUpdate`.
fn concurrency_error(e: DbErr) -> AppError {
    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || e.to_string().contains("lock timeout")
    {
        tracing::warn!(error = %e, "Availability write lost a concurrency race");
        return AppError::ConcurrentUpdate;
    }
    AppError::from(e)
}

#[async_trait]
impl AvailabilityRepository for AvailabilityStore {
    async fn find(&self, match_id: Uuid, player_id: Uuid) -> AppResult<Option<Availability>> {
        let result = AvailabilityEntity::find()
            .filter(availability::Column::MatchId.eq(match_id))
            .filter(availability::Column::PlayerId.eq(player_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Availability::from))
    }

    async fn list_for_match(&self, match_id: Uuid) -> AppResult<Vec<Availability>> {
        let models = AvailabilityEntity::find()
            .filter(availability::Column::MatchId.eq(match_id))
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Availability::from).collect())
    }

    async fn apply_change(&self, write: AvailabilityWrite) -> AppResult<AppliedChange> {
        let txn = self.db.begin().await.map_err(AppError::from)?;
        txn.execute_unprepared(ROW_LOCK_TIMEOUT)
            .await
            .map_err(AppError::from)?;

        let result: AppResult<AppliedChange> = async {
            let current = AvailabilityEntity::find()
                .filter(availability::Column::MatchId.eq(write.match_id))
                .filter(availability::Column::PlayerId.eq(write.player_id))
                .lock_exclusive()
                .one(&txn)
                .await
                .map_err(concurrency_error)?;

            let old_response = current
                .as_ref()
                .map(|m| m.stored_response())
                .unwrap_or(RsvpResponse::NoResponse);
            let transition = plan_transition(old_response, write.response);

            match (transition, current) {
                (RsvpTransition::Unchanged, _) => {}
                (RsvpTransition::Clear, Some(model)) => {
                    model.delete(&txn).await.map_err(concurrency_error)?;
                }
                (RsvpTransition::Clear, None) => {}
                (RsvpTransition::Upsert(response), Some(model)) => {
                    let mut active: ActiveModel = model.into();
                    active.response = Set(response.as_str().to_string());
                    active.discord_id = Set(write.discord_id.clone());
                    active.responded_at = Set(chrono::Utc::now());
                    active.operation_id = Set(Some(write.operation_id.clone()));
                    active.trace_id = Set(Some(write.trace_id.clone()));
                    active.update(&txn).await.map_err(concurrency_error)?;
                }
                (RsvpTransition::Upsert(response), None) => {
                    let active = ActiveModel {
                        id: Set(Uuid::new_v4()),
                        match_id: Set(write.match_id),
                        player_id: Set(write.player_id),
                        discord_id: Set(write.discord_id.clone()),
                        response: Set(response.as_str().to_string()),
                        responded_at: Set(chrono::Utc::now()),
                        operation_id: Set(Some(write.operation_id.clone())),
                        trace_id: Set(Some(write.trace_id.clone())),
                    };
                    active.insert(&txn).await.map_err(concurrency_error)?;
                }
            }

            Ok(AppliedChange {
                old_response,
                transition,
            })
        }
        .await;

        match result {
            Ok(change) => {
                txn.commit().await.map_err(concurrency_error)?;
                Ok(change)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn ping(&self) -> AppResult<()> {
        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
