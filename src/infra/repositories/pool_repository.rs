//! Substitute pool membership, counters and audit history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::substitute_pool::{self, ActiveModel as PoolActiveModel, Entity as PoolEntity};
use super::entities::substitute_pool_history::{
    ActiveModel as HistoryActiveModel, Entity as HistoryEntity,
};
use crate::domain::{PoolEntry, PoolHistory};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PoolRepository: Send + Sync {
    async fn find_entry(&self, player_id: Uuid, league_id: Uuid) -> AppResult<Option<PoolEntry>>;

    /// Every league pool the player belongs to, active or not.
    async fn entries_for_player(&self, player_id: Uuid) -> AppResult<Vec<PoolEntry>>;

    /// Active members of a league pool, longest-standing first.
    async fn list_active(&self, league_id: Uuid) -> AppResult<Vec<PoolEntry>>;

    async fn insert(&self, entry: PoolEntry) -> AppResult<PoolEntry>;

    /// Persist membership flags and channel preferences.
    async fn update(&self, entry: PoolEntry) -> AppResult<PoolEntry>;

    async fn add_history(&self, history: PoolHistory) -> AppResult<()>;

    /// Bump `requests_received` after outreach.
    async fn record_request_sent(&self, player_id: Uuid, league_id: Uuid) -> AppResult<()>;

    /// Bump `requests_accepted` and refresh `last_active_at`.
    async fn record_acceptance(
        &self,
        player_id: Uuid,
        league_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()>;
}

/// Concrete implementation of PoolRepository
pub struct PoolStore {
    db: DatabaseConnection,
}

impl PoolStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_active_model(entry: PoolEntry) -> PoolActiveModel {
    PoolActiveModel {
        id: Set(entry.id),
        player_id: Set(entry.player_id),
        league_id: Set(entry.league_id),
        is_active: Set(entry.is_active),
        preferred_positions: Set(entry.preferred_positions),
        max_matches_per_week: Set(entry.max_matches_per_week),
        sms_for_sub_requests: Set(entry.sms_for_sub_requests),
        discord_for_sub_requests: Set(entry.discord_for_sub_requests),
        email_for_sub_requests: Set(entry.email_for_sub_requests),
        requests_received: Set(entry.requests_received),
        requests_accepted: Set(entry.requests_accepted),
        matches_played: Set(entry.matches_played),
        joined_pool_at: Set(entry.joined_pool_at),
        last_active_at: Set(entry.last_active_at),
    }
}

#[async_trait]
impl PoolRepository for PoolStore {
    async fn find_entry(&self, player_id: Uuid, league_id: Uuid) -> AppResult<Option<PoolEntry>> {
        let result = PoolEntity::find()
            .filter(substitute_pool::Column::PlayerId.eq(player_id))
            .filter(substitute_pool::Column::LeagueId.eq(league_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(PoolEntry::from))
    }

    async fn entries_for_player(&self, player_id: Uuid) -> AppResult<Vec<PoolEntry>> {
        let models = PoolEntity::find()
            .filter(substitute_pool::Column::PlayerId.eq(player_id))
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(PoolEntry::from).collect())
    }

    async fn list_active(&self, league_id: Uuid) -> AppResult<Vec<PoolEntry>> {
        let models = PoolEntity::find()
            .filter(substitute_pool::Column::LeagueId.eq(league_id))
            .filter(substitute_pool::Column::IsActive.eq(true))
            .order_by_asc(substitute_pool::Column::JoinedPoolAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(PoolEntry::from).collect())
    }

    async fn insert(&self, entry: PoolEntry) -> AppResult<PoolEntry> {
        let model = to_active_model(entry)
            .insert(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(PoolEntry::from(model))
    }

    async fn update(&self, entry: PoolEntry) -> AppResult<PoolEntry> {
        let model = to_active_model(entry)
            .update(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(PoolEntry::from(model))
    }

    async fn add_history(&self, history: PoolHistory) -> AppResult<()> {
        let active_model = HistoryActiveModel {
            id: Set(history.id),
            player_id: Set(history.player_id),
            league_id: Set(history.league_id),
            action: Set(history.action.as_str().to_string()),
            notes: Set(history.notes),
            performed_by: Set(history.performed_by),
            performed_at: Set(history.performed_at),
        };

        HistoryEntity::insert(active_model)
            .exec_without_returning(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn record_request_sent(&self, player_id: Uuid, league_id: Uuid) -> AppResult<()> {
        PoolEntity::update_many()
            .col_expr(
                substitute_pool::Column::RequestsReceived,
                Expr::col(substitute_pool::Column::RequestsReceived).add(1),
            )
            .filter(substitute_pool::Column::PlayerId.eq(player_id))
            .filter(substitute_pool::Column::LeagueId.eq(league_id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn record_acceptance(
        &self,
        player_id: Uuid,
        league_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        PoolEntity::update_many()
            .col_expr(
                substitute_pool::Column::RequestsAccepted,
                Expr::col(substitute_pool::Column::RequestsAccepted).add(1),
            )
            .col_expr(substitute_pool::Column::LastActiveAt, Expr::value(at))
            .filter(substitute_pool::Column::PlayerId.eq(player_id))
            .filter(substitute_pool::Column::LeagueId.eq(league_id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
