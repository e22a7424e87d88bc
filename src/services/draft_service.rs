//! Draft picks, serialized per player.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{DEFAULT_LOCK_TTL_SECONDS, DRAFT_LOCK_WAIT_MS};
use crate::domain::{DraftEvent, Player, Team, EVENT_TYPE_PLAYER_DRAFTED};
use crate::errors::{AppError, AppResult};
use crate::infra::{EventPublisher, LockManager, UnitOfWork};

pub const DRAFT_IN_PROGRESS_MESSAGE: &str =
    "Draft operation in progress for this player, please wait";

#[derive(Debug, Clone)]
pub struct DraftPick {
    pub player_id: Uuid,
    pub team_id: Uuid,
    pub season: Option<String>,
    pub drafted_by: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DraftResult {
    pub player: Player,
    pub team: Team,
    /// Stream entry id, absent when publication failed.
    pub event_id: Option<String>,
}

/// Draft service trait for dependency injection.
#[async_trait]
pub trait DraftService: Send + Sync {
    async fn draft_player(&self, pick: DraftPick) -> AppResult<DraftResult>;
}

/// Concrete implementation of DraftService.
pub struct DraftManager<U: UnitOfWork> {
    uow: Arc<U>,
    locks: Arc<dyn LockManager>,
    events: Arc<dyn EventPublisher>,
}

impl<U: UnitOfWork> DraftManager<U> {
    pub fn new(uow: Arc<U>, locks: Arc<dyn LockManager>, events: Arc<dyn EventPublisher>) -> Self {
        Self { uow, locks, events }
    }

    async fn assign(&self, pick: &DraftPick) -> AppResult<(Player, Team)> {
        let player = self
            .uow
            .league()
            .find_player(pick.player_id)
            .await?
            .ok_or_else(|| AppError::validation("Player not found"))?;
        let team = self
            .uow
            .league()
            .find_team(pick.team_id)
            .await?
            .ok_or_else(|| AppError::validation("Team not found"))?;

        let mut current = player.team_ids.clone();
        if let Some(primary) = player.primary_team_id {
            if !current.contains(&primary) {
                current.push(primary);
            }
        }
        let existing = self.uow.league().find_teams(current).await?;
        if let Some(taken) = existing.iter().find(|t| t.league_id == team.league_id) {
            return Err(AppError::validation(format!(
                "Player \"{}\" is already assigned to {} in this league",
                player.name, taken.name
            )));
        }

        let player = self
            .uow
            .league()
            .set_primary_team(player.id, team.id)
            .await?;
        Ok((player, team))
    }
}

#[async_trait]
impl<U: UnitOfWork> DraftService for DraftManager<U> {
    async fn draft_player(&self, pick: DraftPick) -> AppResult<DraftResult> {
        let resource = format!("draft:{}", pick.player_id);
        // Dropping the guard on any early return releases the lock.
        let guard = self
            .locks
            .acquire(&resource, DEFAULT_LOCK_TTL_SECONDS, DRAFT_LOCK_WAIT_MS)
            .await?
            .ok_or_else(|| AppError::locked(DRAFT_IN_PROGRESS_MESSAGE))?;

        let assigned = self.assign(&pick).await;
        if let Err(e) = guard.release().await {
            tracing::warn!(resource, error = %e, "Failed to release draft lock");
        }
        let (player, team) = assigned?;

        let event = DraftEvent {
            event_id: Uuid::new_v4(),
            event_type: EVENT_TYPE_PLAYER_DRAFTED.to_string(),
            player_id: player.id,
            player_name: player.name.clone(),
            team_id: team.id,
            team_name: team.name.clone(),
            league_id: team.league_id,
            season: pick.season.clone(),
            drafted_by: pick.drafted_by,
            occurred_at: Utc::now(),
        };
        let event_id = match self.events.publish_draft(&event).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(player_id = %player.id, error = %e, "Draft saved but event publish failed");
                None
            }
        };

        tracing::info!(
            player_id = %player.id,
            team_id = %team.id,
            drafted_by = %pick.drafted_by,
            "Player drafted"
        );
        Ok(DraftResult {
            player,
            team,
            event_id,
        })
    }
}
