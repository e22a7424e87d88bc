//! Substitute pool membership.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    GenderFilter, PoolAction, PoolEntry, PoolHistory, PoolPreferences, SubstituteAssignment,
};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

const RECENT_ASSIGNMENTS_LIMIT: u64 = 10;

/// Active pool member with the player details needed for filtering.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PoolMember {
    #[serde(flatten)]
    pub entry: PoolEntry,
    pub player_name: String,
    pub gender: Option<String>,
    pub acceptance_rate: f64,
}

/// Substitute activity for one player across every league pool.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSubStats {
    pub player_id: Uuid,
    pub requests_received: i32,
    pub requests_accepted: i32,
    pub matches_played: i32,
    pub acceptance_rate: f64,
    pub recent_assignments: Vec<SubstituteAssignment>,
}

/// Pool service trait for dependency injection.
#[async_trait]
pub trait PoolService: Send + Sync {
    /// Add the player to the league pool, or re-activate an old entry.
    async fn join_pool(
        &self,
        player_id: Uuid,
        league_id: Uuid,
        preferences: PoolPreferences,
        performed_by: Option<Uuid>,
    ) -> AppResult<PoolEntry>;

    async fn leave_pool(
        &self,
        player_id: Uuid,
        league_id: Uuid,
        performed_by: Option<Uuid>,
        notes: Option<String>,
    ) -> AppResult<PoolEntry>;

    async fn update_preferences(
        &self,
        player_id: Uuid,
        league_id: Uuid,
        preferences: PoolPreferences,
        performed_by: Option<Uuid>,
    ) -> AppResult<PoolEntry>;

    async fn get_entry(&self, player_id: Uuid, league_id: Uuid) -> AppResult<PoolEntry>;

    async fn list_active(
        &self,
        league_id: Uuid,
        gender: Option<GenderFilter>,
    ) -> AppResult<Vec<PoolMember>>;

    async fn player_stats(&self, player_id: Uuid) -> AppResult<PlayerSubStats>;
}

/// Concrete implementation of PoolService.
pub struct PoolManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> PoolManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    async fn record(
        &self,
        entry: &PoolEntry,
        action: PoolAction,
        performed_by: Option<Uuid>,
        notes: Option<String>,
    ) {
        let history = PoolHistory {
            id: Uuid::new_v4(),
            player_id: entry.player_id,
            league_id: entry.league_id,
            action,
            notes,
            performed_by,
            performed_at: Utc::now(),
        };
        if let Err(e) = self.uow.pool().add_history(history).await {
            tracing::warn!(player_id = %entry.player_id, action = action.as_str(), error = %e, "Failed to record pool history");
        }
    }
}

fn apply_preferences(entry: &mut PoolEntry, prefs: PoolPreferences) {
    if let Some(positions) = prefs.preferred_positions {
        entry.preferred_positions = Some(positions).filter(|p| !p.trim().is_empty());
    }
    if prefs.max_matches_per_week.is_some() {
        entry.max_matches_per_week = prefs.max_matches_per_week;
    }
    if let Some(sms) = prefs.sms_for_sub_requests {
        entry.sms_for_sub_requests = sms;
    }
    if let Some(discord) = prefs.discord_for_sub_requests {
        entry.discord_for_sub_requests = discord;
    }
    if let Some(email) = prefs.email_for_sub_requests {
        entry.email_for_sub_requests = email;
    }
}

fn new_entry(player_id: Uuid, league_id: Uuid) -> PoolEntry {
    PoolEntry {
        id: Uuid::new_v4(),
        player_id,
        league_id,
        is_active: true,
        preferred_positions: None,
        max_matches_per_week: None,
        sms_for_sub_requests: true,
        discord_for_sub_requests: true,
        email_for_sub_requests: true,
        requests_received: 0,
        requests_accepted: 0,
        matches_played: 0,
        joined_pool_at: Utc::now(),
        last_active_at: None,
    }
}

#[async_trait]
impl<U: UnitOfWork> PoolService for PoolManager<U> {
    async fn join_pool(
        &self,
        player_id: Uuid,
        league_id: Uuid,
        preferences: PoolPreferences,
        performed_by: Option<Uuid>,
    ) -> AppResult<PoolEntry> {
        self.uow
            .league()
            .find_player(player_id)
            .await?
            .ok_or_else(|| AppError::validation("Player not found"))?;

        let (entry, action) = match self.uow.pool().find_entry(player_id, league_id).await? {
            Some(entry) if entry.is_active => {
                return Err(AppError::validation(
                    "Player is already in the substitute pool for this league",
                ));
            }
            Some(mut entry) => {
                entry.is_active = true;
                entry.last_active_at = Some(Utc::now());
                apply_preferences(&mut entry, preferences);
                (self.uow.pool().update(entry).await?, PoolAction::Activated)
            }
            None => {
                let mut entry = new_entry(player_id, league_id);
                apply_preferences(&mut entry, preferences);
                (self.uow.pool().insert(entry).await?, PoolAction::Added)
            }
        };

        self.record(&entry, action, performed_by, None).await;
        tracing::info!(player_id = %player_id, league_id = %league_id, action = action.as_str(), "Player joined substitute pool");
        Ok(entry)
    }

    async fn leave_pool(
        &self,
        player_id: Uuid,
        league_id: Uuid,
        performed_by: Option<Uuid>,
        notes: Option<String>,
    ) -> AppResult<PoolEntry> {
        let mut entry = self
            .uow
            .pool()
            .find_entry(player_id, league_id)
            .await?
            .filter(|e| e.is_active)
            .ok_or_else(|| AppError::validation("Player is not in the substitute pool"))?;

        entry.is_active = false;
        let entry = self.uow.pool().update(entry).await?;

        self.record(&entry, PoolAction::Removed, performed_by, notes).await;
        tracing::info!(player_id = %player_id, league_id = %league_id, "Player left substitute pool");
        Ok(entry)
    }

    async fn update_preferences(
        &self,
        player_id: Uuid,
        league_id: Uuid,
        preferences: PoolPreferences,
        performed_by: Option<Uuid>,
    ) -> AppResult<PoolEntry> {
        let mut entry = self.get_entry(player_id, league_id).await?;
        apply_preferences(&mut entry, preferences);
        let entry = self.uow.pool().update(entry).await?;

        self.record(&entry, PoolAction::PreferencesUpdated, performed_by, None)
            .await;
        Ok(entry)
    }

    async fn get_entry(&self, player_id: Uuid, league_id: Uuid) -> AppResult<PoolEntry> {
        self.uow
            .pool()
            .find_entry(player_id, league_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn list_active(
        &self,
        league_id: Uuid,
        gender: Option<GenderFilter>,
    ) -> AppResult<Vec<PoolMember>> {
        let entries = self.uow.pool().list_active(league_id).await?;
        let ids = entries.iter().map(|e| e.player_id).collect();
        let players: HashMap<Uuid, _> = self
            .uow
            .league()
            .find_players(ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let members = entries
            .into_iter()
            .filter_map(|entry| {
                let player = players.get(&entry.player_id)?;
                if gender.is_some_and(|wanted| !wanted.admits(player.gender.as_deref())) {
                    return None;
                }
                Some(PoolMember {
                    acceptance_rate: entry.acceptance_rate(),
                    player_name: player.name.clone(),
                    gender: player.gender.clone(),
                    entry,
                })
            })
            .collect();

        Ok(members)
    }

    async fn player_stats(&self, player_id: Uuid) -> AppResult<PlayerSubStats> {
        let pool = self.uow.pool();
        let substitutes = self.uow.substitutes();
        let (entries, recent_assignments) = tokio::try_join!(
            pool.entries_for_player(player_id),
            substitutes.assignments_for_player(player_id, RECENT_ASSIGNMENTS_LIMIT),
        )?;

        let received: i32 = entries.iter().map(|e| e.requests_received).sum();
        let accepted: i32 = entries.iter().map(|e| e.requests_accepted).sum();
        let played: i32 = entries.iter().map(|e| e.matches_played).sum();

        Ok(PlayerSubStats {
            player_id,
            requests_received: received,
            requests_accepted: accepted,
            matches_played: played,
            acceptance_rate: crate::domain::substitute::acceptance_rate(received, accepted),
            recent_assignments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_only_touch_given_fields() {
        let mut entry = new_entry(Uuid::new_v4(), Uuid::new_v4());
        apply_preferences(
            &mut entry,
            PoolPreferences {
                preferred_positions: Some("GK, DEF".to_string()),
                sms_for_sub_requests: Some(false),
                ..Default::default()
            },
        );
        assert_eq!(entry.preferred_positions.as_deref(), Some("GK, DEF"));
        assert!(!entry.sms_for_sub_requests);
        assert!(entry.email_for_sub_requests);
        assert!(entry.discord_for_sub_requests);
    }

    #[test]
    fn test_blank_positions_clear_preference() {
        let mut entry = new_entry(Uuid::new_v4(), Uuid::new_v4());
        entry.preferred_positions = Some("GK".to_string());
        apply_preferences(
            &mut entry,
            PoolPreferences {
                preferred_positions: Some("  ".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(entry.preferred_positions, None);
    }
}
