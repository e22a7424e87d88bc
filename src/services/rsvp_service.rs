//! RSVP service - Serialized, idempotent availability updates.
//!
//! Every write takes a per-player distributed lock, then a row lock inside
//! the availability repository. Events are published only after commit.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::container::batch;
use crate::config::{
    DEFAULT_LOCK_TTL_SECONDS, RSVP_BULK_BATCH_SIZE, RSVP_LOCK_WAIT_MS, RSVP_OPERATION_TTL_SECONDS,
};
use crate::domain::{
    AvailabilityWrite, Match, Player, RsvpEvent, RsvpResponse, RsvpSource,
    EVENT_TYPE_RSVP_UPDATED,
};
use crate::errors::{AppError, AppResult};
use crate::infra::{EventPublisher, IdempotencyStore, LockManager, PublisherStats, UnitOfWork};

/// One availability change request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RsvpCommand {
    pub match_id: Uuid,
    pub player_id: Uuid,
    /// `yes`, `no`, `maybe` or `no_response`
    pub response: String,
    pub source: RsvpSource,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Operation ids are client supplied, so records are scoped to the player.
fn operation_key(player_id: Uuid, operation_id: &str) -> String {
    format!("{}:{}", player_id, operation_id)
}

/// Outcome of one update. Also the record replayed for duplicate operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RsvpResult {
    pub success: bool,
    pub message: String,
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub old_response: RsvpResponse,
    pub new_response: RsvpResponse,
    pub operation_id: String,
    pub trace_id: String,
    pub event: Option<RsvpEvent>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkFailure {
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkSummary {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkRsvpResult {
    pub successful: Vec<RsvpResult>,
    pub failed: Vec<BulkFailure>,
    pub events: Vec<RsvpEvent>,
    pub summary: BulkSummary,
}

/// A player's answer as shown in match summaries.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerRsvp {
    pub player_id: Uuid,
    pub player_name: String,
    pub discord_id: Option<String>,
    pub responded_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RsvpCounts {
    pub yes: usize,
    pub no: usize,
    pub maybe: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum RsvpStatus {
    Player {
        match_id: Uuid,
        player_id: Uuid,
        response: RsvpResponse,
        responded_at: Option<chrono::DateTime<Utc>>,
    },
    Match {
        match_id: Uuid,
        yes: Vec<PlayerRsvp>,
        no: Vec<PlayerRsvp>,
        maybe: Vec<PlayerRsvp>,
        counts: RsvpCounts,
    },
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RsvpMetrics {
    pub operations_processed: u64,
    pub duplicate_operations: u64,
    pub validation_errors: u64,
    pub concurrent_conflicts: u64,
    /// Percentage of requests that replayed a stored operation
    pub duplicate_rate: f64,
    /// Percentage of processed operations rejected by validation or conflicts
    pub error_rate: f64,
    pub publisher: PublisherStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RsvpHealth {
    pub status: HealthStatus,
    pub database: bool,
    pub redis: bool,
    pub publisher: bool,
}

impl RsvpHealth {
    pub fn from_checks(database: bool, redis: bool, publisher: bool) -> Self {
        let status = if !database {
            HealthStatus::Critical
        } else if !redis || !publisher {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        Self {
            status,
            database,
            redis,
            publisher,
        }
    }
}

/// RSVP service trait for dependency injection.
#[async_trait]
pub trait RsvpService: Send + Sync {
    async fn update_rsvp(&self, cmd: RsvpCommand) -> AppResult<RsvpResult>;

    /// Apply many updates in batches; individual failures do not stop the rest.
    async fn bulk_update_rsvps(&self, cmds: Vec<RsvpCommand>) -> AppResult<BulkRsvpResult>;

    async fn get_rsvp_status(
        &self,
        match_id: Uuid,
        player_id: Option<Uuid>,
    ) -> AppResult<RsvpStatus>;

    /// The player profile linked to a user account.
    async fn player_for_user(&self, user_id: Uuid) -> AppResult<Player>;

    fn metrics(&self) -> RsvpMetrics;

    async fn health_check(&self) -> RsvpHealth;
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    duplicates: AtomicU64,
    validation_errors: AtomicU64,
    conflicts: AtomicU64,
}

fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Concrete implementation of RsvpService.
pub struct RsvpCoordinator<U: UnitOfWork> {
    uow: Arc<U>,
    locks: Arc<dyn LockManager>,
    operations: Arc<dyn IdempotencyStore>,
    events: Arc<dyn EventPublisher>,
    counters: Counters,
}

impl<U: UnitOfWork> RsvpCoordinator<U> {
    pub fn new(
        uow: Arc<U>,
        locks: Arc<dyn LockManager>,
        operations: Arc<dyn IdempotencyStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            uow,
            locks,
            operations,
            events,
            counters: Counters::default(),
        }
    }

    async fn replay(&self, player_id: Uuid, operation_id: &str) -> Option<RsvpResult> {
        match self.operations.get_operation(&operation_key(player_id, operation_id)).await {
            Ok(Some(stored)) => match serde_json::from_value(stored) {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::warn!(operation_id, error = %e, "Stored operation unreadable");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(operation_id, error = %e, "Operation lookup failed, continuing");
                None
            }
        }
    }

    async fn remember(&self, result: &RsvpResult) {
        let stored = match serde_json::to_value(result) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Could not serialize operation result");
                return;
            }
        };
        if let Err(e) = self
            .operations
            .store_operation(
                &operation_key(result.player_id, &result.operation_id),
                stored,
                RSVP_OPERATION_TTL_SECONDS,
            )
            .await
        {
            tracing::warn!(operation_id = %result.operation_id, error = %e, "Failed to store operation record");
        }
    }

    async fn validate(
        &self,
        cmd: &RsvpCommand,
    ) -> AppResult<(RsvpResponse, Match, Player)> {
        let response: RsvpResponse = cmd.response.parse()?;

        let game = self
            .uow
            .league()
            .find_match(cmd.match_id)
            .await?
            .ok_or_else(|| AppError::validation(format!("Match {} not found", cmd.match_id)))?;

        let player = self
            .uow
            .league()
            .find_player(cmd.player_id)
            .await?
            .ok_or_else(|| AppError::validation(format!("Player {} not found", cmd.player_id)))?;

        if game.is_past(Utc::now().date_naive()) {
            return Err(AppError::validation("Cannot RSVP to past matches"));
        }

        if cmd.source == RsvpSource::Discord
            && player.discord_id.as_deref().map_or(true, str::is_empty)
        {
            return Err(AppError::validation("Player has no linked Discord account"));
        }

        Ok((response, game, player))
    }

    fn track_error(&self, e: &AppError) {
        match e {
            AppError::Validation(_) | AppError::NotFound => {
                self.counters.validation_errors.fetch_add(1, Ordering::Relaxed);
            }
            AppError::ConcurrentUpdate => {
                self.counters.conflicts.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    async fn apply(&self, cmd: RsvpCommand, operation_id: String) -> AppResult<RsvpResult> {
        let trace_id = cmd
            .trace_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let (new_response, game, player) = self.validate(&cmd).await?;

        let resource = format!("rsvp:{}:{}", cmd.match_id, cmd.player_id);
        let guard = match self
            .locks
            .acquire(&resource, DEFAULT_LOCK_TTL_SECONDS, RSVP_LOCK_WAIT_MS)
            .await
        {
            Ok(Some(guard)) => guard,
            Ok(None) => return Err(AppError::ConcurrentUpdate),
            Err(e) => {
                tracing::warn!(resource, error = %e, "RSVP lock unavailable");
                return Err(AppError::ConcurrentUpdate);
            }
        };

        let write = AvailabilityWrite {
            match_id: cmd.match_id,
            player_id: cmd.player_id,
            discord_id: player.discord_id.clone(),
            response: new_response,
            operation_id: operation_id.clone(),
            trace_id: trace_id.clone(),
        };
        let applied = self.uow.availability().apply_change(write).await;

        if let Err(e) = guard.release().await {
            tracing::warn!(resource, error = %e, "Failed to release RSVP lock");
        }
        let applied = applied?;

        if !applied.changed() {
            return Ok(RsvpResult {
                success: true,
                message: "No change required".to_string(),
                match_id: cmd.match_id,
                player_id: cmd.player_id,
                old_response: applied.old_response,
                new_response,
                operation_id,
                trace_id,
                event: None,
            });
        }

        let event = RsvpEvent {
            event_id: Uuid::new_v4(),
            event_type: EVENT_TYPE_RSVP_UPDATED.to_string(),
            match_id: cmd.match_id,
            player_id: cmd.player_id,
            old_response: applied.old_response,
            new_response,
            discord_id: player.discord_id.clone(),
            player_name: player.name.clone(),
            team_id: player.team_for_match(game.home_team_id, game.away_team_id),
            source: cmd.source,
            trace_id: trace_id.clone(),
            operation_id: operation_id.clone(),
            user_agent: cmd.user_agent,
            ip_address: cmd.ip_address,
            session_id: cmd.session_id,
            occurred_at: Utc::now(),
        };

        if let Err(e) = self.events.publish(&event).await {
            tracing::error!(event_id = %event.event_id, error = %e, "RSVP committed but event publish failed");
        }

        tracing::info!(
            match_id = %cmd.match_id,
            player_id = %cmd.player_id,
            old = %applied.old_response,
            new = %new_response,
            source = %cmd.source,
            trace_id = %trace_id,
            "RSVP updated"
        );

        Ok(RsvpResult {
            success: true,
            message: format!("RSVP updated to {}", new_response),
            match_id: cmd.match_id,
            player_id: cmd.player_id,
            old_response: applied.old_response,
            new_response,
            operation_id,
            trace_id,
            event: Some(event),
        })
    }
}

#[async_trait]
impl<U: UnitOfWork> RsvpService for RsvpCoordinator<U> {
    async fn update_rsvp(&self, cmd: RsvpCommand) -> AppResult<RsvpResult> {
        if let Some(operation_id) = cmd.operation_id.as_deref() {
            if let Some(previous) = self.replay(cmd.player_id, operation_id).await {
                self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(operation_id, "Duplicate RSVP operation");
                return Ok(previous);
            }
        }

        self.counters.processed.fetch_add(1, Ordering::Relaxed);
        let operation_id = cmd
            .operation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        match self.apply(cmd, operation_id).await {
            Ok(result) => {
                self.remember(&result).await;
                Ok(result)
            }
            Err(e) => {
                self.track_error(&e);
                Err(e)
            }
        }
    }

    async fn bulk_update_rsvps(&self, cmds: Vec<RsvpCommand>) -> AppResult<BulkRsvpResult> {
        let total = cmds.len();
        let outcomes = batch::process(cmds, RSVP_BULK_BATCH_SIZE, |cmd| async move {
            let key = (cmd.match_id, cmd.player_id);
            Ok((key, self.update_rsvp(cmd).await))
        })
        .await?;

        let mut successful = Vec::new();
        let mut failed = Vec::new();
        let mut events = Vec::new();
        for ((match_id, player_id), outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    if let Some(event) = &result.event {
                        events.push(event.clone());
                    }
                    successful.push(result);
                }
                Err(e) => failed.push(BulkFailure {
                    match_id,
                    player_id,
                    error: e.user_message(),
                }),
            }
        }

        let summary = BulkSummary {
            total,
            success_count: successful.len(),
            failure_count: failed.len(),
        };
        tracing::info!(
            total,
            succeeded = summary.success_count,
            failed = summary.failure_count,
            "Bulk RSVP update finished"
        );

        Ok(BulkRsvpResult {
            successful,
            failed,
            events,
            summary,
        })
    }

    async fn get_rsvp_status(
        &self,
        match_id: Uuid,
        player_id: Option<Uuid>,
    ) -> AppResult<RsvpStatus> {
        if let Some(player_id) = player_id {
            let row = self.uow.availability().find(match_id, player_id).await?;
            return Ok(RsvpStatus::Player {
                match_id,
                player_id,
                response: row
                    .as_ref()
                    .map(|r| r.response)
                    .unwrap_or(RsvpResponse::NoResponse),
                responded_at: row.map(|r| r.responded_at),
            });
        }

        let rows = self.uow.availability().list_for_match(match_id).await?;
        let player_ids: Vec<Uuid> = rows.iter().map(|r| r.player_id).collect();
        let names: HashMap<Uuid, String> = self
            .uow
            .league()
            .find_players(player_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let mut yes = Vec::new();
        let mut no = Vec::new();
        let mut maybe = Vec::new();
        for row in rows {
            let entry = PlayerRsvp {
                player_id: row.player_id,
                player_name: names.get(&row.player_id).cloned().unwrap_or_default(),
                discord_id: row.discord_id,
                responded_at: row.responded_at,
            };
            match row.response {
                RsvpResponse::Yes => yes.push(entry),
                RsvpResponse::No => no.push(entry),
                RsvpResponse::Maybe => maybe.push(entry),
                RsvpResponse::NoResponse => {}
            }
        }

        let counts = RsvpCounts {
            yes: yes.len(),
            no: no.len(),
            maybe: maybe.len(),
            total: yes.len() + no.len() + maybe.len(),
        };
        Ok(RsvpStatus::Match {
            match_id,
            yes,
            no,
            maybe,
            counts,
        })
    }

    async fn player_for_user(&self, user_id: Uuid) -> AppResult<Player> {
        self.uow
            .league()
            .find_player_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::validation("User account not linked to a player profile"))
    }

    fn metrics(&self) -> RsvpMetrics {
        let processed = self.counters.processed.load(Ordering::Relaxed);
        let duplicates = self.counters.duplicates.load(Ordering::Relaxed);
        let validation_errors = self.counters.validation_errors.load(Ordering::Relaxed);
        let conflicts = self.counters.conflicts.load(Ordering::Relaxed);

        RsvpMetrics {
            operations_processed: processed,
            duplicate_operations: duplicates,
            validation_errors,
            concurrent_conflicts: conflicts,
            duplicate_rate: rate(duplicates, processed + duplicates),
            error_rate: rate(validation_errors + conflicts, processed),
            publisher: self.events.stats(),
        }
    }

    async fn health_check(&self) -> RsvpHealth {
        let availability = self.uow.availability();
        let (database, redis, publisher) = tokio::join!(
            availability.ping(),
            self.operations.ping(),
            self.events.health_check(),
        );

        for (component, result) in [("database", &database), ("redis", &redis), ("publisher", &publisher)] {
            if let Err(e) = result {
                tracing::warn!(component, error = %e, "Health check failed");
            }
        }

        RsvpHealth::from_checks(database.is_ok(), redis.is_ok(), publisher.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_levels() {
        assert_eq!(RsvpHealth::from_checks(true, true, true).status, HealthStatus::Healthy);
        assert_eq!(RsvpHealth::from_checks(true, false, true).status, HealthStatus::Degraded);
        assert_eq!(RsvpHealth::from_checks(true, true, false).status, HealthStatus::Degraded);
        assert_eq!(RsvpHealth::from_checks(false, true, true).status, HealthStatus::Critical);
    }

    #[test]
    fn test_rates() {
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(1, 4), 25.0);
    }
}
