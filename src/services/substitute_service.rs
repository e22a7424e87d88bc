//! Substitute request lifecycle and serialized assignment.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{ASSIGNMENT_LOCK_WAIT_MS, DEFAULT_LOCK_TTL_SECONDS, MAX_SUBSTITUTES_NEEDED};
use crate::domain::{
    NewAssignment, NewSubstituteRequest, RequestStatus, SubstituteAssignment, SubstituteRequest,
    SubstituteResponse,
};
use crate::errors::{AppError, AppResult};
use crate::infra::{LockManager, UnitOfWork};
use crate::jobs::{ConfirmationJob, JobQueue};

/// Fields for opening a request.
#[derive(Debug, Clone)]
pub struct CreateSubRequest {
    pub match_id: Uuid,
    pub team_id: Uuid,
    pub requested_by: Uuid,
    pub positions_needed: Option<String>,
    pub gender_preference: Option<String>,
    pub notes: Option<String>,
    pub substitutes_needed: i32,
}

/// Fields for filling one slot of a request.
#[derive(Debug, Clone)]
pub struct AssignSubstitute {
    pub request_id: Uuid,
    pub player_id: Uuid,
    pub assigned_by: Uuid,
    pub position_assigned: Option<String>,
    pub notes: Option<String>,
}

/// A request together with its outreach and assignments.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestDetails {
    pub request: SubstituteRequest,
    pub responses: Vec<SubstituteResponse>,
    pub assignments: Vec<SubstituteAssignment>,
}

/// Substitute request service trait for dependency injection.
#[async_trait]
pub trait SubstituteService: Send + Sync {
    async fn create_request(&self, input: CreateSubRequest) -> AppResult<SubstituteRequest>;

    async fn cancel_request(&self, id: Uuid) -> AppResult<SubstituteRequest>;

    async fn get_request(&self, id: Uuid) -> AppResult<RequestDetails>;

    async fn list_open(&self, league_id: Option<Uuid>) -> AppResult<Vec<SubstituteRequest>>;

    async fn assign_substitute(&self, input: AssignSubstitute) -> AppResult<SubstituteAssignment>;

    /// Expire OPEN requests older than `days_old` days.
    async fn cleanup_expired(&self, days_old: i64) -> AppResult<u64>;
}

/// Concrete implementation of SubstituteService.
pub struct SubstituteManager<U: UnitOfWork> {
    uow: Arc<U>,
    locks: Arc<dyn LockManager>,
    jobs: Arc<dyn JobQueue>,
}

impl<U: UnitOfWork> SubstituteManager<U> {
    pub fn new(uow: Arc<U>, locks: Arc<dyn LockManager>, jobs: Arc<dyn JobQueue>) -> Self {
        Self { uow, locks, jobs }
    }

    async fn fill_slot(&self, input: AssignSubstitute) -> AppResult<SubstituteAssignment> {
        let request_id = input.request_id;
        let player_id = input.player_id;
        let new = NewAssignment {
            request_id,
            player_id,
            assigned_by: input.assigned_by,
            position_assigned: input.position_assigned,
            notes: input.notes,
        };

        self.uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let subs = ctx.substitutes();
                    let request = subs
                        .lock_request(request_id)
                        .await?
                        .ok_or(AppError::NotFound)?;

                    if !request.is_open() {
                        return Err(AppError::validation(format!(
                            "Substitute request is {}",
                            request.status
                        )));
                    }

                    if subs.find_assignment_for(request_id, player_id).await?.is_some() {
                        return Err(AppError::validation(
                            "Player is already assigned to this request",
                        ));
                    }

                    let assignment = subs.insert_assignment(new).await?;
                    let now = Utc::now();

                    let filled = subs.count_assignments(request_id).await?;
                    if filled >= u64::try_from(request.substitutes_needed).unwrap_or(1) {
                        subs.mark_filled(request_id, now).await?;
                        tracing::info!(request_id = %request_id, filled, "Substitute request filled");
                    }

                    ctx.pool()
                        .increment_matches_played(player_id, request.league_id, now)
                        .await?;

                    Ok(assignment)
                })
            })
            .await
    }
}

#[async_trait]
impl<U: UnitOfWork> SubstituteService for SubstituteManager<U> {
    async fn create_request(&self, input: CreateSubRequest) -> AppResult<SubstituteRequest> {
        if !(1..=MAX_SUBSTITUTES_NEEDED).contains(&input.substitutes_needed) {
            return Err(AppError::validation(format!(
                "substitutes_needed must be between 1 and {}",
                MAX_SUBSTITUTES_NEEDED
            )));
        }

        let game = self
            .uow
            .league()
            .find_match(input.match_id)
            .await?
            .ok_or_else(|| AppError::validation("Match not found"))?;

        self.uow
            .league()
            .find_team(input.team_id)
            .await?
            .ok_or_else(|| AppError::validation("Team not found"))?;

        if !game.involves_team(input.team_id) {
            return Err(AppError::validation("Team is not playing in this match"));
        }

        if self
            .uow
            .substitutes()
            .find_open_request(input.team_id, input.match_id)
            .await?
            .is_some()
        {
            return Err(AppError::validation(
                "An open substitute request already exists for this team and match",
            ));
        }

        let request = self
            .uow
            .substitutes()
            .create_request(NewSubstituteRequest {
                match_id: input.match_id,
                team_id: input.team_id,
                league_id: game.league_id,
                requested_by: input.requested_by,
                positions_needed: input.positions_needed,
                gender_preference: input.gender_preference,
                notes: input.notes,
                substitutes_needed: input.substitutes_needed,
            })
            .await?;

        tracing::info!(
            request_id = %request.id,
            match_id = %request.match_id,
            team_id = %request.team_id,
            needed = request.substitutes_needed,
            "Substitute request created"
        );
        Ok(request)
    }

    async fn cancel_request(&self, id: Uuid) -> AppResult<SubstituteRequest> {
        let request = self
            .uow
            .substitutes()
            .find_request(id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !request.is_open() {
            return Err(AppError::validation(format!(
                "Only open requests can be cancelled (status: {})",
                request.status
            )));
        }

        let request = self
            .uow
            .substitutes()
            .update_status(id, RequestStatus::Cancelled)
            .await?;
        tracing::info!(request_id = %id, "Substitute request cancelled");
        Ok(request)
    }

    async fn get_request(&self, id: Uuid) -> AppResult<RequestDetails> {
        let subs = self.uow.substitutes();
        let request = subs.find_request(id).await?.ok_or(AppError::NotFound)?;
        let (responses, assignments) = tokio::try_join!(
            subs.responses_for_request(id),
            subs.assignments_for_request(id),
        )?;

        Ok(RequestDetails {
            request,
            responses,
            assignments,
        })
    }

    async fn list_open(&self, league_id: Option<Uuid>) -> AppResult<Vec<SubstituteRequest>> {
        self.uow.substitutes().list_open(league_id).await
    }

    async fn assign_substitute(&self, input: AssignSubstitute) -> AppResult<SubstituteAssignment> {
        self.uow
            .league()
            .find_player(input.player_id)
            .await?
            .ok_or_else(|| AppError::validation("Player not found"))?;

        let resource = format!("sub_request:{}", input.request_id);
        let guard = self
            .locks
            .acquire(&resource, DEFAULT_LOCK_TTL_SECONDS, ASSIGNMENT_LOCK_WAIT_MS)
            .await?
            .ok_or_else(|| {
                AppError::locked("Another assignment is in progress for this request, please retry")
            })?;

        let result = self.fill_slot(input).await;

        if let Err(e) = guard.release().await {
            tracing::warn!(resource, error = %e, "Failed to release assignment lock");
        }
        let assignment = result?;

        tracing::info!(
            assignment_id = %assignment.id,
            request_id = %assignment.request_id,
            player_id = %assignment.player_id,
            "Substitute assigned"
        );

        if let Err(e) = self
            .jobs
            .enqueue_confirmation(ConfirmationJob {
                assignment_id: assignment.id,
            })
            .await
        {
            tracing::error!(assignment_id = %assignment.id, error = %e, "Failed to queue confirmation");
        }

        Ok(assignment)
    }

    async fn cleanup_expired(&self, days_old: i64) -> AppResult<u64> {
        if days_old < 0 {
            return Err(AppError::validation("days_old must not be negative"));
        }
        let cutoff = Utc::now() - Duration::days(days_old);
        let expired = self.uow.substitutes().expire_open_before(cutoff).await?;
        tracing::info!(expired, days_old, "Expired stale substitute requests");
        Ok(expired)
    }
}
