//! Substitute requests, outreach responses and assignments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use super::entities::substitute_assignment::{
    self, ActiveModel as AssignmentActiveModel, Entity as AssignmentEntity,
};
use super::entities::substitute_request::{
    self, ActiveModel as RequestActiveModel, Entity as RequestEntity,
};
use super::entities::substitute_response::{
    self, ActiveModel as ResponseActiveModel, Entity as ResponseEntity,
};
use crate::domain::substitute::join_channels;
use crate::domain::{
    Channel, NewSubstituteRequest, NewSubstituteResponse, RecordedAnswer, RequestStatus,
    SubstituteAssignment, SubstituteRequest, SubstituteResponse,
};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Most recently notified response of `player_id` whose request is still open.
fn latest_open_response_query(player_id: Uuid) -> Select<ResponseEntity> {
    ResponseEntity::find()
        .inner_join(RequestEntity)
        .filter(substitute_response::Column::PlayerId.eq(player_id))
        .filter(substitute_response::Column::NotificationSentAt.is_not_null())
        .filter(substitute_request::Column::Status.eq(RequestStatus::Open.as_str()))
        .order_by_desc(substitute_response::Column::NotificationSentAt)
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SubstituteRepository: Send + Sync {
    // Requests

    async fn create_request(&self, new: NewSubstituteRequest) -> AppResult<SubstituteRequest>;

    async fn find_request(&self, id: Uuid) -> AppResult<Option<SubstituteRequest>>;

    /// OPEN request for the same team and match, if any.
    async fn find_open_request(
        &self,
        team_id: Uuid,
        match_id: Uuid,
    ) -> AppResult<Option<SubstituteRequest>>;

    /// OPEN requests, newest first, optionally for one league.
    async fn list_open(&self, league_id: Option<Uuid>) -> AppResult<Vec<SubstituteRequest>>;

    async fn update_status(&self, id: Uuid, status: RequestStatus) -> AppResult<SubstituteRequest>;

    /// Expire OPEN requests created before `cutoff`; returns how many changed.
    async fn expire_open_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    // Responses

    async fn create_response(&self, new: NewSubstituteResponse) -> AppResult<SubstituteResponse>;

    async fn find_response(
        &self,
        request_id: Uuid,
        player_id: Uuid,
    ) -> AppResult<Option<SubstituteResponse>>;

    async fn find_response_by_token(&self, token: &str) -> AppResult<Option<SubstituteResponse>>;

    async fn responses_for_request(&self, request_id: Uuid) -> AppResult<Vec<SubstituteResponse>>;

    async fn record_answer(
        &self,
        response_id: Uuid,
        answer: RecordedAnswer,
    ) -> AppResult<SubstituteResponse>;

    /// Most recently notified response of an OPEN request for this player.
    async fn latest_open_response(&self, player_id: Uuid)
        -> AppResult<Option<SubstituteResponse>>;

    // Assignments

    async fn find_assignment(&self, id: Uuid) -> AppResult<Option<SubstituteAssignment>>;

    async fn assignments_for_request(
        &self,
        request_id: Uuid,
    ) -> AppResult<Vec<SubstituteAssignment>>;

    async fn assignments_for_player(
        &self,
        player_id: Uuid,
        limit: u64,
    ) -> AppResult<Vec<SubstituteAssignment>>;

    async fn mark_assignment_notified(
        &self,
        id: Uuid,
        methods: Vec<Channel>,
        at: DateTime<Utc>,
    ) -> AppResult<()>;
}

/// Concrete implementation of SubstituteRepository
pub struct SubstituteStore {
    db: DatabaseConnection,
}

impl SubstituteStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubstituteRepository for SubstituteStore {
    async fn create_request(&self, new: NewSubstituteRequest) -> AppResult<SubstituteRequest> {
        let now = Utc::now();
        let active_model = RequestActiveModel {
            id: Set(Uuid::new_v4()),
            match_id: Set(new.match_id),
            team_id: Set(new.team_id),
            league_id: Set(new.league_id),
            requested_by: Set(new.requested_by),
            positions_needed: Set(new.positions_needed),
            gender_preference: Set(new.gender_preference),
            notes: Set(new.notes),
            status: Set(RequestStatus::Open.as_str().to_string()),
            substitutes_needed: Set(new.substitutes_needed),
            filled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(SubstituteRequest::from(model))
    }

    async fn find_request(&self, id: Uuid) -> AppResult<Option<SubstituteRequest>> {
        let result = RequestEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(SubstituteRequest::from))
    }

    async fn find_open_request(
        &self,
        team_id: Uuid,
        match_id: Uuid,
    ) -> AppResult<Option<SubstituteRequest>> {
        let result = RequestEntity::find()
            .filter(substitute_request::Column::TeamId.eq(team_id))
            .filter(substitute_request::Column::MatchId.eq(match_id))
            .filter(substitute_request::Column::Status.eq(RequestStatus::Open.as_str()))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(SubstituteRequest::from))
    }

    async fn list_open(&self, league_id: Option<Uuid>) -> AppResult<Vec<SubstituteRequest>> {
        let mut query = RequestEntity::find()
            .filter(substitute_request::Column::Status.eq(RequestStatus::Open.as_str()));
        if let Some(league_id) = league_id {
            query = query.filter(substitute_request::Column::LeagueId.eq(league_id));
        }

        let models = query
            .order_by_desc(substitute_request::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(SubstituteRequest::from).collect())
    }

    async fn update_status(&self, id: Uuid, status: RequestStatus) -> AppResult<SubstituteRequest> {
        let model = RequestEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: RequestActiveModel = model.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(SubstituteRequest::from(model))
    }

    async fn expire_open_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = RequestEntity::update_many()
            .col_expr(
                substitute_request::Column::Status,
                Expr::value(RequestStatus::Expired.as_str()),
            )
            .col_expr(substitute_request::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(substitute_request::Column::Status.eq(RequestStatus::Open.as_str()))
            .filter(substitute_request::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }

    async fn create_response(&self, new: NewSubstituteResponse) -> AppResult<SubstituteResponse> {
        let now = Utc::now();
        let active_model = ResponseActiveModel {
            id: Set(Uuid::new_v4()),
            request_id: Set(new.request_id),
            player_id: Set(new.player_id),
            is_available: Set(None),
            response_method: Set(None),
            response_text: Set(None),
            notification_sent_at: Set(Some(now)),
            notification_methods: Set(Some(join_channels(&new.notification_methods))),
            responded_at: Set(None),
            rsvp_token: Set(new.rsvp_token),
            token_expires_at: Set(new.token_expires_at),
            token_used_at: Set(None),
            created_at: Set(now),
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(SubstituteResponse::from(model))
    }

    async fn find_response(
        &self,
        request_id: Uuid,
        player_id: Uuid,
    ) -> AppResult<Option<SubstituteResponse>> {
        let result = ResponseEntity::find()
            .filter(substitute_response::Column::RequestId.eq(request_id))
            .filter(substitute_response::Column::PlayerId.eq(player_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(SubstituteResponse::from))
    }

    async fn find_response_by_token(&self, token: &str) -> AppResult<Option<SubstituteResponse>> {
        let result = ResponseEntity::find()
            .filter(substitute_response::Column::RsvpToken.eq(token))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(SubstituteResponse::from))
    }

    async fn responses_for_request(&self, request_id: Uuid) -> AppResult<Vec<SubstituteResponse>> {
        let models = ResponseEntity::find()
            .filter(substitute_response::Column::RequestId.eq(request_id))
            .order_by_asc(substitute_response::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(SubstituteResponse::from).collect())
    }

    async fn record_answer(
        &self,
        response_id: Uuid,
        answer: RecordedAnswer,
    ) -> AppResult<SubstituteResponse> {
        let model = ResponseEntity::find_by_id(response_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let now = Utc::now();
        let mut active: ResponseActiveModel = model.into();
        active.is_available = Set(Some(answer.is_available));
        active.response_method = Set(Some(answer.method.as_str().to_string()));
        active.response_text = Set(answer.text);
        active.responded_at = Set(Some(now));
        if answer.mark_token_used {
            active.token_used_at = Set(Some(now));
        }

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(SubstituteResponse::from(model))
    }

    async fn latest_open_response(
        &self,
        player_id: Uuid,
    ) -> AppResult<Option<SubstituteResponse>> {
        let result = latest_open_response_query(player_id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(SubstituteResponse::from))
    }

    async fn find_assignment(&self, id: Uuid) -> AppResult<Option<SubstituteAssignment>> {
        let result = AssignmentEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(SubstituteAssignment::from))
    }

    async fn assignments_for_request(
        &self,
        request_id: Uuid,
    ) -> AppResult<Vec<SubstituteAssignment>> {
        let models = AssignmentEntity::find()
            .filter(substitute_assignment::Column::RequestId.eq(request_id))
            .order_by_asc(substitute_assignment::Column::AssignedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(SubstituteAssignment::from).collect())
    }

    async fn assignments_for_player(
        &self,
        player_id: Uuid,
        limit: u64,
    ) -> AppResult<Vec<SubstituteAssignment>> {
        let models = AssignmentEntity::find()
            .filter(substitute_assignment::Column::PlayerId.eq(player_id))
            .order_by_desc(substitute_assignment::Column::AssignedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(SubstituteAssignment::from).collect())
    }

    async fn mark_assignment_notified(
        &self,
        id: Uuid,
        methods: Vec<Channel>,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let model = AssignmentEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: AssignmentActiveModel = model.into();
        active.notification_sent = Set(true);
        active.notification_sent_at = Set(Some(at));
        active.notification_methods = Set(Some(join_channels(&methods)));

        active.update(&self.db).await.map_err(AppError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_latest_open_response_is_one_joined_query() {
        let sql = latest_open_response_query(Uuid::nil())
            .limit(1)
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#"INNER JOIN "substitute_requests""#));
        assert!(sql.contains(r#""substitute_requests"."status" = 'OPEN'"#));
        assert!(sql.contains(r#""notification_sent_at" IS NOT NULL"#));
        assert!(sql.contains(r#"ORDER BY "substitute_responses"."notification_sent_at" DESC"#));
    }
}
