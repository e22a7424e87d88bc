//! Substitute request handlers.
//!
//! Requests, assignment, outreach and the availability board. Writes are
//! limited to coaches and admins.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{require_admin, require_substitute_manager, CurrentUser};
use crate::api::AppState;
use crate::domain::{
    Channel, GenderFilter, ResponseMethod, SubstituteAssignment, SubstituteRequest,
    SubstituteResponse,
};
use crate::errors::AppResult;
use crate::services::{
    AssignSubstitute, AvailabilityReport, ChannelResult, CreateSubRequest, OutreachReport,
    PoolOutreach, RequestDetails,
};

/// Open a substitute request for a team's match
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSubRequestBody {
    pub match_id: Uuid,
    pub team_id: Uuid,
    /// Comma separated positions, e.g. "DEF,MID"
    #[schema(example = "DEF,MID")]
    pub positions_needed: Option<String>,
    #[schema(example = "female")]
    pub gender_preference: Option<String>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
    #[validate(range(min = 1, max = 10, message = "substitutes_needed must be between 1 and 10"))]
    #[schema(example = 1, minimum = 1, maximum = 10)]
    pub substitutes_needed: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignSubstituteBody {
    pub player_id: Uuid,
    #[schema(example = "DEF")]
    pub position_assigned: Option<String>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

/// Pool-wide outreach filters
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct NotifyPoolBody {
    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    #[serde(default)]
    pub custom_message: String,
    /// Restrict delivery to these channels
    pub channels: Option<Vec<Channel>>,
    /// Only contact players of this gender (`male` or `female`)
    #[schema(example = "female")]
    pub gender_filter: Option<String>,
    #[serde(default)]
    pub position_filters: Vec<String>,
    /// Contact only these players
    pub player_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct NotifyPlayerBody {
    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    #[serde(default)]
    pub custom_message: String,
}

/// A free-text SMS or Discord answer relayed by the bot or SMS webhook
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InboundReplyBody {
    pub player_id: Uuid,
    #[validate(length(min = 1, message = "Reply text is required"))]
    #[schema(example = "YES")]
    pub text: String,
    pub method: ResponseMethod,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRequestsQuery {
    /// Only requests for matches in this league
    pub league_id: Option<Uuid>,
}

/// Create substitute request routes
pub fn substitute_routes() -> Router<AppState> {
    Router::new()
        .route("/requests", get(list_requests).post(create_request))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/cancel", post(cancel_request))
        .route("/requests/:id/assign", post(assign_substitute))
        .route("/requests/:id/notify", post(notify_pool))
        .route("/requests/:id/notify/:player_id", post(notify_player))
        .route("/requests/:id/availability", get(availability_status))
        .route("/replies", post(record_reply))
}

/// Open a substitute request
#[utoipa::path(
    post,
    path = "/substitutes/requests",
    tag = "Substitutes",
    security(("bearer_auth" = [])),
    request_body = CreateSubRequestBody,
    responses(
        (status = 201, description = "Request opened", body = SubstituteRequest),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - Coach or admin only")
    )
)]
pub async fn create_request(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateSubRequestBody>,
) -> AppResult<(StatusCode, Json<SubstituteRequest>)> {
    require_substitute_manager(&current_user)?;

    let request = state
        .services
        .substitutes()
        .create_request(CreateSubRequest {
            match_id: payload.match_id,
            team_id: payload.team_id,
            requested_by: current_user.id,
            positions_needed: payload.positions_needed,
            gender_preference: payload.gender_preference,
            notes: payload.notes,
            substitutes_needed: payload.substitutes_needed.unwrap_or(1),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

/// List open substitute requests
#[utoipa::path(
    get,
    path = "/substitutes/requests",
    tag = "Substitutes",
    security(("bearer_auth" = [])),
    params(ListRequestsQuery),
    responses(
        (status = 200, description = "Open requests, oldest first", body = Vec<SubstituteRequest>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<ListRequestsQuery>,
) -> AppResult<Json<Vec<SubstituteRequest>>> {
    let requests = state.services.substitutes().list_open(query.league_id).await?;
    Ok(Json(requests))
}

/// Get a request with its responses and assignments
#[utoipa::path(
    get,
    path = "/substitutes/requests/{id}",
    tag = "Substitutes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Substitute request ID")),
    responses(
        (status = 200, description = "Request details", body = RequestDetails),
        (status = 404, description = "Request not found")
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RequestDetails>> {
    let details = state.services.substitutes().get_request(id).await?;
    Ok(Json(details))
}

/// Cancel an open request
#[utoipa::path(
    post,
    path = "/substitutes/requests/{id}/cancel",
    tag = "Substitutes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Substitute request ID")),
    responses(
        (status = 200, description = "Request cancelled", body = SubstituteRequest),
        (status = 400, description = "Request is not open"),
        (status = 403, description = "Forbidden - Coach or admin only"),
        (status = 404, description = "Request not found")
    )
)]
pub async fn cancel_request(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SubstituteRequest>> {
    require_substitute_manager(&current_user)?;
    let request = state.services.substitutes().cancel_request(id).await?;
    Ok(Json(request))
}

/// Assign a player to an open request
#[utoipa::path(
    post,
    path = "/substitutes/requests/{id}/assign",
    tag = "Substitutes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Substitute request ID")),
    request_body = AssignSubstituteBody,
    responses(
        (status = 201, description = "Substitute assigned", body = SubstituteAssignment),
        (status = 400, description = "Request not open or player already assigned"),
        (status = 403, description = "Forbidden - Coach or admin only"),
        (status = 423, description = "Another assignment is in progress")
    )
)]
pub async fn assign_substitute(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AssignSubstituteBody>,
) -> AppResult<(StatusCode, Json<SubstituteAssignment>)> {
    require_substitute_manager(&current_user)?;

    let assignment = state
        .services
        .substitutes()
        .assign_substitute(AssignSubstitute {
            request_id: id,
            player_id: payload.player_id,
            assigned_by: current_user.id,
            position_assigned: payload.position_assigned,
            notes: payload.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

/// Contact the league's substitute pool
#[utoipa::path(
    post,
    path = "/substitutes/requests/{id}/notify",
    tag = "Substitutes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Substitute request ID")),
    request_body = NotifyPoolBody,
    responses(
        (status = 200, description = "Outreach counts", body = OutreachReport),
        (status = 400, description = "Request is not open"),
        (status = 403, description = "Forbidden - Coach or admin only")
    )
)]
pub async fn notify_pool(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<NotifyPoolBody>,
) -> AppResult<Json<OutreachReport>> {
    require_substitute_manager(&current_user)?;
    let gender_filter = GenderFilter::parse_optional(payload.gender_filter.as_deref())?;

    let report = state
        .services
        .sub_notifications()
        .notify_pool(
            id,
            PoolOutreach {
                custom_message: payload.custom_message,
                channels: payload.channels,
                gender_filter,
                position_filters: payload.position_filters,
                player_ids: payload.player_ids,
            },
        )
        .await?;

    Ok(Json(report))
}

/// Contact one player about a request
#[utoipa::path(
    post,
    path = "/substitutes/requests/{id}/notify/{player_id}",
    tag = "Substitutes",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Substitute request ID"),
        ("player_id" = Uuid, Path, description = "Player ID")
    ),
    request_body = NotifyPlayerBody,
    responses(
        (status = 200, description = "Channels used", body = ChannelResult),
        (status = 400, description = "Already contacted or no channels available"),
        (status = 403, description = "Forbidden - Coach or admin only")
    )
)]
pub async fn notify_player(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path((id, player_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<NotifyPlayerBody>,
) -> AppResult<Json<ChannelResult>> {
    require_substitute_manager(&current_user)?;

    let result = state
        .services
        .sub_notifications()
        .notify_individual(id, player_id, payload.custom_message)
        .await?;

    Ok(Json(result))
}

/// Who was contacted and who answered
#[utoipa::path(
    get,
    path = "/substitutes/requests/{id}/availability",
    tag = "Substitutes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Substitute request ID")),
    responses(
        (status = 200, description = "Availability board", body = AvailabilityReport),
        (status = 403, description = "Forbidden - Coach or admin only"),
        (status = 404, description = "Request not found")
    )
)]
pub async fn availability_status(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AvailabilityReport>> {
    require_substitute_manager(&current_user)?;
    let report = state.services.sub_responses().availability_status(id).await?;
    Ok(Json(report))
}

/// Record an inbound SMS or Discord reply (admin only)
#[utoipa::path(
    post,
    path = "/substitutes/replies",
    tag = "Substitutes",
    security(("bearer_auth" = [])),
    request_body = InboundReplyBody,
    responses(
        (status = 200, description = "Reply recorded", body = SubstituteResponse),
        (status = 400, description = "No active substitute request found"),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn record_reply(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<InboundReplyBody>,
) -> AppResult<Json<SubstituteResponse>> {
    require_admin(&current_user)?;

    let response = state
        .services
        .sub_responses()
        .process_reply(payload.player_id, &payload.text, payload.method)
        .await?;

    Ok(Json(response))
}
