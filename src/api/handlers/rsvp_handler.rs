//! RSVP handlers.

use axum::{
    extract::{ConnectInfo, Extension, Path, Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use axum_extra::{headers::UserAgent, TypedHeader};
use serde::Deserialize;
use std::net::SocketAddr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{client_ip, require_admin, CurrentUser};
use crate::api::AppState;
use crate::domain::RsvpSource;
use crate::errors::AppResult;
use crate::services::{BulkRsvpResult, RsvpCommand, RsvpMetrics, RsvpResult, RsvpStatus};

/// Availability update for the caller's own player
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRsvpRequest {
    /// `yes`, `no`, `maybe` or `no_response`
    #[schema(example = "yes")]
    pub response: String,
    /// Client generated id; retries with the same id replay the first result
    #[validate(length(min = 1, max = 128, message = "operation_id must be 1-128 characters"))]
    pub operation_id: Option<String>,
    pub session_id: Option<String>,
}

/// Batch of updates applied on behalf of players
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkRsvpRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 updates per request"))]
    pub updates: Vec<RsvpCommand>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RsvpStatusQuery {
    /// Narrow the summary to one player
    pub player_id: Option<Uuid>,
}

/// Create RSVP routes
pub fn rsvp_routes() -> Router<AppState> {
    Router::new()
        .route("/matches/:match_id", get(get_rsvp_status).put(update_rsvp))
        .route("/bulk", post(bulk_update_rsvps))
        .route("/metrics", get(rsvp_metrics))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// Update the caller's availability for a match
#[utoipa::path(
    put,
    path = "/rsvp/matches/{match_id}",
    tag = "RSVP",
    security(("bearer_auth" = [])),
    params(("match_id" = Uuid, Path, description = "Match ID")),
    request_body = UpdateRsvpRequest,
    responses(
        (status = 200, description = "RSVP recorded", body = RsvpResult),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Concurrent update, retry")
    )
)]
pub async fn update_rsvp(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    user_agent: Option<TypedHeader<UserAgent>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<UpdateRsvpRequest>,
) -> AppResult<Json<RsvpResult>> {
    let rsvp = state.services.rsvp();
    let player = rsvp.player_for_user(current_user.id).await?;

    let result = rsvp
        .update_rsvp(RsvpCommand {
            match_id,
            player_id: player.id,
            response: payload.response,
            source: RsvpSource::Web,
            operation_id: payload.operation_id,
            trace_id: header_value(&headers, "X-Request-Id"),
            user_agent: user_agent.map(|TypedHeader(ua)| ua.as_str().to_string()),
            ip_address: Some(client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr))),
            session_id: payload.session_id,
        })
        .await?;

    Ok(Json(result))
}

/// Apply many availability updates (admin only)
#[utoipa::path(
    post,
    path = "/rsvp/bulk",
    tag = "RSVP",
    security(("bearer_auth" = [])),
    request_body = BulkRsvpRequest,
    responses(
        (status = 200, description = "Per-update results", body = BulkRsvpResult),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn bulk_update_rsvps(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<BulkRsvpRequest>,
) -> AppResult<Json<BulkRsvpResult>> {
    require_admin(&current_user)?;
    let result = state.services.rsvp().bulk_update_rsvps(payload.updates).await?;
    Ok(Json(result))
}

/// Availability summary for a match, or one player's answer
#[utoipa::path(
    get,
    path = "/rsvp/matches/{match_id}",
    tag = "RSVP",
    security(("bearer_auth" = [])),
    params(
        ("match_id" = Uuid, Path, description = "Match ID"),
        RsvpStatusQuery
    ),
    responses(
        (status = 200, description = "RSVP status", body = RsvpStatus),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_rsvp_status(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Query(query): Query<RsvpStatusQuery>,
) -> AppResult<Json<RsvpStatus>> {
    let status = state
        .services
        .rsvp()
        .get_rsvp_status(match_id, query.player_id)
        .await?;
    Ok(Json(status))
}

/// RSVP processing counters (admin only)
#[utoipa::path(
    get,
    path = "/rsvp/metrics",
    tag = "RSVP",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Counters since startup", body = RsvpMetrics),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn rsvp_metrics(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<RsvpMetrics>> {
    require_admin(&current_user)?;
    Ok(Json(state.services.rsvp().metrics()))
}
