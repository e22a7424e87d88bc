//! Substitute pool handlers.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::ensure_own_player;
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{GenderFilter, PoolEntry, PoolPreferences};
use crate::errors::AppResult;
use crate::services::{PlayerSubStats, PoolMember};

/// Preferences shared by join and update
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct PoolPreferencesBody {
    /// Comma separated positions, e.g. "GK,DEF"
    #[schema(example = "GK,DEF")]
    pub preferred_positions: Option<String>,
    #[validate(range(min = 1, max = 7, message = "max_matches_per_week must be between 1 and 7"))]
    pub max_matches_per_week: Option<i32>,
    pub sms_for_sub_requests: Option<bool>,
    pub discord_for_sub_requests: Option<bool>,
    pub email_for_sub_requests: Option<bool>,
}

impl From<PoolPreferencesBody> for PoolPreferences {
    fn from(body: PoolPreferencesBody) -> Self {
        Self {
            preferred_positions: body.preferred_positions,
            max_matches_per_week: body.max_matches_per_week,
            sms_for_sub_requests: body.sms_for_sub_requests,
            discord_for_sub_requests: body.discord_for_sub_requests,
            email_for_sub_requests: body.email_for_sub_requests,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct JoinPoolBody {
    pub player_id: Uuid,
    pub league_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub preferences: PoolPreferencesBody,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePoolBody {
    pub league_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub preferences: PoolPreferencesBody,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaguePoolQuery {
    pub league_id: Uuid,
    /// Only members with this gender (`male` or `female`)
    pub gender: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaveQuery {
    pub league_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EntryQuery {
    pub league_id: Uuid,
}

/// Create substitute pool routes
pub fn pool_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pool).post(join_pool))
        .route(
            "/:player_id",
            get(get_entry).put(update_preferences).delete(leave_pool),
        )
        .route("/:player_id/stats", get(player_stats))
}

/// Join a league's substitute pool (own player, or coach/admin)
#[utoipa::path(
    post,
    path = "/substitutes/pool",
    tag = "Substitute Pool",
    security(("bearer_auth" = [])),
    request_body = JoinPoolBody,
    responses(
        (status = 201, description = "Pool entry created or re-activated", body = PoolEntry),
        (status = 400, description = "Already in the pool"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn join_pool(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<JoinPoolBody>,
) -> AppResult<(StatusCode, Json<PoolEntry>)> {
    ensure_own_player(&state, &current_user, payload.player_id).await?;

    let entry = state
        .services
        .pool()
        .join_pool(
            payload.player_id,
            payload.league_id,
            payload.preferences.into(),
            Some(current_user.id),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// Leave a league's substitute pool
#[utoipa::path(
    delete,
    path = "/substitutes/pool/{player_id}",
    tag = "Substitute Pool",
    security(("bearer_auth" = [])),
    params(("player_id" = Uuid, Path, description = "Player ID"), LeaveQuery),
    responses(
        (status = 200, description = "Pool entry deactivated", body = PoolEntry),
        (status = 400, description = "Not in the pool"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn leave_pool(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(player_id): Path<Uuid>,
    Query(query): Query<LeaveQuery>,
) -> AppResult<Json<PoolEntry>> {
    ensure_own_player(&state, &current_user, player_id).await?;

    let entry = state
        .services
        .pool()
        .leave_pool(player_id, query.league_id, Some(current_user.id), query.notes)
        .await?;

    Ok(Json(entry))
}

/// Change pool preferences
#[utoipa::path(
    put,
    path = "/substitutes/pool/{player_id}",
    tag = "Substitute Pool",
    security(("bearer_auth" = [])),
    params(("player_id" = Uuid, Path, description = "Player ID")),
    request_body = UpdatePoolBody,
    responses(
        (status = 200, description = "Preferences updated", body = PoolEntry),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not in the pool")
    )
)]
pub async fn update_preferences(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(player_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdatePoolBody>,
) -> AppResult<Json<PoolEntry>> {
    ensure_own_player(&state, &current_user, player_id).await?;

    let entry = state
        .services
        .pool()
        .update_preferences(
            player_id,
            payload.league_id,
            payload.preferences.into(),
            Some(current_user.id),
        )
        .await?;

    Ok(Json(entry))
}

/// A player's pool entry for one league
#[utoipa::path(
    get,
    path = "/substitutes/pool/{player_id}",
    tag = "Substitute Pool",
    security(("bearer_auth" = [])),
    params(("player_id" = Uuid, Path, description = "Player ID"), EntryQuery),
    responses(
        (status = 200, description = "Pool entry", body = PoolEntry),
        (status = 404, description = "Not in the pool")
    )
)]
pub async fn get_entry(
    State(state): State<AppState>,
    Path(player_id): Path<Uuid>,
    Query(query): Query<EntryQuery>,
) -> AppResult<Json<PoolEntry>> {
    let entry = state.services.pool().get_entry(player_id, query.league_id).await?;
    Ok(Json(entry))
}

/// Active pool members for a league
#[utoipa::path(
    get,
    path = "/substitutes/pool",
    tag = "Substitute Pool",
    security(("bearer_auth" = [])),
    params(LeaguePoolQuery),
    responses(
        (status = 200, description = "Active members", body = Vec<PoolMember>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_pool(
    State(state): State<AppState>,
    Query(query): Query<LeaguePoolQuery>,
) -> AppResult<Json<Vec<PoolMember>>> {
    let gender = GenderFilter::parse_optional(query.gender.as_deref())?;
    let members = state
        .services
        .pool()
        .list_active(query.league_id, gender)
        .await?;
    Ok(Json(members))
}

/// Substitute activity for a player
#[utoipa::path(
    get,
    path = "/substitutes/pool/{player_id}/stats",
    tag = "Substitute Pool",
    security(("bearer_auth" = [])),
    params(("player_id" = Uuid, Path, description = "Player ID")),
    responses(
        (status = 200, description = "Player statistics", body = PlayerSubStats),
        (status = 404, description = "Player not found")
    )
)]
pub async fn player_stats(
    State(state): State<AppState>,
    Path(player_id): Path<Uuid>,
) -> AppResult<Json<PlayerSubStats>> {
    let stats = state.services.pool().player_stats(player_id).await?;
    Ok(Json(stats))
}
