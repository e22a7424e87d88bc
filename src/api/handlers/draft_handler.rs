//! Draft handlers.

use axum::{
    extract::{Extension, State},
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{require_admin, CurrentUser};
use crate::api::AppState;
use crate::errors::AppResult;
use crate::services::{DraftPick, DraftResult};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DraftPickBody {
    pub player_id: Uuid,
    pub team_id: Uuid,
    #[validate(length(min = 1, max = 50, message = "Season must be 1-50 characters"))]
    #[schema(example = "2026 Fall")]
    pub season: Option<String>,
}

/// Create draft routes
pub fn draft_routes() -> Router<AppState> {
    Router::new().route("/", post(draft_player))
}

/// Draft a player onto a team (admin only)
#[utoipa::path(
    post,
    path = "/draft",
    tag = "Draft",
    security(("bearer_auth" = [])),
    request_body = DraftPickBody,
    responses(
        (status = 200, description = "Player drafted", body = DraftResult),
        (status = 400, description = "Player already on a team in this league"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 423, description = "Draft operation in progress for this player")
    )
)]
pub async fn draft_player(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<DraftPickBody>,
) -> AppResult<Json<DraftResult>> {
    require_admin(&current_user)?;

    let result = state
        .services
        .draft()
        .draft_player(DraftPick {
            player_id: payload.player_id,
            team_id: payload.team_id,
            season: payload.season,
            drafted_by: current_user.id,
        })
        .await?;

    Ok(Json(result))
}
