//! Discord role sync handlers. Admin only.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::{post, put},
    Router,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::middleware::{require_admin, CurrentUser};
use crate::api::AppState;
use crate::domain::{RoleDiff, RoleSyncReport, SyncOutcome};
use crate::errors::AppResult;

/// Result of mirroring one role change to Discord
#[derive(Debug, Serialize, ToSchema)]
pub struct RoleChangeResponse {
    /// `synced`, `skipped` or `failed`
    #[schema(example = "synced")]
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<SyncOutcome> for RoleChangeResponse {
    fn from(outcome: SyncOutcome) -> Self {
        match outcome {
            SyncOutcome::Synced => Self {
                status: "synced",
                reason: None,
            },
            SyncOutcome::Skipped(reason) => Self {
                status: "skipped",
                reason: Some(reason),
            },
            SyncOutcome::Failed(reason) => Self {
                status: "failed",
                reason: Some(reason),
            },
        }
    }
}

/// Create role sync routes
pub fn role_routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(sync_all_roles))
        .route("/:id/sync", post(sync_role))
        .route(
            "/:id/members/:user_id",
            put(role_assigned).delete(role_removed),
        )
        .route("/users/:user_id/reconcile", post(reconcile_user))
}

/// Push one role to every holder
#[utoipa::path(
    post,
    path = "/roles/{id}/sync",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Per-role sync summary", body = RoleSyncReport),
        (status = 400, description = "Role not mapped or sync disabled"),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn sync_role(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RoleSyncReport>> {
    require_admin(&current_user)?;
    let report = state.services.role_sync().sync_role(id).await?;
    Ok(Json(report))
}

/// Sync every mapped role
#[utoipa::path(
    post,
    path = "/roles/sync",
    tag = "Roles",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "One summary per role", body = Vec<RoleSyncReport>),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn sync_all_roles(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<RoleSyncReport>>> {
    require_admin(&current_user)?;
    let reports = state.services.role_sync().sync_all().await?;
    Ok(Json(reports))
}

/// Mirror a role grant to Discord
#[utoipa::path(
    put,
    path = "/roles/{id}/members/{user_id}",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Role ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Discord outcome", body = RoleChangeResponse),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "User or role not found")
    )
)]
pub async fn role_assigned(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<RoleChangeResponse>> {
    require_admin(&current_user)?;
    let outcome = state.services.role_sync().on_role_assigned(user_id, id).await?;
    Ok(Json(outcome.into()))
}

/// Mirror a role removal to Discord
#[utoipa::path(
    delete,
    path = "/roles/{id}/members/{user_id}",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Role ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Discord outcome", body = RoleChangeResponse),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "User or role not found")
    )
)]
pub async fn role_removed(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<RoleChangeResponse>> {
    require_admin(&current_user)?;
    let outcome = state.services.role_sync().on_role_removed(user_id, id).await?;
    Ok(Json(outcome.into()))
}

/// Bring one member's Discord roles in line with their league roles
#[utoipa::path(
    post,
    path = "/roles/users/{user_id}/reconcile",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Roles added and removed", body = RoleDiff),
        (status = 400, description = "No Discord account or guild configured"),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn reconcile_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<RoleDiff>> {
    require_admin(&current_user)?;
    let diff = state.services.role_sync().reconcile_user(user_id).await?;
    Ok(Json(diff))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_mapping() {
        let synced = RoleChangeResponse::from(SyncOutcome::Synced);
        assert_eq!(synced.status, "synced");
        assert!(synced.reason.is_none());

        let skipped = RoleChangeResponse::from(SyncOutcome::Skipped("no discord".into()));
        assert_eq!(skipped.status, "skipped");
        assert_eq!(skipped.reason.as_deref(), Some("no discord"));
    }
}
