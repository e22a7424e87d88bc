//! Notification handlers.

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{require_admin, CurrentUser};
use crate::api::AppState;
use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::domain::{Notification, NotificationPayload};
use crate::errors::AppResult;
use crate::jobs::NotificationJob;
use crate::types::MessageResponse;

/// Notification to deliver, optionally in the background
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendNotificationBody {
    #[serde(flatten)]
    pub payload: NotificationPayload,
    /// Queue the delivery and return 202 instead of waiting for it
    #[serde(default)]
    pub defer: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListNotificationsQuery {
    /// Maximum number of notifications, newest first
    pub limit: Option<u64>,
}

/// Create notification routes
pub fn notification_routes() -> Router<AppState> {
    Router::new().route("/", get(list_notifications).post(send_notification))
}

/// Send a notification to a set of users (admin only)
#[utoipa::path(
    post,
    path = "/notifications",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    request_body = SendNotificationBody,
    responses(
        (status = 200, description = "Per-channel delivery counts", body = crate::domain::DeliveryReport),
        (status = 202, description = "Delivery queued", body = MessageResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn send_notification(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<SendNotificationBody>,
) -> AppResult<Response> {
    require_admin(&current_user)?;

    if body.defer {
        let recipients = body.payload.user_ids.len();
        state
            .jobs
            .enqueue_notification(NotificationJob {
                payload: body.payload,
            })
            .await?;
        let message = MessageResponse::new(format!("Notification queued for {} users", recipients));
        return Ok((StatusCode::ACCEPTED, Json(message)).into_response());
    }

    let report = state.services.notifications().send(body.payload).await?;
    Ok(Json(report).into_response())
}

/// The caller's in-app notifications
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(ListNotificationsQuery),
    responses(
        (status = 200, description = "Newest notifications first", body = Vec<Notification>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_notifications(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let notifications = state
        .services
        .notifications()
        .list(current_user.id, limit)
        .await?;
    Ok(Json(notifications))
}
