//! Token based substitute RSVP handlers.
//!
//! Opening the link needs no login; answering does, so the answer can be
//! matched against the player the token was issued to.

use axum::{
    extract::{Extension, Path, State},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{auth_middleware, CurrentUser};
use crate::api::AppState;
use crate::errors::AppResult;
use crate::services::{ResponseReceipt, TokenContext};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TokenAnswerBody {
    pub is_available: bool,
    #[validate(length(max = 500, message = "Response text must be at most 500 characters"))]
    pub response_text: Option<String>,
}

/// Create substitute RSVP routes
pub fn sub_rsvp_routes(state: AppState) -> Router<AppState> {
    Router::new().route(
        "/:token",
        get(validate_token).merge(
            post(respond_with_token)
                .route_layer(middleware::from_fn_with_state(state, auth_middleware)),
        ),
    )
}

/// Check a token and show what it points at
#[utoipa::path(
    get,
    path = "/sub-rsvp/{token}",
    tag = "Substitute RSVP",
    params(("token" = String, Path, description = "RSVP token from the outreach message")),
    responses(
        (status = 200, description = "Token is valid", body = TokenContext),
        (status = 400, description = "Invalid, used or expired token")
    )
)]
pub async fn validate_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<TokenContext>> {
    let context = state.services.sub_responses().validate_token(&token).await?;
    Ok(Json(context))
}

/// Answer a substitute request
#[utoipa::path(
    post,
    path = "/sub-rsvp/{token}",
    tag = "Substitute RSVP",
    security(("bearer_auth" = [])),
    params(("token" = String, Path, description = "RSVP token from the outreach message")),
    request_body = TokenAnswerBody,
    responses(
        (status = 200, description = "Answer recorded", body = ResponseReceipt),
        (status = 400, description = "Invalid token or already answered"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn respond_with_token(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(token): Path<String>,
    ValidatedJson(payload): ValidatedJson<TokenAnswerBody>,
) -> AppResult<Json<ResponseReceipt>> {
    let receipt = state
        .services
        .sub_responses()
        .process_response(
            &token,
            current_user.id,
            payload.is_available,
            payload.response_text,
        )
        .await?;

    Ok(Json(receipt))
}
