//! Application route configuration.

use std::time::Duration;

use axum::{
    extract::State,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, StatusCode,
    },
    middleware,
    response::Json,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    draft_routes, notification_routes, pool_routes, role_routes, rsvp_routes, sub_rsvp_routes,
    substitute_routes,
};
use super::middleware::{auth_middleware, rate_limit_middleware, rate_limit_public_middleware};
use super::openapi::ApiDoc;
use super::AppState;
use crate::config::CORS_MAX_AGE_SECONDS;
use crate::services::{HealthStatus, RsvpHealth};

/// Wrap a router in JWT auth plus the general rate limit.
fn protected(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
}

/// Browser clients call the API from the league site
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(CORS_MAX_AGE_SECONDS))
}

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    // The substitute pool lives under /substitutes but keeps its own router
    let substitutes = substitute_routes().nest("/pool", pool_routes());

    Router::new()
        // Health check endpoints (no rate limiting)
        .route("/", get(root))
        .route("/health", get(health))
        // OpenAPI Swagger UI documentation
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Token links opened from messages (stricter rate limiting)
        .nest(
            "/sub-rsvp",
            sub_rsvp_routes(state.clone()).route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_public_middleware,
            )),
        )
        // Protected routes (require JWT + general rate limiting)
        .nest("/rsvp", protected(rsvp_routes(), &state))
        .nest("/substitutes", protected(substitutes, &state))
        .nest("/notifications", protected(notification_routes(), &state))
        .nest("/draft", protected(draft_routes(), &state))
        .nest("/roles", protected(role_routes(), &state))
        // Global middleware
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "League Coordinator"
}

/// Health check endpoint covering the database, Redis and the event publisher
async fn health(State(state): State<AppState>) -> (StatusCode, Json<RsvpHealth>) {
    let health = state.services.rsvp().health_check().await;

    let status_code = match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Critical => StatusCode::SERVICE_UNAVAILABLE,
    };

    if health.status != HealthStatus::Healthy {
        tracing::warn!(
            database = health.database,
            redis = health.redis,
            publisher = health.publisher,
            "Health check not healthy"
        );
    }

    (status_code, Json(health))
}
