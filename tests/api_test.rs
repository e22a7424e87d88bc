//! Integration tests for API endpoints.
//!
//! The router runs against mocked services and a mocked rate limiter, so
//! no database or Redis connection is needed.

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use league_coordinator::api::create_router;
use league_coordinator::config::Config;
use league_coordinator::domain::{
    AppliedChange, RsvpResponse, RsvpSource, RsvpTransition, User, UserRole,
};
use league_coordinator::errors::AppError;
use league_coordinator::infra::{
    LockGuard, MockEventPublisher, MockIdempotencyStore, MockLockManager, MockRateLimiter,
    PublishOutcome, PublisherStats,
};
use league_coordinator::jobs::MockJobQueue;
use league_coordinator::services::{
    AuthService, Authenticator, MockServiceContainer, PoolManager, PoolService,
    RsvpCoordinator, RsvpService, SubResponseManager, SubResponseService,
};
use league_coordinator::AppState;

use common::{player, upcoming_match, TestUnitOfWork};

// =============================================================================
// Test Helpers
// =============================================================================

fn allow_all() -> MockRateLimiter {
    let mut limiter = MockRateLimiter::new();
    limiter.expect_hit().returning(|_, _, _| Ok((1, true)));
    limiter
}

fn app(services: MockServiceContainer, limiter: MockRateLimiter) -> Router {
    create_router(AppState::new(
        Arc::new(services),
        Arc::new(limiter),
        Arc::new(MockJobQueue::new()),
    ))
}

/// Authenticator whose user lookup hands out `role` to every id.
fn authenticator(role: UserRole) -> Arc<dyn AuthService> {
    let mut uow = TestUnitOfWork::default();
    uow.users.expect_find_by_id().returning(move |id| {
        let mut user = User::new(id, "Jordan Coach".to_string());
        user.role = role.clone();
        Ok(Some(user))
    });
    Arc::new(Authenticator::new(uow.build(), Config::for_testing()))
}

async fn bearer(auth: &Arc<dyn AuthService>) -> String {
    let token = tokio_test::assert_ok!(auth.issue_token(Uuid::new_v4()).await);
    format!("Bearer {}", token.access_token)
}

/// RSVP coordinator whose health checks report the given results.
fn rsvp_with_health(database_up: bool, redis_up: bool) -> Arc<dyn RsvpService> {
    let mut uow = TestUnitOfWork::default();
    uow.availability.expect_ping().returning(move || {
        if database_up {
            Ok(())
        } else {
            Err(AppError::internal("connection refused"))
        }
    });

    let mut operations = MockIdempotencyStore::new();
    operations.expect_ping().returning(move || {
        if redis_up {
            Ok(())
        } else {
            Err(AppError::internal("redis down"))
        }
    });

    let mut events = MockEventPublisher::new();
    events.expect_health_check().returning(|| Ok(()));
    events.expect_stats().returning(|| PublisherStats {
        published: 12,
        failed: 1,
        duplicates: 2,
    });

    Arc::new(RsvpCoordinator::new(
        uow.build(),
        Arc::new(MockLockManager::new()),
        Arc::new(operations),
        Arc::new(events),
    ))
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// =============================================================================
// Public Endpoints
// =============================================================================

#[tokio::test]
async fn test_root_endpoint() {
    let response = app(MockServiceContainer::new(), MockRateLimiter::new())
        .oneshot(get("/"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"League Coordinator");
}

#[tokio::test]
async fn test_health_reports_degraded_as_ok() {
    let mut services = MockServiceContainer::new();
    let rsvp = rsvp_with_health(true, false);
    services.expect_rsvp().returning(move || rsvp.clone());

    let response = app(services, MockRateLimiter::new())
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], true);
    assert_eq!(body["redis"], false);
}

#[tokio::test]
async fn test_health_without_database_is_unavailable() {
    let mut services = MockServiceContainer::new();
    let rsvp = rsvp_with_health(false, true);
    services.expect_rsvp().returning(move || rsvp.clone());

    let response = app(services, MockRateLimiter::new())
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["status"], "critical");
}

#[tokio::test]
async fn test_cors_preflight() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/rsvp/metrics")
        .header(header::ORIGIN, "https://league.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();

    let response = app(MockServiceContainer::new(), MockRateLimiter::new())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

// =============================================================================
// Token RSVP Links
// =============================================================================

#[tokio::test]
async fn test_malformed_rsvp_token_is_rejected() {
    let mut services = MockServiceContainer::new();
    let responses: Arc<dyn SubResponseService> =
        Arc::new(SubResponseManager::new(TestUnitOfWork::default().build()));
    services
        .expect_sub_responses()
        .returning(move || responses.clone());

    let response = app(services, allow_all())
        .oneshot(get("/sub-rsvp/not-a-token"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_public_rate_limit_uses_its_own_scope() {
    let mut limiter = MockRateLimiter::new();
    limiter
        .expect_hit()
        .withf(|key, _, _| key.starts_with("public:"))
        .returning(|_, max, _| Ok((max + 1, false)));

    let response = app(MockServiceContainer::new(), limiter)
        .oneshot(get("/sub-rsvp/0123456789abcdef0123456789abcdef"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("Retry-After"));
}

// =============================================================================
// Protected Endpoints
// =============================================================================

#[tokio::test]
async fn test_protected_route_requires_token() {
    let response = app(MockServiceContainer::new(), allow_all())
        .oneshot(get("/rsvp/metrics"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_rate_limit_rejects_before_auth() {
    let mut limiter = MockRateLimiter::new();
    limiter.expect_hit().returning(|_, max, _| Ok((max + 1, false)));

    let response = app(MockServiceContainer::new(), limiter)
        .oneshot(get("/rsvp/metrics"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["X-RateLimit-Remaining"], "0");
}

#[tokio::test]
async fn test_rate_limiter_failure_denies_request() {
    let mut limiter = MockRateLimiter::new();
    limiter
        .expect_hit()
        .returning(|_, _, _| Err(AppError::internal("redis down")));

    let response = app(MockServiceContainer::new(), limiter)
        .oneshot(get("/rsvp/metrics"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_metrics_are_admin_only() {
    let auth = authenticator(UserRole::Coach);
    let token = bearer(&auth).await;

    let mut services = MockServiceContainer::new();
    services.expect_auth().returning(move || auth.clone());

    let request = Request::builder()
        .uri("/rsvp/metrics")
        .header(header::AUTHORIZATION, token)
        .body(Body::empty())
        .unwrap();
    let response = app(services, allow_all()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_reads_metrics() {
    let auth = authenticator(UserRole::Admin);
    let token = bearer(&auth).await;

    let mut services = MockServiceContainer::new();
    services.expect_auth().returning(move || auth.clone());
    let rsvp = rsvp_with_health(true, true);
    services.expect_rsvp().returning(move || rsvp.clone());

    let request = Request::builder()
        .uri("/rsvp/metrics")
        .header(header::AUTHORIZATION, token)
        .body(Body::empty())
        .unwrap();
    let response = app(services, allow_all()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-RateLimit-Limit"));
    let body = json_body(response).await;
    assert_eq!(body["operations_processed"], 0);
    assert_eq!(body["publisher"]["published"], 12);
}

#[tokio::test]
async fn test_draft_requires_admin() {
    let auth = authenticator(UserRole::User);
    let token = bearer(&auth).await;

    let mut services = MockServiceContainer::new();
    services.expect_auth().returning(move || auth.clone());

    let body = serde_json::json!({
        "player_id": Uuid::new_v4(),
        "team_id": Uuid::new_v4(),
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/draft")
        .header(header::AUTHORIZATION, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app(services, allow_all()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let mut services = MockServiceContainer::new();
    let auth = authenticator(UserRole::Admin);
    services.expect_auth().returning(move || auth.clone());

    let request = Request::builder()
        .uri("/notifications")
        .header(header::AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let response = app(services, allow_all()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rsvp_update_is_recorded_as_web() {
    let auth = authenticator(UserRole::User);
    let token = bearer(&auth).await;
    let (match_id, player_id, team_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut uow = TestUnitOfWork::default();
    uow.league
        .expect_find_player_by_user()
        .returning(move |_| Ok(Some(player(player_id, team_id))));
    uow.league
        .expect_find_player()
        .returning(move |id| Ok(Some(player(id, team_id))));
    uow.league
        .expect_find_match()
        .returning(move |id| Ok(Some(upcoming_match(id, team_id, Uuid::new_v4()))));
    uow.availability.expect_apply_change().returning(|write| {
        assert_eq!(write.response, RsvpResponse::Yes);
        Ok(AppliedChange {
            old_response: RsvpResponse::NoResponse,
            transition: RsvpTransition::Upsert(RsvpResponse::Yes),
        })
    });

    let mut locks = MockLockManager::new();
    locks
        .expect_acquire()
        .returning(|resource, _, _| Ok(Some(LockGuard::unmanaged(resource))));

    let key = format!("{}:retry-7", player_id);
    let mut operations = MockIdempotencyStore::new();
    let lookup = key.clone();
    operations
        .expect_get_operation()
        .withf(move |k| k == lookup)
        .returning(|_| Ok(None));
    operations
        .expect_store_operation()
        .withf(move |k, _, _| k == key)
        .returning(|_, _, _| Ok(()));

    let mut events = MockEventPublisher::new();
    events
        .expect_publish()
        .withf(|event| event.source == RsvpSource::Web)
        .times(1)
        .returning(|_| Ok(PublishOutcome::Published(vec!["1-0".to_string()])));

    let rsvp: Arc<dyn RsvpService> = Arc::new(RsvpCoordinator::new(
        uow.build(),
        Arc::new(locks),
        Arc::new(operations),
        Arc::new(events),
    ));

    let mut services = MockServiceContainer::new();
    services.expect_auth().returning(move || auth.clone());
    services.expect_rsvp().returning(move || rsvp.clone());

    // A web caller cannot relabel its update
    let body = serde_json::json!({
        "response": "yes",
        "source": "discord",
        "operation_id": "retry-7",
    });
    let request = Request::builder()
        .method(Method::PUT)
        .uri(format!("/rsvp/matches/{}", match_id))
        .header(header::AUTHORIZATION, token)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Forwarded-For", "203.0.113.9")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app(services, allow_all()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["new_response"], "yes");
    assert_eq!(body["event"]["source"], "web");
}

#[tokio::test]
async fn test_pool_rejects_unknown_gender_filter() {
    let auth = authenticator(UserRole::Coach);
    let token = bearer(&auth).await;

    let pool: Arc<dyn PoolService> = Arc::new(PoolManager::new(TestUnitOfWork::default().build()));
    let mut services = MockServiceContainer::new();
    services.expect_auth().returning(move || auth.clone());
    services.expect_pool().returning(move || pool.clone());

    let request = Request::builder()
        .uri(format!("/substitutes/pool?league_id={}&gender=any", Uuid::new_v4()))
        .header(header::AUTHORIZATION, token)
        .body(Body::empty())
        .unwrap();
    let response = app(services, allow_all()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
}
