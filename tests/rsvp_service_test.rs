//! RSVP service unit tests.

mod common;

use std::sync::Arc;

use mockall::predicate::eq;
use uuid::Uuid;

use league_coordinator::domain::{
    AppliedChange, RsvpResponse, RsvpSource, RsvpTransition,
};
use league_coordinator::errors::AppError;
use league_coordinator::infra::{
    LockGuard, MockEventPublisher, MockIdempotencyStore, MockLockManager, PublishOutcome,
    PublisherStats,
};
use league_coordinator::services::{HealthStatus, RsvpCommand, RsvpCoordinator, RsvpService};

use common::{past_match, player, upcoming_match, TestUnitOfWork};

fn command(match_id: Uuid, player_id: Uuid, response: &str) -> RsvpCommand {
    RsvpCommand {
        match_id,
        player_id,
        response: response.to_string(),
        source: RsvpSource::Web,
        operation_id: None,
        trace_id: None,
        user_agent: None,
        ip_address: None,
        session_id: None,
    }
}

fn free_locks() -> MockLockManager {
    let mut locks = MockLockManager::new();
    locks
        .expect_acquire()
        .returning(|resource, _, _| Ok(Some(LockGuard::unmanaged(resource))));
    locks
}

fn empty_operations() -> MockIdempotencyStore {
    let mut operations = MockIdempotencyStore::new();
    operations.expect_get_operation().returning(|_| Ok(None));
    operations.expect_store_operation().returning(|_, _, _| Ok(()));
    operations
}

fn coordinator(
    uow: TestUnitOfWork,
    locks: MockLockManager,
    operations: MockIdempotencyStore,
    events: MockEventPublisher,
) -> RsvpCoordinator<common::BuiltUnitOfWork> {
    RsvpCoordinator::new(
        uow.build(),
        Arc::new(locks),
        Arc::new(operations),
        Arc::new(events),
    )
}

/// Match and player lookups for an upcoming match.
fn league_for(match_id: Uuid, player_id: Uuid, team_id: Uuid) -> TestUnitOfWork {
    let mut uow = TestUnitOfWork::default();
    uow.league
        .expect_find_match()
        .with(eq(match_id))
        .returning(move |id| Ok(Some(upcoming_match(id, team_id, Uuid::new_v4()))));
    uow.league
        .expect_find_player()
        .with(eq(player_id))
        .returning(move |id| Ok(Some(player(id, team_id))));
    uow
}

#[tokio::test]
async fn test_update_publishes_event_with_team() {
    let (match_id, player_id, team_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut uow = league_for(match_id, player_id, team_id);
    uow.availability.expect_apply_change().returning(|write| {
        assert_eq!(write.response, RsvpResponse::Yes);
        Ok(AppliedChange {
            old_response: RsvpResponse::NoResponse,
            transition: RsvpTransition::Upsert(RsvpResponse::Yes),
        })
    });

    let mut events = MockEventPublisher::new();
    events
        .expect_publish()
        .times(1)
        .returning(|_| Ok(PublishOutcome::Published(vec!["1-0".to_string()])));

    let service = coordinator(uow, free_locks(), empty_operations(), events);
    let result = service
        .update_rsvp(command(match_id, player_id, "yes"))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.old_response, RsvpResponse::NoResponse);
    assert_eq!(result.new_response, RsvpResponse::Yes);
    let event = result.event.expect("changed RSVP carries an event");
    assert_eq!(event.team_id, Some(team_id));
    assert_eq!(event.discord_id.as_deref(), Some("123456789"));
}

#[tokio::test]
async fn test_unchanged_answer_publishes_nothing() {
    let (match_id, player_id, team_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut uow = league_for(match_id, player_id, team_id);
    uow.availability.expect_apply_change().returning(|_| {
        Ok(AppliedChange {
            old_response: RsvpResponse::Maybe,
            transition: RsvpTransition::Unchanged,
        })
    });

    let mut events = MockEventPublisher::new();
    events.expect_publish().times(0);

    let service = coordinator(uow, free_locks(), empty_operations(), events);
    let result = service
        .update_rsvp(command(match_id, player_id, "maybe"))
        .await
        .unwrap();

    assert_eq!(result.message, "No change required");
    assert!(result.event.is_none());
}

#[tokio::test]
async fn test_duplicate_operation_replays_stored_result() {
    let (match_id, player_id, team_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    // First call goes through and stores its result
    let mut uow = league_for(match_id, player_id, team_id);
    uow.availability
        .expect_apply_change()
        .times(1)
        .returning(|_| {
            Ok(AppliedChange {
                old_response: RsvpResponse::No,
                transition: RsvpTransition::Upsert(RsvpResponse::Yes),
            })
        });

    let stored = Arc::new(std::sync::Mutex::new(None::<serde_json::Value>));
    let mut operations = MockIdempotencyStore::new();
    let reader = stored.clone();
    let key = format!("{}:op-42", player_id);
    let lookup_key = key.clone();
    operations
        .expect_get_operation()
        .withf(move |requested| requested == lookup_key)
        .returning(move |_| Ok(reader.lock().unwrap().clone()));
    let writer = stored.clone();
    operations
        .expect_store_operation()
        .withf(move |stored_key, _, _| stored_key == key)
        .times(1)
        .returning(move |_, value, _| {
            *writer.lock().unwrap() = Some(value);
            Ok(())
        });

    let mut events = MockEventPublisher::new();
    events
        .expect_publish()
        .times(1)
        .returning(|_| Ok(PublishOutcome::Published(vec!["1-0".to_string()])));
    events.expect_stats().returning(PublisherStats::default);

    let service = coordinator(uow, free_locks(), operations, events);

    let mut cmd = command(match_id, player_id, "yes");
    cmd.operation_id = Some("op-42".to_string());

    let first = service.update_rsvp(cmd.clone()).await.unwrap();
    let second = service.update_rsvp(cmd).await.unwrap();

    assert_eq!(first, second);
    let metrics = service.metrics();
    assert_eq!(metrics.operations_processed, 1);
    assert_eq!(metrics.duplicate_operations, 1);
    assert_eq!(metrics.duplicate_rate, 50.0);
}

#[tokio::test]
async fn test_busy_lock_is_a_concurrent_update() {
    let (match_id, player_id, team_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut uow = league_for(match_id, player_id, team_id);
    uow.availability.expect_apply_change().times(0);

    let mut locks = MockLockManager::new();
    locks.expect_acquire().returning(|_, _, _| Ok(None));

    let mut events = MockEventPublisher::new();
    events.expect_stats().returning(PublisherStats::default);

    let service = coordinator(uow, locks, empty_operations(), events);
    let result = service.update_rsvp(command(match_id, player_id, "no")).await;

    assert!(matches!(result, Err(AppError::ConcurrentUpdate)));
    assert_eq!(service.metrics().concurrent_conflicts, 1);
}

#[tokio::test]
async fn test_past_match_is_rejected() {
    let (match_id, player_id) = (Uuid::new_v4(), Uuid::new_v4());

    let mut uow = TestUnitOfWork::default();
    uow.league
        .expect_find_match()
        .returning(|id| Ok(Some(past_match(id))));
    uow.league
        .expect_find_player()
        .returning(|id| Ok(Some(player(id, Uuid::new_v4()))));

    let service = coordinator(
        uow,
        MockLockManager::new(),
        empty_operations(),
        MockEventPublisher::new(),
    );
    let result = service.update_rsvp(command(match_id, player_id, "yes")).await;

    match result {
        Err(AppError::Validation(msg)) => assert_eq!(msg, "Cannot RSVP to past matches"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_answer_is_rejected_before_lookups() {
    let service = coordinator(
        TestUnitOfWork::default(),
        MockLockManager::new(),
        empty_operations(),
        MockEventPublisher::new(),
    );

    let result = service
        .update_rsvp(command(Uuid::new_v4(), Uuid::new_v4(), "perhaps"))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_discord_source_needs_linked_account() {
    let (match_id, player_id, team_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut uow = TestUnitOfWork::default();
    uow.league
        .expect_find_match()
        .returning(move |id| Ok(Some(upcoming_match(id, team_id, Uuid::new_v4()))));
    uow.league.expect_find_player().returning(move |id| {
        let mut p = player(id, team_id);
        p.discord_id = None;
        Ok(Some(p))
    });

    let service = coordinator(
        uow,
        MockLockManager::new(),
        empty_operations(),
        MockEventPublisher::new(),
    );

    let mut cmd = command(match_id, player_id, "yes");
    cmd.source = RsvpSource::Discord;
    let result = service.update_rsvp(cmd).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_bulk_update_reports_each_failure() {
    let (match_id, team_id) = (Uuid::new_v4(), Uuid::new_v4());
    let good = Uuid::new_v4();
    let missing = Uuid::new_v4();

    let mut uow = TestUnitOfWork::default();
    uow.league
        .expect_find_match()
        .returning(move |id| Ok(Some(upcoming_match(id, team_id, Uuid::new_v4()))));
    uow.league.expect_find_player().returning(move |id| {
        if id == good {
            Ok(Some(player(id, team_id)))
        } else {
            Ok(None)
        }
    });
    uow.availability.expect_apply_change().returning(|_| {
        Ok(AppliedChange {
            old_response: RsvpResponse::NoResponse,
            transition: RsvpTransition::Upsert(RsvpResponse::No),
        })
    });

    let mut events = MockEventPublisher::new();
    events
        .expect_publish()
        .returning(|_| Ok(PublishOutcome::Duplicate));

    let service = coordinator(uow, free_locks(), empty_operations(), events);
    let result = service
        .bulk_update_rsvps(vec![
            command(match_id, good, "no"),
            command(match_id, missing, "no"),
        ])
        .await
        .unwrap();

    assert_eq!(result.summary.total, 2);
    assert_eq!(result.summary.success_count, 1);
    assert_eq!(result.summary.failure_count, 1);
    assert_eq!(result.failed[0].player_id, missing);
    assert_eq!(result.events.len(), 1);
}

#[tokio::test]
async fn test_player_for_unlinked_user() {
    let mut uow = TestUnitOfWork::default();
    uow.league
        .expect_find_player_by_user()
        .returning(|_| Ok(None));

    let service = coordinator(
        uow,
        MockLockManager::new(),
        MockIdempotencyStore::new(),
        MockEventPublisher::new(),
    );

    let result = service.player_for_user(Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_health_check_degrades_without_redis() {
    let mut uow = TestUnitOfWork::default();
    uow.availability.expect_ping().times(1).returning(|| Ok(()));

    let mut operations = MockIdempotencyStore::new();
    operations
        .expect_ping()
        .times(1)
        .returning(|| Err(AppError::external("connection refused")));

    let mut events = MockEventPublisher::new();
    events.expect_health_check().times(1).returning(|| Ok(()));

    let health = coordinator(uow, MockLockManager::new(), operations, events)
        .health_check()
        .await;

    assert_eq!(health.status, HealthStatus::Degraded);
    assert!(health.database);
    assert!(!health.redis);
    assert!(health.publisher);
}
