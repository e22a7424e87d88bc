//! Substitute outreach unit tests.

mod common;

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use league_coordinator::domain::{
    Channel, GenderFilter, NewSubstituteResponse, Player, RequestStatus, SubstituteAssignment,
    SubstituteResponse,
};
use league_coordinator::errors::AppError;
use league_coordinator::infra::{MockDiscordGateway, MockPushGateway, MockSmsGateway};
use league_coordinator::jobs::MockJobQueue;
use league_coordinator::services::{PoolOutreach, SubNotificationService, SubNotifier};

use common::{
    email_only_user, outreach, player, pool_entry, sub_request, upcoming_match, BuiltUnitOfWork,
    TestUnitOfWork,
};

fn notifier(uow: TestUnitOfWork, jobs: MockJobQueue) -> SubNotifier<BuiltUnitOfWork> {
    SubNotifier::new(
        uow.build(),
        Arc::new(MockDiscordGateway::new()),
        Arc::new(MockPushGateway::new()),
        Arc::new(MockSmsGateway::new()),
        Arc::new(jobs),
        "https://league.example.com",
        48,
    )
}

/// Pool member without a Discord account, so email is the only channel.
fn member(id: Uuid, gender: Option<&str>) -> Player {
    Player {
        discord_id: None,
        gender: gender.map(str::to_string),
        ..player(id, Uuid::new_v4())
    }
}

fn recorded(new: NewSubstituteResponse) -> SubstituteResponse {
    SubstituteResponse {
        notification_methods: new.notification_methods,
        rsvp_token: new.rsvp_token,
        token_expires_at: new.token_expires_at,
        ..outreach(new.request_id, new.player_id)
    }
}

/// An open request in one league with `members` in its pool.
///
/// `contacted` players already hold an outreach record.
fn league_pool(
    request_id: Uuid,
    gender_preference: Option<&str>,
    members: Vec<Player>,
    contacted: Vec<Uuid>,
) -> TestUnitOfWork {
    let mut request = sub_request(request_id, RequestStatus::Open);
    request.gender_preference = gender_preference.map(str::to_string);
    let league_id = request.league_id;

    let mut uow = TestUnitOfWork::default();
    uow.substitutes
        .expect_find_request()
        .returning(move |_| Ok(Some(request.clone())));
    uow.substitutes
        .expect_responses_for_request()
        .returning(move |request_id| {
            Ok(contacted
                .iter()
                .map(|player_id| outreach(request_id, *player_id))
                .collect())
        });
    uow.substitutes
        .expect_create_response()
        .returning(|new| Ok(recorded(new)));

    let entries = members
        .iter()
        .map(|p| pool_entry(p.id, league_id))
        .collect::<Vec<_>>();
    uow.pool
        .expect_list_active()
        .returning(move |_| Ok(entries.clone()));
    uow.pool
        .expect_record_request_sent()
        .returning(|_, _| Ok(()));

    uow.league
        .expect_find_match()
        .returning(|id| Ok(Some(upcoming_match(id, Uuid::new_v4(), Uuid::new_v4()))));
    uow.league.expect_find_teams().returning(|_| Ok(Vec::new()));
    uow.league.expect_find_players().returning(move |ids| {
        Ok(members
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    });

    uow.users
        .expect_find_many()
        .returning(|ids| Ok(ids.into_iter().map(email_only_user).collect()));
    uow
}

fn emails_ok(times: usize) -> MockJobQueue {
    let mut jobs = MockJobQueue::new();
    jobs.expect_enqueue_email()
        .withf(|job| job.subject.starts_with("Substitute needed") && job.body.contains("/sub-rsvp/"))
        .times(times)
        .returning(|_| Ok(()));
    jobs
}

#[tokio::test]
async fn test_free_text_gender_preference_does_not_filter() {
    let request_id = Uuid::new_v4();
    let uow = league_pool(
        request_id,
        Some("any"),
        vec![member(Uuid::new_v4(), Some("female"))],
        vec![],
    );

    let service = notifier(uow, emails_ok(1));
    let report = service
        .notify_pool(request_id, PoolOutreach::default())
        .await
        .unwrap();

    assert_eq!(report.notified, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn test_explicit_gender_filter_skips_others() {
    let request_id = Uuid::new_v4();
    let uow = league_pool(
        request_id,
        None,
        vec![
            member(Uuid::new_v4(), Some("Female")),
            member(Uuid::new_v4(), Some("male")),
            member(Uuid::new_v4(), None),
        ],
        vec![],
    );

    let service = notifier(uow, emails_ok(1));
    let report = service
        .notify_pool(
            request_id,
            PoolOutreach {
                gender_filter: Some(GenderFilter::Female),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(report.notified, 1);
    assert_eq!(report.skipped, 2);
}

#[tokio::test]
async fn test_already_contacted_and_unreachable_are_skipped() {
    let request_id = Uuid::new_v4();
    let (reachable, contacted) = (Uuid::new_v4(), Uuid::new_v4());
    let unreachable = Player {
        user_id: None,
        ..member(Uuid::new_v4(), None)
    };

    let uow = league_pool(
        request_id,
        None,
        vec![member(reachable, None), member(contacted, None), unreachable],
        vec![contacted],
    );

    let service = notifier(uow, emails_ok(1));
    let report = service
        .notify_pool(request_id, PoolOutreach::default())
        .await
        .unwrap();

    assert_eq!(report.notified, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn test_channel_restriction_and_delivery_failure() {
    let request_id = Uuid::new_v4();
    let (emailed, restricted) = (Uuid::new_v4(), Uuid::new_v4());

    // Both members only have email; SMS-only outreach reaches nobody
    let uow = league_pool(
        request_id,
        None,
        vec![member(emailed, None), member(restricted, None)],
        vec![],
    );
    let service = notifier(uow, MockJobQueue::new());
    let report = service
        .notify_pool(
            request_id,
            PoolOutreach {
                channels: Some(vec![Channel::Sms]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(report.skipped, 2);

    // Every channel failing counts the player as failed
    let uow = league_pool(request_id, None, vec![member(emailed, None)], vec![]);
    let mut jobs = MockJobQueue::new();
    jobs.expect_enqueue_email()
        .returning(|_| Err(AppError::external("queue unavailable")));
    let service = notifier(uow, jobs);
    let report = service
        .notify_pool(request_id, PoolOutreach::default())
        .await
        .unwrap();
    assert_eq!(report.notified, 0);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn test_closed_request_is_not_announced() {
    let request_id = Uuid::new_v4();
    let mut uow = TestUnitOfWork::default();
    uow.substitutes
        .expect_find_request()
        .returning(|id| Ok(Some(sub_request(id, RequestStatus::Cancelled))));
    uow.pool.expect_list_active().times(0);

    let service = notifier(uow, MockJobQueue::new());
    match service.notify_pool(request_id, PoolOutreach::default()).await {
        Err(AppError::Validation(msg)) => assert_eq!(msg, "Substitute request is CANCELLED"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_individual_contact_only_once() {
    let (request_id, player_id) = (Uuid::new_v4(), Uuid::new_v4());
    let mut uow = TestUnitOfWork::default();
    uow.substitutes
        .expect_find_request()
        .returning(|id| Ok(Some(sub_request(id, RequestStatus::Open))));
    uow.substitutes
        .expect_find_response()
        .returning(|request_id, player_id| Ok(Some(outreach(request_id, player_id))));
    uow.substitutes.expect_create_response().times(0);

    let service = notifier(uow, MockJobQueue::new());
    match service
        .notify_individual(request_id, player_id, "Can you play?".to_string())
        .await
    {
        Err(AppError::Validation(msg)) => {
            assert_eq!(msg, "Player has already been contacted for this request")
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_confirmation_reuses_outreach_channels() {
    let (assignment_id, request_id, player_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut uow = TestUnitOfWork::default();
    uow.substitutes.expect_find_assignment().returning(move |id| {
        Ok(Some(SubstituteAssignment {
            id,
            request_id,
            player_id,
            assigned_by: Uuid::new_v4(),
            position_assigned: Some("GOALKEEPER".to_string()),
            notes: None,
            notification_sent: false,
            notification_sent_at: None,
            notification_methods: Vec::new(),
            assigned_at: Utc::now(),
        }))
    });
    uow.substitutes
        .expect_find_request()
        .returning(|id| Ok(Some(sub_request(id, RequestStatus::Filled))));
    uow.substitutes
        .expect_find_response()
        .returning(|request_id, player_id| {
            let mut record = outreach(request_id, player_id);
            record.notification_methods = vec![Channel::Email];
            Ok(Some(record))
        });
    uow.substitutes
        .expect_mark_assignment_notified()
        .withf(move |id, methods, _| *id == assignment_id && methods == &vec![Channel::Email])
        .times(1)
        .returning(|_, _, _| Ok(()));
    uow.pool.expect_find_entry().times(0);

    uow.league
        .expect_find_player()
        .returning(|id| Ok(Some(member(id, None))));
    uow.league
        .expect_find_match()
        .returning(|id| Ok(Some(upcoming_match(id, Uuid::new_v4(), Uuid::new_v4()))));
    uow.league.expect_find_teams().returning(|_| Ok(Vec::new()));
    uow.users
        .expect_find_many()
        .returning(|ids| Ok(ids.into_iter().map(email_only_user).collect()));

    let mut jobs = MockJobQueue::new();
    jobs.expect_enqueue_email()
        .withf(|job| job.subject.starts_with("Substitute confirmed"))
        .times(1)
        .returning(|_| Ok(()));

    let service = notifier(uow, jobs);
    let channels = service.send_confirmation(assignment_id).await.unwrap();

    assert_eq!(channels, vec![Channel::Email]);
}
