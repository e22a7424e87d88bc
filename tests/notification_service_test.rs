//! Notification dispatcher unit tests.

mod common;

use std::sync::Arc;

use uuid::Uuid;

use league_coordinator::domain::{NotificationPayload, NotificationType, User};
use league_coordinator::errors::AppError;
use league_coordinator::infra::{MockDiscordGateway, MockPushGateway, MockSmsGateway};
use league_coordinator::jobs::MockJobQueue;
use league_coordinator::services::{NotificationDispatcher, NotificationService};

use common::{BuiltUnitOfWork, TestUnitOfWork};

struct Gateways {
    push: MockPushGateway,
    sms: MockSmsGateway,
    discord: MockDiscordGateway,
    jobs: MockJobQueue,
}

impl Default for Gateways {
    fn default() -> Self {
        Self {
            push: MockPushGateway::new(),
            sms: MockSmsGateway::new(),
            discord: MockDiscordGateway::new(),
            jobs: MockJobQueue::new(),
        }
    }
}

fn dispatcher(uow: TestUnitOfWork, gateways: Gateways) -> NotificationDispatcher<BuiltUnitOfWork> {
    NotificationDispatcher::new(
        uow.build(),
        Arc::new(gateways.push),
        Arc::new(gateways.sms),
        Arc::new(gateways.discord),
        Arc::new(gateways.jobs),
    )
}

/// Email and Discord contacts, no phone or push tokens.
fn member(id: Uuid) -> User {
    let mut user = User::new(id, "Riley Striker".to_string());
    user.email = Some("riley@example.com".to_string());
    user.discord_id = Some("987654321".to_string());
    user
}

#[tokio::test]
async fn test_send_uses_allowed_channels_and_counts_failures() {
    let user_id = Uuid::new_v4();

    let mut uow = TestUnitOfWork::default();
    uow.users
        .expect_find_many()
        .returning(|ids| Ok(ids.into_iter().map(member).collect()));
    uow.notifications
        .expect_create()
        .times(1)
        .returning(|notification| Ok(notification));

    let mut gateways = Gateways::default();
    gateways
        .jobs
        .expect_enqueue_email()
        .withf(|job| job.to == "riley@example.com" && job.subject == "Field change")
        .times(1)
        .returning(|_| Ok(()));
    gateways
        .discord
        .expect_send_dm()
        .times(1)
        .returning(|_, _| Err(AppError::external("bot offline")));
    gateways.push.expect_send().times(0);
    gateways.sms.expect_send().times(0);

    let service = dispatcher(uow, gateways);
    let report = service
        .send(NotificationPayload::new(
            NotificationType::LeagueAnnouncement,
            "Field change",
            "Tonight's games move to South Field",
            vec![user_id],
        ))
        .await
        .unwrap();

    assert_eq!(report.total_users, 1);
    assert_eq!(report.in_app.success, 1);
    assert_eq!(report.email.success, 1);
    assert_eq!(report.discord.failed, 1);
    assert_eq!(report.push.skipped, 1);
    assert_eq!(report.sms.skipped, 1);
}

#[tokio::test]
async fn test_type_preference_turns_channels_off() {
    let mut uow = TestUnitOfWork::default();
    uow.users.expect_find_many().returning(|ids| {
        Ok(ids
            .into_iter()
            .map(|id| {
                let mut user = member(id);
                user.preferences.announcements = false;
                user
            })
            .collect())
    });
    uow.notifications
        .expect_create()
        .returning(|notification| Ok(notification));

    let mut gateways = Gateways::default();
    gateways.jobs.expect_enqueue_email().times(0);
    gateways.discord.expect_send_dm().times(0);

    let service = dispatcher(uow, gateways);
    let report = service
        .send(NotificationPayload::new(
            NotificationType::AdminAnnouncement,
            "Dues",
            "Season dues are due Friday",
            vec![Uuid::new_v4(), Uuid::new_v4()],
        ))
        .await
        .unwrap();

    assert_eq!(report.total_users, 2);
    assert_eq!(report.in_app.success, 2);
    assert_eq!(report.email.skipped, 2);
    assert_eq!(report.discord.skipped, 2);
}

#[tokio::test]
async fn test_send_without_recipients_is_rejected() {
    let service = dispatcher(TestUnitOfWork::default(), Gateways::default());
    let result = service
        .send(NotificationPayload::new(
            NotificationType::System,
            "Maintenance",
            "Back soon",
            vec![],
        ))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_list_reads_newest_notifications() {
    let user_id = Uuid::new_v4();

    let mut uow = TestUnitOfWork::default();
    uow.notifications
        .expect_list_for_user()
        .withf(move |id, limit| *id == user_id && *limit == 5)
        .returning(|_, _| Ok(vec![]));

    let service = dispatcher(uow, Gateways::default());
    assert!(service.list(user_id, 5).await.unwrap().is_empty());
}
