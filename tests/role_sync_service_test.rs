//! Discord role sync tests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use mockall::predicate::eq;
use uuid::Uuid;

use league_coordinator::domain::{Role, SyncOutcome, User};
use league_coordinator::errors::AppError;
use league_coordinator::infra::MockDiscordGateway;
use league_coordinator::services::{RoleSyncService, RoleSyncer};

use common::TestUnitOfWork;

fn role(name: &str, discord_role_id: Option<&str>) -> Role {
    Role {
        id: Uuid::new_v4(),
        name: name.to_string(),
        discord_role_id: discord_role_id.map(str::to_string),
        sync_enabled: true,
        last_synced_at: None,
    }
}

fn member(id: Uuid, discord_id: Option<&str>) -> User {
    let mut user = User::new(id, "Sam Keeper".to_string());
    user.discord_id = discord_id.map(str::to_string);
    user
}

fn syncer(
    uow: TestUnitOfWork,
    discord: MockDiscordGateway,
    guild_id: Option<&str>,
) -> RoleSyncer<common::BuiltUnitOfWork> {
    RoleSyncer::new(uow.build(), Arc::new(discord), guild_id.map(str::to_string))
        .with_delays(Duration::ZERO, Duration::ZERO)
}

#[tokio::test]
async fn test_sync_role_counts_each_holder() {
    let captain = role("Captain", Some("d-captain"));
    let role_id = captain.id;
    let (linked, unlinked, broken) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut uow = TestUnitOfWork::default();
    uow.roles
        .expect_find()
        .with(eq(role_id))
        .returning(move |_| Ok(Some(captain.clone())));
    uow.roles
        .expect_holders()
        .returning(move |_| Ok(vec![linked, unlinked, broken]));
    uow.roles.expect_mark_synced().times(1).returning(|_, _| Ok(()));
    uow.users.expect_find_many().returning(move |_| {
        Ok(vec![
            member(linked, Some("111")),
            member(unlinked, None),
            member(broken, Some("999")),
        ])
    });

    let mut discord = MockDiscordGateway::new();
    discord
        .expect_assign_role()
        .with(eq("111"), eq("d-captain"))
        .returning(|_, _| Ok(()));
    discord
        .expect_assign_role()
        .with(eq("999"), eq("d-captain"))
        .returning(|_, _| Err(AppError::external("Discord: unknown member")));

    let report = syncer(uow, discord, None).sync_role(role_id).await.unwrap();

    assert_eq!(report.synced, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn test_sync_role_requires_discord_mapping() {
    let mut unmapped = role("Referee", None);
    unmapped.sync_enabled = true;
    let role_id = unmapped.id;

    let mut uow = TestUnitOfWork::default();
    uow.roles
        .expect_find()
        .returning(move |_| Ok(Some(unmapped.clone())));
    uow.roles.expect_holders().times(0);

    let result = syncer(uow, MockDiscordGateway::new(), None)
        .sync_role(role_id)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_assignment_without_discord_account_is_skipped() {
    let captain = role("Captain", Some("d-captain"));
    let (user_id, role_id) = (Uuid::new_v4(), captain.id);

    let mut uow = TestUnitOfWork::default();
    uow.users
        .expect_find_by_id()
        .returning(|id| Ok(Some(member(id, None))));
    uow.roles
        .expect_find()
        .returning(move |_| Ok(Some(captain.clone())));

    let mut discord = MockDiscordGateway::new();
    discord.expect_assign_role().times(0);

    let outcome = syncer(uow, discord, None)
        .on_role_assigned(user_id, role_id)
        .await
        .unwrap();

    assert!(matches!(outcome, SyncOutcome::Skipped(_)));
}

#[tokio::test]
async fn test_reconcile_leaves_unmanaged_roles_alone() {
    let user_id = Uuid::new_v4();
    let captain = role("Captain", Some("d-captain"));
    let coach = role("Coach", Some("d-coach"));
    let synced = vec![captain.clone(), coach];

    let mut uow = TestUnitOfWork::default();
    uow.users
        .expect_find_by_id()
        .returning(|id| Ok(Some(member(id, Some("222")))));
    uow.roles
        .expect_roles_for_user()
        .returning(move |_| Ok(vec![captain.clone()]));
    uow.roles
        .expect_list_synced()
        .returning(move || Ok(synced.clone()));

    let mut discord = MockDiscordGateway::new();
    discord
        .expect_member_roles()
        .with(eq("guild-1"), eq("222"))
        .returning(|_, _| Ok(vec!["Coach".to_string(), "Nitro Booster".to_string()]));
    discord
        .expect_assign_role()
        .with(eq("222"), eq("d-captain"))
        .times(1)
        .returning(|_, _| Ok(()));
    discord
        .expect_remove_role()
        .with(eq("222"), eq("d-coach"))
        .times(1)
        .returning(|_, _| Ok(()));

    let diff = syncer(uow, discord, Some("guild-1"))
        .reconcile_user(user_id)
        .await
        .unwrap();

    assert_eq!(diff.to_add, vec!["Captain".to_string()]);
    assert_eq!(diff.to_remove, vec!["Coach".to_string()]);
}

#[tokio::test]
async fn test_reconcile_needs_guild() {
    let result = syncer(TestUnitOfWork::default(), MockDiscordGateway::new(), None)
        .reconcile_user(Uuid::new_v4())
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}
