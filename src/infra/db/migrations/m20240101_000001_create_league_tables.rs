//! Migration: Create users, device tokens, teams, players and matches.

use sea_orm_migration::prelude::*;

use super::{bool_on, timestamp};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Email).string().null().unique_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("user"),
                    )
                    .col(ColumnDef::new(Users::Phone).string().null())
                    .col(
                        ColumnDef::new(Users::PhoneVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::SmsConsent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(bool_on(Users::EmailNotifications))
                    .col(bool_on(Users::SmsNotifications))
                    .col(bool_on(Users::DiscordNotifications))
                    .col(bool_on(Users::PushNotifications))
                    .col(bool_on(Users::MatchReminders))
                    .col(bool_on(Users::RsvpReminders))
                    .col(bool_on(Users::TeamUpdates))
                    .col(bool_on(Users::Announcements))
                    .col(bool_on(Users::DmNotifications))
                    .col(timestamp(Users::CreatedAt))
                    .col(timestamp(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DeviceTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeviceTokens::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeviceTokens::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(DeviceTokens::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(DeviceTokens::Platform).string().null())
                    .col(bool_on(DeviceTokens::IsActive))
                    .col(timestamp(DeviceTokens::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_device_tokens_user")
                            .from(DeviceTokens::Table, DeviceTokens::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Teams::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Teams::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Teams::Name).string().not_null())
                    .col(ColumnDef::new(Teams::LeagueId).uuid().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Players::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Players::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Players::UserId).uuid().null().unique_key())
                    .col(ColumnDef::new(Players::Name).string().not_null())
                    .col(ColumnDef::new(Players::DiscordId).string().null().unique_key())
                    .col(ColumnDef::new(Players::Gender).string().null())
                    .col(ColumnDef::new(Players::LeagueId).uuid().null())
                    .col(ColumnDef::new(Players::PrimaryTeamId).uuid().null())
                    .col(bool_on(Players::IsActive))
                    .col(timestamp(Players::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_players_user")
                            .from(Players::Table, Players::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_players_primary_team")
                            .from(Players::Table, Players::PrimaryTeamId)
                            .to(Teams::Table, Teams::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PlayerTeams::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PlayerTeams::PlayerId).uuid().not_null())
                    .col(ColumnDef::new(PlayerTeams::TeamId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(PlayerTeams::PlayerId)
                            .col(PlayerTeams::TeamId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_player_teams_player")
                            .from(PlayerTeams::Table, PlayerTeams::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_player_teams_team")
                            .from(PlayerTeams::Table, PlayerTeams::TeamId)
                            .to(Teams::Table, Teams::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Matches::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Matches::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Matches::LeagueId).uuid().not_null())
                    .col(ColumnDef::new(Matches::HomeTeamId).uuid().not_null())
                    .col(ColumnDef::new(Matches::AwayTeamId).uuid().not_null())
                    .col(ColumnDef::new(Matches::Date).date().not_null())
                    .col(ColumnDef::new(Matches::Time).time().null())
                    .col(ColumnDef::new(Matches::Location).string().null())
                    .col(timestamp(Matches::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_matches_home_team")
                            .from(Matches::Table, Matches::HomeTeamId)
                            .to(Teams::Table, Teams::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_matches_away_team")
                            .from(Matches::Table, Matches::AwayTeamId)
                            .to(Teams::Table, Teams::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_matches_date")
                    .table(Matches::Table)
                    .col(Matches::Date)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Matches::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PlayerTeams::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Players::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Teams::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DeviceTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum Users {
    Table,
    Id,
    Email,
    Name,
    Role,
    Phone,
    PhoneVerified,
    SmsConsent,
    EmailNotifications,
    SmsNotifications,
    DiscordNotifications,
    PushNotifications,
    MatchReminders,
    RsvpReminders,
    TeamUpdates,
    Announcements,
    DmNotifications,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum DeviceTokens {
    Table,
    Id,
    UserId,
    Token,
    Platform,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
pub(super) enum Teams {
    Table,
    Id,
    Name,
    LeagueId,
}

#[derive(Iden)]
pub(super) enum Players {
    Table,
    Id,
    UserId,
    Name,
    DiscordId,
    Gender,
    LeagueId,
    PrimaryTeamId,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum PlayerTeams {
    Table,
    PlayerId,
    TeamId,
}

#[derive(Iden)]
pub(super) enum Matches {
    Table,
    Id,
    LeagueId,
    HomeTeamId,
    AwayTeamId,
    Date,
    Time,
    Location,
    CreatedAt,
}
