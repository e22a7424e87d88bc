//! Migration: Create substitute requests, responses, assignments and pool tables.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_league_tables::{Matches, Players, Teams, Users};
use super::{bool_off, bool_on, counter, timestamp, timestamp_null};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SubstituteRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubstituteRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SubstituteRequests::MatchId).uuid().not_null())
                    .col(ColumnDef::new(SubstituteRequests::TeamId).uuid().not_null())
                    .col(ColumnDef::new(SubstituteRequests::LeagueId).uuid().not_null())
                    .col(ColumnDef::new(SubstituteRequests::RequestedBy).uuid().not_null())
                    .col(ColumnDef::new(SubstituteRequests::PositionsNeeded).string().null())
                    .col(ColumnDef::new(SubstituteRequests::GenderPreference).string().null())
                    .col(ColumnDef::new(SubstituteRequests::Notes).text().null())
                    .col(
                        ColumnDef::new(SubstituteRequests::Status)
                            .string()
                            .not_null()
                            .default("OPEN"),
                    )
                    .col(
                        ColumnDef::new(SubstituteRequests::SubstitutesNeeded)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(timestamp_null(SubstituteRequests::FilledAt))
                    .col(timestamp(SubstituteRequests::CreatedAt))
                    .col(timestamp(SubstituteRequests::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_substitute_requests_match")
                            .from(SubstituteRequests::Table, SubstituteRequests::MatchId)
                            .to(Matches::Table, Matches::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_substitute_requests_team")
                            .from(SubstituteRequests::Table, SubstituteRequests::TeamId)
                            .to(Teams::Table, Teams::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_substitute_requests_requested_by")
                            .from(SubstituteRequests::Table, SubstituteRequests::RequestedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_substitute_requests_status")
                    .table(SubstituteRequests::Table)
                    .col(SubstituteRequests::Status)
                    .col(SubstituteRequests::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubstituteResponses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubstituteResponses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SubstituteResponses::RequestId).uuid().not_null())
                    .col(ColumnDef::new(SubstituteResponses::PlayerId).uuid().not_null())
                    .col(ColumnDef::new(SubstituteResponses::IsAvailable).boolean().null())
                    .col(ColumnDef::new(SubstituteResponses::ResponseMethod).string().null())
                    .col(ColumnDef::new(SubstituteResponses::ResponseText).text().null())
                    .col(timestamp_null(SubstituteResponses::NotificationSentAt))
                    .col(
                        ColumnDef::new(SubstituteResponses::NotificationMethods)
                            .string()
                            .null(),
                    )
                    .col(timestamp_null(SubstituteResponses::RespondedAt))
                    .col(
                        ColumnDef::new(SubstituteResponses::RsvpToken)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SubstituteResponses::TokenExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(timestamp_null(SubstituteResponses::TokenUsedAt))
                    .col(timestamp(SubstituteResponses::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_substitute_responses_request")
                            .from(SubstituteResponses::Table, SubstituteResponses::RequestId)
                            .to(SubstituteRequests::Table, SubstituteRequests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_substitute_responses_player")
                            .from(SubstituteResponses::Table, SubstituteResponses::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_substitute_responses_request_player")
                    .table(SubstituteResponses::Table)
                    .col(SubstituteResponses::RequestId)
                    .col(SubstituteResponses::PlayerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubstituteAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubstituteAssignments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SubstituteAssignments::RequestId).uuid().not_null())
                    .col(ColumnDef::new(SubstituteAssignments::PlayerId).uuid().not_null())
                    .col(ColumnDef::new(SubstituteAssignments::AssignedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(SubstituteAssignments::PositionAssigned)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(SubstituteAssignments::Notes).text().null())
                    .col(bool_off(SubstituteAssignments::NotificationSent))
                    .col(timestamp_null(SubstituteAssignments::NotificationSentAt))
                    .col(
                        ColumnDef::new(SubstituteAssignments::NotificationMethods)
                            .string()
                            .null(),
                    )
                    .col(timestamp(SubstituteAssignments::AssignedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_substitute_assignments_request")
                            .from(SubstituteAssignments::Table, SubstituteAssignments::RequestId)
                            .to(SubstituteRequests::Table, SubstituteRequests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_substitute_assignments_player")
                            .from(SubstituteAssignments::Table, SubstituteAssignments::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A player fills at most one slot per request
        manager
            .create_index(
                Index::create()
                    .name("uq_substitute_assignments_request_player")
                    .table(SubstituteAssignments::Table)
                    .col(SubstituteAssignments::RequestId)
                    .col(SubstituteAssignments::PlayerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubstitutePools::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubstitutePools::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SubstitutePools::PlayerId).uuid().not_null())
                    .col(ColumnDef::new(SubstitutePools::LeagueId).uuid().not_null())
                    .col(bool_on(SubstitutePools::IsActive))
                    .col(ColumnDef::new(SubstitutePools::PreferredPositions).string().null())
                    .col(ColumnDef::new(SubstitutePools::MaxMatchesPerWeek).integer().null())
                    .col(bool_on(SubstitutePools::SmsForSubRequests))
                    .col(bool_on(SubstitutePools::DiscordForSubRequests))
                    .col(bool_on(SubstitutePools::EmailForSubRequests))
                    .col(counter(SubstitutePools::RequestsReceived))
                    .col(counter(SubstitutePools::RequestsAccepted))
                    .col(counter(SubstitutePools::MatchesPlayed))
                    .col(timestamp(SubstitutePools::JoinedPoolAt))
                    .col(timestamp_null(SubstitutePools::LastActiveAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_substitute_pools_player")
                            .from(SubstitutePools::Table, SubstitutePools::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_substitute_pools_player_league")
                    .table(SubstitutePools::Table)
                    .col(SubstitutePools::PlayerId)
                    .col(SubstitutePools::LeagueId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubstitutePoolHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubstitutePoolHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SubstitutePoolHistory::PlayerId).uuid().not_null())
                    .col(ColumnDef::new(SubstitutePoolHistory::LeagueId).uuid().not_null())
                    .col(ColumnDef::new(SubstitutePoolHistory::Action).string().not_null())
                    .col(ColumnDef::new(SubstitutePoolHistory::Notes).text().null())
                    .col(ColumnDef::new(SubstitutePoolHistory::PerformedBy).uuid().null())
                    .col(timestamp(SubstitutePoolHistory::PerformedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_substitute_pool_history_player")
                            .from(SubstitutePoolHistory::Table, SubstitutePoolHistory::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SubstitutePoolHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubstitutePools::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubstituteAssignments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubstituteResponses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubstituteRequests::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SubstituteRequests {
    Table,
    Id,
    MatchId,
    TeamId,
    LeagueId,
    RequestedBy,
    PositionsNeeded,
    GenderPreference,
    Notes,
    Status,
    SubstitutesNeeded,
    FilledAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SubstituteResponses {
    Table,
    Id,
    RequestId,
    PlayerId,
    IsAvailable,
    ResponseMethod,
    ResponseText,
    NotificationSentAt,
    NotificationMethods,
    RespondedAt,
    RsvpToken,
    TokenExpiresAt,
    TokenUsedAt,
    CreatedAt,
}

#[derive(Iden)]
enum SubstituteAssignments {
    Table,
    Id,
    RequestId,
    PlayerId,
    AssignedBy,
    PositionAssigned,
    Notes,
    NotificationSent,
    NotificationSentAt,
    NotificationMethods,
    AssignedAt,
}

#[derive(Iden)]
enum SubstitutePools {
    Table,
    Id,
    PlayerId,
    LeagueId,
    IsActive,
    PreferredPositions,
    MaxMatchesPerWeek,
    SmsForSubRequests,
    DiscordForSubRequests,
    EmailForSubRequests,
    RequestsReceived,
    RequestsAccepted,
    MatchesPlayed,
    JoinedPoolAt,
    LastActiveAt,
}

#[derive(Iden)]
enum SubstitutePoolHistory {
    Table,
    Id,
    PlayerId,
    LeagueId,
    Action,
    Notes,
    PerformedBy,
    PerformedAt,
}
