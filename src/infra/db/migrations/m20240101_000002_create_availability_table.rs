//! Migration: Create availability (RSVP) table.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_league_tables::{Matches, Players};
use super::timestamp;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Availability::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Availability::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Availability::MatchId).uuid().not_null())
                    .col(ColumnDef::new(Availability::PlayerId).uuid().not_null())
                    .col(ColumnDef::new(Availability::DiscordId).string().null())
                    .col(ColumnDef::new(Availability::Response).string().not_null())
                    .col(timestamp(Availability::RespondedAt))
                    .col(ColumnDef::new(Availability::OperationId).string().null())
                    .col(ColumnDef::new(Availability::TraceId).string().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_availability_match")
                            .from(Availability::Table, Availability::MatchId)
                            .to(Matches::Table, Matches::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_availability_player")
                            .from(Availability::Table, Availability::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One answer per player per match
        manager
            .create_index(
                Index::create()
                    .name("uq_availability_match_player")
                    .table(Availability::Table)
                    .col(Availability::MatchId)
                    .col(Availability::PlayerId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Availability::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Availability {
    Table,
    Id,
    MatchId,
    PlayerId,
    DiscordId,
    Response,
    RespondedAt,
    OperationId,
    TraceId,
}
