//! Database migrations.
//!
//! Each migration is a separate module following SeaORM conventions.
//! Migration names follow the pattern: m{YYYYMMDD}_{NNNNNN}_{description}

use sea_orm_migration::prelude::*;

mod m20240101_000001_create_league_tables;
mod m20240101_000002_create_availability_table;
mod m20240101_000003_create_substitute_tables;
mod m20240101_000004_create_role_tables;
mod m20240101_000005_create_notifications_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_league_tables::Migration),
            Box::new(m20240101_000002_create_availability_table::Migration),
            Box::new(m20240101_000003_create_substitute_tables::Migration),
            Box::new(m20240101_000004_create_role_tables::Migration),
            Box::new(m20240101_000005_create_notifications_table::Migration),
        ]
    }
}

/// Boolean column defaulting to true.
fn bool_on<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).boolean().not_null().default(true).to_owned()
}

/// Boolean column defaulting to false.
fn bool_off<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).boolean().not_null().default(false).to_owned()
}

/// Non-null timestamp defaulting to now.
fn timestamp<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

/// Nullable timestamp.
fn timestamp_null<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).timestamp_with_time_zone().null().to_owned()
}

/// Integer counter starting at zero.
fn counter<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).integer().not_null().default(0).to_owned()
}
