//! Migrate command - Schema management for the league tables.

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use sea_orm_migration::MigratorTrait;

use crate::infra::{Database, Migrator};

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;

    match args.action {
        MigrateAction::Up => {
            let pending = pending_count(&db).await?;
            if pending == 0 {
                tracing::info!("Schema is up to date");
                return Ok(());
            }
            db.run_migrations().await.map_err(migration_error)?;
            tracing::info!(applied = pending, "Migrations applied");
        }
        MigrateAction::Down { steps } => {
            if steps == 0 {
                return Err(AppError::validation("steps must be at least 1"));
            }
            db.rollback_migrations(steps).await.map_err(migration_error)?;
            tracing::info!(steps, "Migrations rolled back");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await.map_err(migration_error)?;
            let applied = status.iter().filter(|(_, applied)| *applied).count();
            for (name, is_applied) in &status {
                println!("{:<8} {}", if *is_applied { "applied" } else { "pending" }, name);
            }
            println!("{} of {} migrations applied", applied, status.len());
        }
        MigrateAction::Fresh { yes } => {
            if !yes {
                return Err(AppError::validation(
                    "Refusing to drop league data without --yes",
                ));
            }
            tracing::warn!("Dropping all tables and re-applying migrations");
            db.fresh_migrations().await.map_err(migration_error)?;
            tracing::info!("Fresh schema ready");
        }
    }

    Ok(())
}

/// A brand new database has no migration table yet, so everything is pending.
async fn pending_count(db: &Database) -> AppResult<usize> {
    match db.migration_status().await {
        Ok(status) => Ok(status.iter().filter(|(_, applied)| !applied).count()),
        Err(e) => {
            tracing::debug!(error = %e, "Migration table not readable, treating schema as empty");
            Ok(Migrator::migrations().len())
        }
    }
}

fn migration_error(e: sea_orm::DbErr) -> AppError {
    AppError::internal(format!("Migration failed: {}", e))
}
