//! Mirrors league roles onto Discord roles.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{ROLE_SYNC_ROLE_DELAY_MS, ROLE_SYNC_USER_DELAY_MS};
use crate::domain::{compute_role_diff, Role, RoleDiff, RoleSyncReport, SyncOutcome, User};
use crate::errors::{AppError, AppResult};
use crate::infra::{DiscordGateway, UnitOfWork};

/// Role sync service trait for dependency injection.
#[async_trait]
pub trait RoleSyncService: Send + Sync {
    async fn on_role_assigned(&self, user_id: Uuid, role_id: Uuid) -> AppResult<SyncOutcome>;

    async fn on_role_removed(&self, user_id: Uuid, role_id: Uuid) -> AppResult<SyncOutcome>;

    /// Push one role to every holder.
    async fn sync_role(&self, role_id: Uuid) -> AppResult<RoleSyncReport>;

    /// Sync every mapped role with sync enabled.
    async fn sync_all(&self) -> AppResult<Vec<RoleSyncReport>>;

    /// Bring one member's managed Discord roles in line with their league roles.
    async fn reconcile_user(&self, user_id: Uuid) -> AppResult<RoleDiff>;
}

#[derive(Debug, Clone, Copy)]
enum RoleChange {
    Assign,
    Remove,
}

/// Concrete implementation of RoleSyncService.
pub struct RoleSyncer<U: UnitOfWork> {
    uow: Arc<U>,
    discord: Arc<dyn DiscordGateway>,
    guild_id: Option<String>,
    user_delay: Duration,
    role_delay: Duration,
}

impl<U: UnitOfWork> RoleSyncer<U> {
    pub fn new(uow: Arc<U>, discord: Arc<dyn DiscordGateway>, guild_id: Option<String>) -> Self {
        Self {
            uow,
            discord,
            guild_id,
            user_delay: Duration::from_millis(ROLE_SYNC_USER_DELAY_MS),
            role_delay: Duration::from_millis(ROLE_SYNC_ROLE_DELAY_MS),
        }
    }

    /// Override the pacing between Discord calls.
    pub fn with_delays(mut self, user_delay: Duration, role_delay: Duration) -> Self {
        self.user_delay = user_delay;
        self.role_delay = role_delay;
        self
    }

    async fn load(&self, user_id: Uuid, role_id: Uuid) -> AppResult<(User, Role)> {
        let user = self
            .uow
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let role = self
            .uow
            .roles()
            .find(role_id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok((user, role))
    }

    async fn apply(&self, user: &User, role: &Role, change: RoleChange) -> SyncOutcome {
        let Some(discord_role_id) = role.synced_discord_role() else {
            return SyncOutcome::Skipped("Role is not synced to Discord".to_string());
        };
        let Some(discord_id) = user.discord_id.as_deref().filter(|d| !d.is_empty()) else {
            return SyncOutcome::Skipped("User has no Discord account".to_string());
        };

        let result = match change {
            RoleChange::Assign => self.discord.assign_role(discord_id, discord_role_id).await,
            RoleChange::Remove => self.discord.remove_role(discord_id, discord_role_id).await,
        };
        match result {
            Ok(()) => {
                tracing::debug!(user_id = %user.id, role = %role.name, ?change, "Discord role updated");
                SyncOutcome::Synced
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, role = %role.name, ?change, error = %e, "Discord role update failed");
                SyncOutcome::Failed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> RoleSyncService for RoleSyncer<U> {
    async fn on_role_assigned(&self, user_id: Uuid, role_id: Uuid) -> AppResult<SyncOutcome> {
        let (user, role) = self.load(user_id, role_id).await?;
        Ok(self.apply(&user, &role, RoleChange::Assign).await)
    }

    async fn on_role_removed(&self, user_id: Uuid, role_id: Uuid) -> AppResult<SyncOutcome> {
        let (user, role) = self.load(user_id, role_id).await?;
        Ok(self.apply(&user, &role, RoleChange::Remove).await)
    }

    async fn sync_role(&self, role_id: Uuid) -> AppResult<RoleSyncReport> {
        let role = self
            .uow
            .roles()
            .find(role_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if role.synced_discord_role().is_none() {
            return Err(AppError::validation(format!(
                "Role \"{}\" is not mapped to a Discord role or sync is disabled",
                role.name
            )));
        }

        let holders = self.uow.roles().holders(role.id).await?;
        let users = self.uow.users().find_many(holders).await?;

        let mut report = RoleSyncReport::new(&role);
        for (i, user) in users.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.user_delay).await;
            }
            let outcome = self.apply(user, &role, RoleChange::Assign).await;
            report.record(user.id, outcome);
        }

        self.uow.roles().mark_synced(role.id, Utc::now()).await?;
        tracing::info!(
            role = %role.name,
            synced = report.synced,
            skipped = report.skipped,
            failed = report.failed,
            "Role synced"
        );
        Ok(report)
    }

    async fn sync_all(&self) -> AppResult<Vec<RoleSyncReport>> {
        let roles = self.uow.roles().list_synced().await?;
        let mut reports = Vec::with_capacity(roles.len());
        for (i, role) in roles.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.role_delay).await;
            }
            match self.sync_role(role.id).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!(role = %role.name, error = %e, "Role sync failed");
                    let mut report = RoleSyncReport::new(role);
                    report.errors.push(e.to_string());
                    reports.push(report);
                }
            }
        }
        Ok(reports)
    }

    async fn reconcile_user(&self, user_id: Uuid) -> AppResult<RoleDiff> {
        let guild_id = self
            .guild_id
            .as_deref()
            .ok_or_else(|| AppError::validation("Discord guild not configured"))?;
        let user = self
            .uow
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let discord_id = user
            .discord_id
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AppError::validation("User has no Discord account"))?;

        let roles = self.uow.roles();
        let (current, held, synced) = tokio::try_join!(
            self.discord.member_roles(guild_id, discord_id),
            roles.roles_for_user(user_id),
            roles.list_synced(),
        )?;

        // Discord reports role names, so the diff runs on names.
        let by_name: HashMap<&str, &str> = synced
            .iter()
            .filter_map(|r| r.synced_discord_role().map(|id| (r.name.as_str(), id)))
            .collect();
        let managed: Vec<String> = by_name.keys().map(|n| n.to_string()).collect();
        let expected: Vec<String> = held
            .iter()
            .filter(|r| r.synced_discord_role().is_some())
            .map(|r| r.name.clone())
            .collect();

        let diff = compute_role_diff(&current, &expected, &managed);
        for name in &diff.to_add {
            if let Some(role_id) = by_name.get(name.as_str()) {
                self.discord.assign_role(discord_id, role_id).await?;
            }
        }
        for name in &diff.to_remove {
            if let Some(role_id) = by_name.get(name.as_str()) {
                self.discord.remove_role(discord_id, role_id).await?;
            }
        }

        tracing::info!(
            user_id = %user_id,
            added = diff.to_add.len(),
            removed = diff.to_remove.len(),
            "Discord roles reconciled"
        );
        Ok(diff)
    }
}
