//! Roles and their holders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::role::{self, ActiveModel as RoleActiveModel, Entity as RoleEntity};
use super::entities::user_role::{self, Entity as UserRoleEntity};
use crate::domain::Role;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> AppResult<Option<Role>>;

    /// Roles with a Discord mapping and sync enabled.
    async fn list_synced(&self) -> AppResult<Vec<Role>>;

    /// Users holding the role.
    async fn holders(&self, role_id: Uuid) -> AppResult<Vec<Uuid>>;

    async fn roles_for_user(&self, user_id: Uuid) -> AppResult<Vec<Role>>;

    async fn mark_synced(&self, role_id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
}

/// Concrete implementation of RoleRepository
pub struct RoleStore {
    db: DatabaseConnection,
}

impl RoleStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleRepository for RoleStore {
    async fn find(&self, id: Uuid) -> AppResult<Option<Role>> {
        let result = RoleEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Role::from))
    }

    async fn list_synced(&self) -> AppResult<Vec<Role>> {
        let models = RoleEntity::find()
            .filter(role::Column::SyncEnabled.eq(true))
            .filter(role::Column::DiscordRoleId.is_not_null())
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Role::from).collect())
    }

    async fn holders(&self, role_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = UserRoleEntity::find()
            .select_only()
            .column(user_role::Column::UserId)
            .filter(user_role::Column::RoleId.eq(role_id))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(ids)
    }

    async fn roles_for_user(&self, user_id: Uuid) -> AppResult<Vec<Role>> {
        let role_ids: Vec<Uuid> = UserRoleEntity::find()
            .select_only()
            .column(user_role::Column::RoleId)
            .filter(user_role::Column::UserId.eq(user_id))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = RoleEntity::find()
            .filter(role::Column::Id.is_in(role_ids))
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Role::from).collect())
    }

    async fn mark_synced(&self, role_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let model = RoleEntity::find_by_id(role_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: RoleActiveModel = model.into();
        active.last_synced_at = Set(Some(at));
        active.update(&self.db).await.map_err(AppError::from)?;
        Ok(())
    }
}
