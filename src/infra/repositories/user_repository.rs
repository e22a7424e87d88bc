//! User repository.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::collections::HashMap;
use uuid::Uuid;

use super::entities::device_token::{self, Entity as DeviceTokenEntity};
use super::entities::player::{self, Entity as PlayerEntity};
use super::entities::user::{self, Entity as UserEntity};
use crate::domain::User;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// Loaded users carry the Discord id of their linked player and their active
/// push device tokens.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find every user in `ids`; missing ids are skipped.
    async fn find_many(&self, ids: Vec<Uuid>) -> AppResult<Vec<User>>;
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn hydrate(&self, models: Vec<user::Model>) -> AppResult<Vec<User>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

        let discord_ids: HashMap<Uuid, String> = PlayerEntity::find()
            .filter(player::Column::UserId.is_in(ids.clone()))
            .all(&self.db)
            .await
            .map_err(AppError::from)?
            .into_iter()
            .filter_map(|p| Some((p.user_id?, p.discord_id?)))
            .collect();

        let mut tokens: HashMap<Uuid, Vec<String>> = HashMap::new();
        for token in DeviceTokenEntity::find()
            .filter(device_token::Column::UserId.is_in(ids))
            .filter(device_token::Column::IsActive.eq(true))
            .all(&self.db)
            .await
            .map_err(AppError::from)?
        {
            tokens.entry(token.user_id).or_default().push(token.token);
        }

        Ok(models
            .into_iter()
            .map(|m| {
                let discord_id = discord_ids.get(&m.id).cloned();
                let push_tokens = tokens.remove(&m.id).unwrap_or_default();
                m.into_user(discord_id, push_tokens)
            })
            .collect())
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let Some(model) = UserEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?
        else {
            return Ok(None);
        };

        Ok(self.hydrate(vec![model]).await?.pop())
    }

    async fn find_many(&self, ids: Vec<Uuid>) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = UserEntity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        self.hydrate(models).await
    }
}
