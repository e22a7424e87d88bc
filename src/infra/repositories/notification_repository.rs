//! In-app notification storage.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::notification::{self, ActiveModel, Entity as NotificationEntity};
use crate::domain::Notification;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: Notification) -> AppResult<Notification>;

    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid, limit: u64) -> AppResult<Vec<Notification>>;
}

/// Concrete implementation of NotificationRepository
pub struct NotificationStore {
    db: DatabaseConnection,
}

impl NotificationStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationRepository for NotificationStore {
    async fn create(&self, notification: Notification) -> AppResult<Notification> {
        let active_model = ActiveModel {
            id: Set(notification.id),
            user_id: Set(notification.user_id),
            notification_type: Set(notification.notification_type.as_str().to_string()),
            title: Set(notification.title),
            message: Set(notification.message),
            action_url: Set(notification.action_url),
            data: Set(notification.data),
            priority: Set(notification.priority.as_str().to_string()),
            read: Set(notification.read),
            created_at: Set(notification.created_at),
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(Notification::from(model))
    }

    async fn list_for_user(&self, user_id: Uuid, limit: u64) -> AppResult<Vec<Notification>> {
        let models = NotificationEntity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Notification::from).collect())
    }
}
