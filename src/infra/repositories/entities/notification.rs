//! In-app notification entity.

use sea_orm::entity::prelude::*;

use crate::domain::{Notification, NotificationType, Priority};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
    pub data: Option<Json>,
    pub priority: String,
    pub read: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Notification {
    fn from(model: Model) -> Self {
        Notification {
            id: model.id,
            user_id: model.user_id,
            notification_type: NotificationType::parse(&model.notification_type)
                .unwrap_or(NotificationType::System),
            title: model.title,
            message: model.message,
            action_url: model.action_url,
            data: model.data,
            priority: Priority::parse(&model.priority).unwrap_or_default(),
            read: model.read,
            created_at: model.created_at,
        }
    }
}
