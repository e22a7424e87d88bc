//! Substitute assignment entity.

use sea_orm::entity::prelude::*;

use crate::domain::substitute::parse_channels;
use crate::domain::SubstituteAssignment;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "substitute_assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub request_id: Uuid,
    pub player_id: Uuid,
    pub assigned_by: Uuid,
    pub position_assigned: Option<String>,
    pub notes: Option<String>,
    pub notification_sent: bool,
    pub notification_sent_at: Option<DateTimeUtc>,
    pub notification_methods: Option<String>,
    pub assigned_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SubstituteAssignment {
    fn from(model: Model) -> Self {
        SubstituteAssignment {
            id: model.id,
            request_id: model.request_id,
            player_id: model.player_id,
            assigned_by: model.assigned_by,
            position_assigned: model.position_assigned,
            notes: model.notes,
            notification_sent: model.notification_sent,
            notification_sent_at: model.notification_sent_at,
            notification_methods: parse_channels(
                model.notification_methods.as_deref().unwrap_or(""),
            ),
            assigned_at: model.assigned_at,
        }
    }
}
