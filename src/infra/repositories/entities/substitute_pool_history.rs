//! Substitute pool audit entity.

use sea_orm::entity::prelude::*;

use crate::domain::{PoolAction, PoolHistory};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "substitute_pool_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub player_id: Uuid,
    pub league_id: Uuid,
    pub action: String,
    pub notes: Option<String>,
    pub performed_by: Option<Uuid>,
    pub performed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for PoolHistory {
    fn from(model: Model) -> Self {
        PoolHistory {
            id: model.id,
            player_id: model.player_id,
            league_id: model.league_id,
            action: PoolAction::from(model.action.as_str()),
            notes: model.notes,
            performed_by: model.performed_by,
            performed_at: model.performed_at,
        }
    }
}
