//! Team entity.

use sea_orm::entity::prelude::*;

use crate::domain::Team;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "teams")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub league_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Team {
    fn from(model: Model) -> Self {
        Team {
            id: model.id,
            name: model.name,
            league_id: model.league_id,
        }
    }
}
