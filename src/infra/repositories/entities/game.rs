//! Match entity.

use sea_orm::entity::prelude::*;

use crate::domain::Match;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "matches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub league_id: Uuid,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub date: Date,
    pub time: Option<Time>,
    pub location: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Match {
    fn from(model: Model) -> Self {
        Match {
            id: model.id,
            league_id: model.league_id,
            home_team_id: model.home_team_id,
            away_team_id: model.away_team_id,
            date: model.date,
            time: model.time,
            location: model.location,
            created_at: model.created_at,
        }
    }
}
