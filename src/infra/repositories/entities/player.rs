//! Player entity.

use sea_orm::entity::prelude::*;

use crate::domain::Player;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "players")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Option<Uuid>,
    pub name: String,
    #[sea_orm(unique)]
    pub discord_id: Option<String>,
    pub gender: Option<String>,
    pub league_id: Option<Uuid>,
    pub primary_team_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_player(self, team_ids: Vec<Uuid>) -> Player {
        Player {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            discord_id: self.discord_id,
            gender: self.gender,
            league_id: self.league_id,
            primary_team_id: self.primary_team_id,
            team_ids,
            is_active: self.is_active,
        }
    }
}
