//! Substitute pool membership entity.

use sea_orm::entity::prelude::*;

use crate::domain::PoolEntry;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "substitute_pools")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub player_id: Uuid,
    pub league_id: Uuid,
    pub is_active: bool,
    pub preferred_positions: Option<String>,
    pub max_matches_per_week: Option<i32>,
    pub sms_for_sub_requests: bool,
    pub discord_for_sub_requests: bool,
    pub email_for_sub_requests: bool,
    pub requests_received: i32,
    pub requests_accepted: i32,
    pub matches_played: i32,
    pub joined_pool_at: DateTimeUtc,
    pub last_active_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for PoolEntry {
    fn from(model: Model) -> Self {
        PoolEntry {
            id: model.id,
            player_id: model.player_id,
            league_id: model.league_id,
            is_active: model.is_active,
            preferred_positions: model.preferred_positions,
            max_matches_per_week: model.max_matches_per_week,
            sms_for_sub_requests: model.sms_for_sub_requests,
            discord_for_sub_requests: model.discord_for_sub_requests,
            email_for_sub_requests: model.email_for_sub_requests,
            requests_received: model.requests_received,
            requests_accepted: model.requests_accepted,
            matches_played: model.matches_played,
            joined_pool_at: model.joined_pool_at,
            last_active_at: model.last_active_at,
        }
    }
}
