//! Substitute request entity.

use sea_orm::entity::prelude::*;

use crate::domain::{RequestStatus, SubstituteRequest};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "substitute_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub match_id: Uuid,
    pub team_id: Uuid,
    pub league_id: Uuid,
    pub requested_by: Uuid,
    pub positions_needed: Option<String>,
    pub gender_preference: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub substitutes_needed: i32,
    pub filled_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SubstituteRequest {
    fn from(model: Model) -> Self {
        SubstituteRequest {
            id: model.id,
            match_id: model.match_id,
            team_id: model.team_id,
            league_id: model.league_id,
            requested_by: model.requested_by,
            positions_needed: model.positions_needed,
            gender_preference: model.gender_preference,
            notes: model.notes,
            status: RequestStatus::from(model.status.as_str()),
            substitutes_needed: model.substitutes_needed,
            filled_at: model.filled_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
