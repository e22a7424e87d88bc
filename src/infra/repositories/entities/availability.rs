//! Availability (RSVP) entity.

use sea_orm::entity::prelude::*;

use crate::domain::{Availability, RsvpResponse};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "availability")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub discord_id: Option<String>,
    pub response: String,
    pub responded_at: DateTimeUtc,
    pub operation_id: Option<String>,
    pub trace_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Stored answer; unknown values read as `no_response`.
    pub fn stored_response(&self) -> RsvpResponse {
        self.response.parse().unwrap_or(RsvpResponse::NoResponse)
    }
}

impl From<Model> for Availability {
    fn from(model: Model) -> Self {
        let response = model.stored_response();
        Availability {
            id: model.id,
            match_id: model.match_id,
            player_id: model.player_id,
            discord_id: model.discord_id,
            response,
            responded_at: model.responded_at,
            operation_id: model.operation_id,
            trace_id: model.trace_id,
        }
    }
}
