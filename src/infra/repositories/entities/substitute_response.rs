//! Substitute response (outreach record) entity.

use sea_orm::entity::prelude::*;

use crate::domain::substitute::parse_channels;
use crate::domain::{ResponseMethod, SubstituteResponse};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "substitute_responses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub request_id: Uuid,
    pub player_id: Uuid,
    pub is_available: Option<bool>,
    pub response_method: Option<String>,
    pub response_text: Option<String>,
    pub notification_sent_at: Option<DateTimeUtc>,
    /// Comma separated channel names
    pub notification_methods: Option<String>,
    pub responded_at: Option<DateTimeUtc>,
    #[sea_orm(unique)]
    pub rsvp_token: String,
    pub token_expires_at: DateTimeUtc,
    pub token_used_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::substitute_request::Entity",
        from = "Column::RequestId",
        to = "super::substitute_request::Column::Id"
    )]
    Request,
}

impl Related<super::substitute_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SubstituteResponse {
    fn from(model: Model) -> Self {
        SubstituteResponse {
            id: model.id,
            request_id: model.request_id,
            player_id: model.player_id,
            is_available: model.is_available,
            response_method: model
                .response_method
                .as_deref()
                .map(ResponseMethod::from),
            response_text: model.response_text,
            notification_sent_at: model.notification_sent_at,
            notification_methods: parse_channels(
                model.notification_methods.as_deref().unwrap_or(""),
            ),
            responded_at: model.responded_at,
            rsvp_token: model.rsvp_token,
            token_expires_at: model.token_expires_at,
            token_used_at: model.token_used_at,
            created_at: model.created_at,
        }
    }
}
