//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{NotificationPreferences, User, UserRole};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: Option<String>,
    pub name: String,
    pub role: String,
    pub phone: Option<String>,
    pub phone_verified: bool,
    pub sms_consent: bool,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub discord_notifications: bool,
    pub push_notifications: bool,
    pub match_reminders: bool,
    pub rsvp_reminders: bool,
    pub team_updates: bool,
    pub announcements: bool,
    pub dm_notifications: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Build the domain user; the Discord id lives on the linked player.
    pub fn into_user(self, discord_id: Option<String>, push_tokens: Vec<String>) -> User {
        User {
            id: self.id,
            email: self.email,
            name: self.name,
            role: UserRole::from(self.role.as_str()),
            phone: self.phone,
            phone_verified: self.phone_verified,
            sms_consent: self.sms_consent,
            discord_id,
            email_notifications: self.email_notifications,
            sms_notifications: self.sms_notifications,
            discord_notifications: self.discord_notifications,
            push_notifications: self.push_notifications,
            preferences: NotificationPreferences {
                match_reminders: self.match_reminders,
                rsvp_reminders: self.rsvp_reminders,
                team_updates: self.team_updates,
                announcements: self.announcements,
                dm_notifications: self.dm_notifications,
            },
            push_tokens,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
