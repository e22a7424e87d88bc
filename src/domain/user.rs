//! User accounts and their notification settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{ROLE_ADMIN, ROLE_COACH, ROLE_USER};

/// User roles enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Coach,
    Admin,
}

impl UserRole {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Coaches and admins may manage substitute requests.
    pub fn can_manage_substitutes(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Coach)
    }
}

impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        match s {
            ROLE_ADMIN => UserRole::Admin,
            ROLE_COACH => UserRole::Coach,
            _ => UserRole::User,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "{}", ROLE_ADMIN),
            UserRole::Coach => write!(f, "{}", ROLE_COACH),
            UserRole::User => write!(f, "{}", ROLE_USER),
        }
    }
}

/// Per-type notification preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NotificationPreferences {
    pub match_reminders: bool,
    pub rsvp_reminders: bool,
    pub team_updates: bool,
    pub announcements: bool,
    pub dm_notifications: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            match_reminders: true,
            rsvp_reminders: true,
            team_updates: true,
            announcements: true,
            dm_notifications: true,
        }
    }
}

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub phone_verified: bool,
    pub sms_consent: bool,
    pub discord_id: Option<String>,
    // Global channel switches
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub discord_notifications: bool,
    pub push_notifications: bool,
    pub preferences: NotificationPreferences,
    /// Registered device tokens for push delivery
    pub push_tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a user with every notification switch enabled and no contacts.
    pub fn new(id: Uuid, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: None,
            name,
            role: UserRole::User,
            phone: None,
            phone_verified: false,
            sms_consent: false,
            discord_id: None,
            email_notifications: true,
            sms_notifications: true,
            discord_notifications: true,
            push_notifications: true,
            preferences: NotificationPreferences::default(),
            push_tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.is_empty())
    }

    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn has_discord(&self) -> bool {
        self.discord_id.as_deref().is_some_and(|d| !d.is_empty())
    }

    pub fn has_push_tokens(&self) -> bool {
        !self.push_tokens.is_empty()
    }
}
