//! Notification types, delivery channels and per-user channel selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::User;

/// Category of a notification; drives which preference applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    MatchReminder,
    MatchResult,
    MatchCancelled,
    MatchRescheduled,
    RsvpReminder,
    RsvpConfirmed,
    TeamUpdate,
    TeamRosterChange,
    LeagueAnnouncement,
    StandingsUpdate,
    AdminAnnouncement,
    System,
    Welcome,
    SubRequest,
    SubFilled,
    DirectMessage,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::MatchReminder => "match_reminder",
            NotificationType::MatchResult => "match_result",
            NotificationType::MatchCancelled => "match_cancelled",
            NotificationType::MatchRescheduled => "match_rescheduled",
            NotificationType::RsvpReminder => "rsvp_reminder",
            NotificationType::RsvpConfirmed => "rsvp_confirmed",
            NotificationType::TeamUpdate => "team_update",
            NotificationType::TeamRosterChange => "team_roster_change",
            NotificationType::LeagueAnnouncement => "league_announcement",
            NotificationType::StandingsUpdate => "standings_update",
            NotificationType::AdminAnnouncement => "admin_announcement",
            NotificationType::System => "system",
            NotificationType::Welcome => "welcome",
            NotificationType::SubRequest => "sub_request",
            NotificationType::SubFilled => "sub_filled",
            NotificationType::DirectMessage => "direct_message",
        }
    }

    pub const ALL: [NotificationType; 16] = [
        NotificationType::MatchReminder,
        NotificationType::MatchResult,
        NotificationType::MatchCancelled,
        NotificationType::MatchRescheduled,
        NotificationType::RsvpReminder,
        NotificationType::RsvpConfirmed,
        NotificationType::TeamUpdate,
        NotificationType::TeamRosterChange,
        NotificationType::LeagueAnnouncement,
        NotificationType::StandingsUpdate,
        NotificationType::AdminAnnouncement,
        NotificationType::System,
        NotificationType::Welcome,
        NotificationType::SubRequest,
        NotificationType::SubFilled,
        NotificationType::DirectMessage,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Push,
    Email,
    Sms,
    Discord,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::InApp,
        Channel::Push,
        Channel::Email,
        Channel::Sms,
        Channel::Discord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::InApp => "in_app",
            Channel::Push => "push",
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Discord => "discord",
        }
    }

    /// Case-insensitive parse.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "in_app" => Some(Channel::InApp),
            "push" => Some(Channel::Push),
            "email" => Some(Channel::Email),
            "sms" => Some(Channel::Sms),
            "discord" => Some(Channel::Discord),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "normal" => Some(Priority::Normal),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// A notification addressed to a set of users.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationPayload {
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub user_ids: Vec<Uuid>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub action_url: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub force_push: Option<bool>,
    #[serde(default)]
    pub force_in_app: Option<bool>,
    #[serde(default)]
    pub force_email: Option<bool>,
    #[serde(default)]
    pub force_sms: Option<bool>,
    #[serde(default)]
    pub force_discord: Option<bool>,
    /// Critical notifications ignore user preferences, except for SMS.
    #[serde(default)]
    pub skip_preferences: bool,
}

impl NotificationPayload {
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        user_ids: Vec<Uuid>,
    ) -> Self {
        Self {
            notification_type,
            title: title.into(),
            message: message.into(),
            user_ids,
            data: None,
            action_url: None,
            priority: Priority::Normal,
            force_push: None,
            force_in_app: None,
            force_email: None,
            force_sms: None,
            force_discord: None,
            skip_preferences: false,
        }
    }

    fn force_for(&self, channel: Channel) -> Option<bool> {
        match channel {
            Channel::InApp => self.force_in_app,
            Channel::Push => self.force_push,
            Channel::Email => self.force_email,
            Channel::Sms => self.force_sms,
            Channel::Discord => self.force_discord,
        }
    }
}

/// Decision for one channel and one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDecision {
    Send,
    Skip,
}

/// Channels selected for one user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelPlan {
    pub send: Vec<Channel>,
    pub skip: Vec<Channel>,
}

/// Apply the preference rules to pick channels for `user`.
pub fn evaluate_channels(user: &User, payload: &NotificationPayload) -> ChannelPlan {
    let mut plan = ChannelPlan::default();
    for channel in Channel::ALL {
        match decide(user, payload, channel) {
            ChannelDecision::Send => plan.send.push(channel),
            ChannelDecision::Skip => plan.skip.push(channel),
        }
    }
    plan
}

/// Decide whether `channel` should be used for `user`.
pub fn decide(user: &User, payload: &NotificationPayload, channel: Channel) -> ChannelDecision {
    let send = match channel {
        Channel::InApp => payload.force_in_app != Some(false),
        Channel::Sms => should_send_sms(user, payload),
        _ => match payload.force_for(channel) {
            Some(forced) => forced,
            None if payload.skip_preferences => true,
            None => {
                global_switch(user, channel)
                    && type_preference(user, payload.notification_type, channel)
            }
        },
    };

    // A forced or critical send still needs somewhere to deliver to.
    if send && has_contact(user, channel) {
        ChannelDecision::Send
    } else {
        ChannelDecision::Skip
    }
}

fn should_send_sms(user: &User, payload: &NotificationPayload) -> bool {
    match payload.force_sms {
        Some(true) => user.phone_verified,
        Some(false) => false,
        None => {
            user.sms_notifications
                && user.phone_verified
                && user.sms_consent
                && type_preference(user, payload.notification_type, Channel::Sms)
        }
    }
}

fn global_switch(user: &User, channel: Channel) -> bool {
    match channel {
        Channel::InApp => true,
        Channel::Push => user.push_notifications,
        Channel::Email => user.email_notifications,
        Channel::Sms => user.sms_notifications,
        Channel::Discord => user.discord_notifications,
    }
}

fn has_contact(user: &User, channel: Channel) -> bool {
    match channel {
        Channel::InApp => true,
        Channel::Push => user.has_push_tokens(),
        Channel::Email => user.has_email(),
        Channel::Sms => user.has_phone(),
        Channel::Discord => user.has_discord(),
    }
}

fn type_preference(user: &User, kind: NotificationType, channel: Channel) -> bool {
    let prefs = &user.preferences;
    match kind {
        NotificationType::MatchReminder
        | NotificationType::MatchResult
        | NotificationType::MatchCancelled
        | NotificationType::MatchRescheduled => prefs.match_reminders,
        NotificationType::RsvpReminder | NotificationType::RsvpConfirmed => prefs.rsvp_reminders,
        NotificationType::TeamUpdate | NotificationType::TeamRosterChange => prefs.team_updates,
        NotificationType::LeagueAnnouncement | NotificationType::AdminAnnouncement => {
            prefs.announcements
        }
        // Push has no direct-message preference.
        NotificationType::DirectMessage if channel != Channel::Push => prefs.dm_notifications,
        _ => true,
    }
}

/// Stored in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
    pub data: Option<serde_json::Value>,
    pub priority: Priority,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Success, failure and skip counts for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChannelTally {
    pub success: u32,
    pub failed: u32,
    pub skipped: u32,
}

/// Aggregated fan-out outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryReport {
    pub in_app: ChannelTally,
    pub push: ChannelTally,
    pub email: ChannelTally,
    pub sms: ChannelTally,
    pub discord: ChannelTally,
    pub total_users: u32,
}

impl DeliveryReport {
    pub fn tally_mut(&mut self, channel: Channel) -> &mut ChannelTally {
        match channel {
            Channel::InApp => &mut self.in_app,
            Channel::Push => &mut self.push,
            Channel::Email => &mut self.email,
            Channel::Sms => &mut self.sms,
            Channel::Discord => &mut self.discord,
        }
    }

    pub fn tally(&self, channel: Channel) -> ChannelTally {
        match channel {
            Channel::InApp => self.in_app,
            Channel::Push => self.push,
            Channel::Email => self.email,
            Channel::Sms => self.sms,
            Channel::Discord => self.discord,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reachable_user() -> User {
        let mut user = User::new(Uuid::new_v4(), "Robin".to_string());
        user.email = Some("robin@example.com".to_string());
        user.phone = Some("+15550100".to_string());
        user.phone_verified = true;
        user.sms_consent = true;
        user.discord_id = Some("123".to_string());
        user.push_tokens = vec!["device".to_string()];
        user
    }

    fn payload(kind: NotificationType) -> NotificationPayload {
        NotificationPayload::new(kind, "Title", "Body", vec![])
    }

    #[test]
    fn test_all_channels_when_reachable() {
        let plan = evaluate_channels(&reachable_user(), &payload(NotificationType::MatchReminder));
        assert_eq!(plan.send.len(), 5);
        assert!(plan.skip.is_empty());
    }

    #[test]
    fn test_in_app_only_skipped_when_forced_off() {
        let user = User::new(Uuid::new_v4(), "Kim".to_string());
        let mut p = payload(NotificationType::System);
        assert_eq!(decide(&user, &p, Channel::InApp), ChannelDecision::Send);
        p.force_in_app = Some(false);
        assert_eq!(decide(&user, &p, Channel::InApp), ChannelDecision::Skip);
    }

    #[test]
    fn test_type_preference_blocks_channel() {
        let mut user = reachable_user();
        user.preferences.match_reminders = false;
        let plan = evaluate_channels(&user, &payload(NotificationType::MatchCancelled));
        assert_eq!(plan.send, vec![Channel::InApp]);
    }

    #[test]
    fn test_dm_preference_ignored_for_push() {
        let mut user = reachable_user();
        user.preferences.dm_notifications = false;
        let plan = evaluate_channels(&user, &payload(NotificationType::DirectMessage));
        assert_eq!(plan.send, vec![Channel::InApp, Channel::Push]);
    }

    #[test]
    fn test_force_overrides_preferences() {
        let mut user = reachable_user();
        user.email_notifications = false;
        let mut p = payload(NotificationType::TeamUpdate);
        p.force_email = Some(true);
        p.force_discord = Some(false);
        assert_eq!(decide(&user, &p, Channel::Email), ChannelDecision::Send);
        assert_eq!(decide(&user, &p, Channel::Discord), ChannelDecision::Skip);
    }

    #[test]
    fn test_forced_sms_requires_verified_phone() {
        let mut user = reachable_user();
        user.phone_verified = false;
        let mut p = payload(NotificationType::System);
        p.force_sms = Some(true);
        assert_eq!(decide(&user, &p, Channel::Sms), ChannelDecision::Skip);

        user.phone_verified = true;
        user.sms_consent = false;
        assert_eq!(decide(&user, &p, Channel::Sms), ChannelDecision::Send);
    }

    #[test]
    fn test_skip_preferences_does_not_bypass_sms_rules() {
        let mut user = reachable_user();
        user.sms_consent = false;
        user.email_notifications = false;
        let mut p = payload(NotificationType::System);
        p.skip_preferences = true;
        assert_eq!(decide(&user, &p, Channel::Sms), ChannelDecision::Skip);
        assert_eq!(decide(&user, &p, Channel::Email), ChannelDecision::Send);
    }

    #[test]
    fn test_missing_contact_skips_even_when_forced() {
        let user = User::new(Uuid::new_v4(), "Lee".to_string());
        let mut p = payload(NotificationType::System);
        p.force_discord = Some(true);
        assert_eq!(decide(&user, &p, Channel::Discord), ChannelDecision::Skip);
    }

    #[test]
    fn test_notification_type_names() {
        for kind in NotificationType::ALL {
            assert_eq!(NotificationType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NotificationType::parse("carrier_pigeon"), None);
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!(Channel::parse("EMAIL"), Some(Channel::Email));
        assert_eq!(Channel::parse("in_app"), Some(Channel::InApp));
        assert_eq!(Channel::parse("fax"), None);
    }
}
