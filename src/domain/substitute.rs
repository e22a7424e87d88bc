//! Substitute requests, pool membership and token-based responses.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::notification::Channel;

/// Lifecycle of a substitute request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Open,
    Filled,
    Cancelled,
    Expired,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "OPEN",
            RequestStatus::Filled => "FILLED",
            RequestStatus::Cancelled => "CANCELLED",
            RequestStatus::Expired => "EXPIRED",
        }
    }
}

impl From<&str> for RequestStatus {
    fn from(s: &str) -> Self {
        match s {
            "FILLED" => RequestStatus::Filled,
            "CANCELLED" => RequestStatus::Cancelled,
            "EXPIRED" => RequestStatus::Expired,
            _ => RequestStatus::Open,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A team's call for substitutes for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubstituteRequest {
    pub id: Uuid,
    pub match_id: Uuid,
    pub team_id: Uuid,
    pub league_id: Uuid,
    pub requested_by: Uuid,
    pub positions_needed: Option<String>,
    pub gender_preference: Option<String>,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub substitutes_needed: i32,
    pub filled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubstituteRequest {
    pub fn is_open(&self) -> bool {
        self.status == RequestStatus::Open
    }
}

/// Fields for a new request.
#[derive(Debug, Clone)]
pub struct NewSubstituteRequest {
    pub match_id: Uuid,
    pub team_id: Uuid,
    pub league_id: Uuid,
    pub requested_by: Uuid,
    pub positions_needed: Option<String>,
    pub gender_preference: Option<String>,
    pub notes: Option<String>,
    pub substitutes_needed: i32,
}

/// How a substitute answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseMethod {
    Web,
    Sms,
    Discord,
    Email,
    Mobile,
}

impl ResponseMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMethod::Web => "WEB",
            ResponseMethod::Sms => "SMS",
            ResponseMethod::Discord => "DISCORD",
            ResponseMethod::Email => "EMAIL",
            ResponseMethod::Mobile => "MOBILE",
        }
    }
}

impl From<&str> for ResponseMethod {
    fn from(s: &str) -> Self {
        match s {
            "SMS" => ResponseMethod::Sms,
            "DISCORD" => ResponseMethod::Discord,
            "EMAIL" => ResponseMethod::Email,
            "MOBILE" => ResponseMethod::Mobile,
            _ => ResponseMethod::Web,
        }
    }
}

/// A pool member's outreach record and answer for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubstituteResponse {
    pub id: Uuid,
    pub request_id: Uuid,
    pub player_id: Uuid,
    /// `None` until the player answers.
    pub is_available: Option<bool>,
    pub response_method: Option<ResponseMethod>,
    pub response_text: Option<String>,
    pub notification_sent_at: Option<DateTime<Utc>>,
    pub notification_methods: Vec<Channel>,
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub rsvp_token: String,
    pub token_expires_at: DateTime<Utc>,
    pub token_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SubstituteResponse {
    pub fn has_responded(&self) -> bool {
        self.responded_at.is_some()
    }

    pub fn is_token_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.token_expires_at
    }

    pub fn is_token_valid(&self, now: DateTime<Utc>) -> bool {
        self.token_used_at.is_none() && !self.is_token_expired(now)
    }
}

/// Fields for a new outreach record.
#[derive(Debug, Clone)]
pub struct NewSubstituteResponse {
    pub request_id: Uuid,
    pub player_id: Uuid,
    pub notification_methods: Vec<Channel>,
    pub rsvp_token: String,
    pub token_expires_at: DateTime<Utc>,
}

/// Answer recorded against an outreach record.
#[derive(Debug, Clone)]
pub struct RecordedAnswer {
    pub is_available: bool,
    pub method: ResponseMethod,
    pub text: Option<String>,
    pub mark_token_used: bool,
}

/// A player selected to fill a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubstituteAssignment {
    pub id: Uuid,
    pub request_id: Uuid,
    pub player_id: Uuid,
    pub assigned_by: Uuid,
    pub position_assigned: Option<String>,
    pub notes: Option<String>,
    pub notification_sent: bool,
    pub notification_sent_at: Option<DateTime<Utc>>,
    pub notification_methods: Vec<Channel>,
    pub assigned_at: DateTime<Utc>,
}

/// Fields for a new assignment.
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub request_id: Uuid,
    pub player_id: Uuid,
    pub assigned_by: Uuid,
    pub position_assigned: Option<String>,
    pub notes: Option<String>,
}

/// Substitute pool membership for one league.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PoolEntry {
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
    pub joined_pool_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl PoolEntry {
    /// Percentage of requests the player accepted.
    pub fn acceptance_rate(&self) -> f64 {
        acceptance_rate(self.requests_received, self.requests_accepted)
    }

    /// Upper-cased preferred positions.
    pub fn positions(&self) -> Vec<String> {
        split_positions(self.preferred_positions.as_deref().unwrap_or(""))
    }

    /// Whether any preferred position matches one of `filters`.
    ///
    /// An empty filter list matches everyone.
    pub fn matches_positions(&self, filters: &[String]) -> bool {
        if filters.is_empty() {
            return true;
        }
        let mine = self.positions();
        filters
            .iter()
            .map(|f| f.trim().to_uppercase())
            .any(|f| mine.contains(&f))
    }
}

/// Pool membership settings supplied on join or update.
#[derive(Debug, Clone, Default)]
pub struct PoolPreferences {
    pub preferred_positions: Option<String>,
    pub max_matches_per_week: Option<i32>,
    pub sms_for_sub_requests: Option<bool>,
    pub discord_for_sub_requests: Option<bool>,
    pub email_for_sub_requests: Option<bool>,
}

/// Audit actions recorded in pool history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolAction {
    Added,
    Removed,
    Activated,
    Deactivated,
    PreferencesUpdated,
}

impl PoolAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolAction::Added => "ADDED",
            PoolAction::Removed => "REMOVED",
            PoolAction::Activated => "ACTIVATED",
            PoolAction::Deactivated => "DEACTIVATED",
            PoolAction::PreferencesUpdated => "PREFERENCES_UPDATED",
        }
    }
}

impl From<&str> for PoolAction {
    fn from(s: &str) -> Self {
        match s {
            "REMOVED" => PoolAction::Removed,
            "ACTIVATED" => PoolAction::Activated,
            "DEACTIVATED" => PoolAction::Deactivated,
            "PREFERENCES_UPDATED" => PoolAction::PreferencesUpdated,
            _ => PoolAction::Added,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PoolHistory {
    pub id: Uuid,
    pub player_id: Uuid,
    pub league_id: Uuid,
    pub action: PoolAction,
    pub notes: Option<String>,
    pub performed_by: Option<Uuid>,
    pub performed_at: DateTime<Utc>,
}

pub fn acceptance_rate(received: i32, accepted: i32) -> f64 {
    if received <= 0 {
        0.0
    } else {
        f64::from(accepted) / f64::from(received) * 100.0
    }
}

/// Split a comma separated position list into trimmed, upper-cased names.
pub fn split_positions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Generate a 64 character url-safe RSVP token.
pub fn generate_rsvp_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

static RSVP_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{16,128}$").unwrap());

/// Whether `token` could have come from an outreach link.
pub fn is_well_formed_token(token: &str) -> bool {
    RSVP_TOKEN_RE.is_match(token)
}

/// Expiry for a token issued at `now`.
pub fn token_expiry(now: DateTime<Utc>, ttl_hours: i64) -> DateTime<Utc> {
    now + Duration::hours(ttl_hours)
}

/// Interpret a free-text SMS or Discord reply.
pub fn parse_reply(text: &str) -> bool {
    matches!(
        text.trim().to_uppercase().as_str(),
        "YES" | "Y" | "AVAILABLE" | "1"
    )
}

/// Render channels as the comma list stored in the database.
pub fn join_channels(channels: &[Channel]) -> String {
    channels
        .iter()
        .map(|c| c.as_str().to_uppercase())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse the stored comma list, ignoring unknown entries.
pub fn parse_channels(raw: &str) -> Vec<Channel> {
    raw.split(',')
        .filter_map(|c| Channel::parse(c.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(positions: Option<&str>, received: i32, accepted: i32) -> PoolEntry {
        PoolEntry {
            id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
            league_id: Uuid::new_v4(),
            is_active: true,
            preferred_positions: positions.map(str::to_string),
            max_matches_per_week: None,
            sms_for_sub_requests: true,
            discord_for_sub_requests: true,
            email_for_sub_requests: true,
            requests_received: received,
            requests_accepted: accepted,
            matches_played: 0,
            joined_pool_at: Utc::now(),
            last_active_at: None,
        }
    }

    #[test]
    fn test_position_filter_is_case_insensitive() {
        let e = entry(Some("goalkeeper, Defender"), 0, 0);
        assert!(e.matches_positions(&["DEFENDER".to_string()]));
        assert!(e.matches_positions(&["goalkeeper".to_string()]));
        assert!(!e.matches_positions(&["FORWARD".to_string()]));
        assert!(e.matches_positions(&[]));
    }

    #[test]
    fn test_no_positions_never_match_a_filter() {
        let e = entry(None, 0, 0);
        assert!(!e.matches_positions(&["MIDFIELDER".to_string()]));
    }

    #[test]
    fn test_acceptance_rate() {
        assert_eq!(entry(None, 0, 0).acceptance_rate(), 0.0);
        assert_eq!(entry(None, 4, 1).acceptance_rate(), 25.0);
    }

    #[test]
    fn test_token_shape() {
        let token = generate_rsvp_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_rsvp_token());
    }

    #[test]
    fn test_token_format_check() {
        assert!(is_well_formed_token(&generate_rsvp_token()));
        assert!(!is_well_formed_token("short"));
        assert!(!is_well_formed_token("../../etc/passwd-and-more-chars"));
        assert!(!is_well_formed_token(&"a".repeat(129)));
    }

    #[test]
    fn test_parse_reply() {
        assert!(parse_reply(" yes "));
        assert!(parse_reply("Y"));
        assert!(parse_reply("available"));
        assert!(parse_reply("1"));
        assert!(!parse_reply("no"));
        assert!(!parse_reply("maybe"));
    }

    #[test]
    fn test_channel_list_round_trip() {
        let channels = vec![Channel::Email, Channel::Sms];
        assert_eq!(join_channels(&channels), "EMAIL,SMS");
        assert_eq!(parse_channels("EMAIL,SMS,CARRIER_PIGEON"), channels);
    }

    #[test]
    fn test_token_validity() {
        let now = Utc::now();
        let mut response = SubstituteResponse {
            id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
            is_available: None,
            response_method: None,
            response_text: None,
            notification_sent_at: Some(now),
            notification_methods: vec![],
            responded_at: None,
            rsvp_token: generate_rsvp_token(),
            token_expires_at: token_expiry(now, 48),
            token_used_at: None,
            created_at: now,
        };
        assert!(response.is_token_valid(now));
        assert!(!response.is_token_valid(now + Duration::hours(49)));

        response.token_used_at = Some(now);
        assert!(!response.is_token_valid(now));
    }
}
