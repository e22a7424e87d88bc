//! Match availability (RSVP) types and the transition rules between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

/// A player's answer for a scheduled match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RsvpResponse {
    Yes,
    No,
    Maybe,
    NoResponse,
}

impl RsvpResponse {
    pub const ALL: [RsvpResponse; 4] = [
        RsvpResponse::Yes,
        RsvpResponse::No,
        RsvpResponse::Maybe,
        RsvpResponse::NoResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpResponse::Yes => "yes",
            RsvpResponse::No => "no",
            RsvpResponse::Maybe => "maybe",
            RsvpResponse::NoResponse => "no_response",
        }
    }
}

impl std::fmt::Display for RsvpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RsvpResponse {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(RsvpResponse::Yes),
            "no" => Ok(RsvpResponse::No),
            "maybe" => Ok(RsvpResponse::Maybe),
            "no_response" => Ok(RsvpResponse::NoResponse),
            other => Err(AppError::validation(format!("Invalid response: {}", other))),
        }
    }
}

/// Where an RSVP change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RsvpSource {
    Mobile,
    Web,
    Discord,
    System,
}

impl RsvpSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpSource::Mobile => "mobile",
            RsvpSource::Web => "web",
            RsvpSource::Discord => "discord",
            RsvpSource::System => "system",
        }
    }
}

impl std::fmt::Display for RsvpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored availability row for one player and match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Availability {
    pub id: Uuid,
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub discord_id: Option<String>,
    pub response: RsvpResponse,
    pub responded_at: DateTime<Utc>,
    pub operation_id: Option<String>,
    pub trace_id: Option<String>,
}

/// What a write should do to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpTransition {
    /// Stored answer already matches.
    Unchanged,
    /// Remove the row; absence means `no_response`.
    Clear,
    /// Insert or overwrite the row.
    Upsert(RsvpResponse),
}

/// Decide how to move from the stored answer to the requested one.
pub fn plan_transition(old: RsvpResponse, new: RsvpResponse) -> RsvpTransition {
    if old == new {
        RsvpTransition::Unchanged
    } else if new == RsvpResponse::NoResponse {
        RsvpTransition::Clear
    } else {
        RsvpTransition::Upsert(new)
    }
}

/// Data written inside the locked transaction.
#[derive(Debug, Clone)]
pub struct AvailabilityWrite {
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub discord_id: Option<String>,
    pub response: RsvpResponse,
    pub operation_id: String,
    pub trace_id: String,
}

/// Outcome of a locked availability write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedChange {
    pub old_response: RsvpResponse,
    pub transition: RsvpTransition,
}

impl AppliedChange {
    pub fn changed(&self) -> bool {
        self.transition != RsvpTransition::Unchanged
    }
}

/// Stream families an event can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTarget {
    Audit,
    Analytics,
    Websocket,
    Discord,
}

impl StreamTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamTarget::Audit => "audit",
            StreamTarget::Analytics => "analytics",
            StreamTarget::Websocket => "websocket",
            StreamTarget::Discord => "discord",
        }
    }
}

/// Event emitted after a committed availability change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RsvpEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub old_response: RsvpResponse,
    pub new_response: RsvpResponse,
    pub discord_id: Option<String>,
    pub player_name: String,
    pub team_id: Option<Uuid>,
    pub source: RsvpSource,
    pub trace_id: String,
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

pub const EVENT_TYPE_RSVP_UPDATED: &str = "rsvp_updated";

impl RsvpEvent {
    /// Streams this event belongs on.
    ///
    /// Changes that came from Discord are not echoed back to the Discord stream.
    pub fn targets(&self) -> Vec<StreamTarget> {
        let mut targets = vec![
            StreamTarget::Audit,
            StreamTarget::Analytics,
            StreamTarget::Websocket,
        ];
        if self.source != RsvpSource::Discord {
            targets.push(StreamTarget::Discord);
        }
        targets
    }

    /// Routing key used by stream consumers.
    pub fn routing_key(&self) -> String {
        format!("rsvp.{}.{}", self.match_id, self.player_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_responses() {
        assert_eq!("yes".parse::<RsvpResponse>().unwrap(), RsvpResponse::Yes);
        assert_eq!(
            "no_response".parse::<RsvpResponse>().unwrap(),
            RsvpResponse::NoResponse
        );
        let err = "perhaps".parse::<RsvpResponse>().unwrap_err();
        assert_eq!(err.user_message(), "Invalid response: perhaps");
    }

    #[test]
    fn test_same_answer_is_unchanged() {
        assert_eq!(
            plan_transition(RsvpResponse::Yes, RsvpResponse::Yes),
            RsvpTransition::Unchanged
        );
        assert_eq!(
            plan_transition(RsvpResponse::NoResponse, RsvpResponse::NoResponse),
            RsvpTransition::Unchanged
        );
    }

    #[test]
    fn test_no_response_clears_row() {
        assert_eq!(
            plan_transition(RsvpResponse::Maybe, RsvpResponse::NoResponse),
            RsvpTransition::Clear
        );
    }

    #[test]
    fn test_new_answer_upserts() {
        assert_eq!(
            plan_transition(RsvpResponse::NoResponse, RsvpResponse::No),
            RsvpTransition::Upsert(RsvpResponse::No)
        );
    }

    fn event(source: RsvpSource) -> RsvpEvent {
        RsvpEvent {
            event_id: Uuid::new_v4(),
            event_type: EVENT_TYPE_RSVP_UPDATED.to_string(),
            match_id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
            old_response: RsvpResponse::NoResponse,
            new_response: RsvpResponse::Yes,
            discord_id: None,
            player_name: "Sam".to_string(),
            team_id: None,
            source,
            trace_id: "t".to_string(),
            operation_id: "o".to_string(),
            user_agent: None,
            ip_address: None,
            session_id: None,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn test_discord_changes_not_echoed() {
        let targets = event(RsvpSource::Discord).targets();
        assert!(targets.contains(&StreamTarget::Audit));
        assert!(!targets.contains(&StreamTarget::Discord));

        let targets = event(RsvpSource::Mobile).targets();
        assert!(targets.contains(&StreamTarget::Discord));
        assert_eq!(targets.len(), 4);
    }
}
