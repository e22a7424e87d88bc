//! Players, teams and matches.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

/// Player profile linked to a user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Player {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub discord_id: Option<String>,
    pub gender: Option<String>,
    pub league_id: Option<Uuid>,
    pub primary_team_id: Option<Uuid>,
    /// Every team the player is rostered on.
    pub team_ids: Vec<Uuid>,
    pub is_active: bool,
}

impl Player {
    /// Team the player represents in a match between `home` and `away`.
    ///
    /// Falls back to the primary team when the player is on neither side.
    pub fn team_for_match(&self, home: Uuid, away: Uuid) -> Option<Uuid> {
        if self.team_ids.contains(&home) {
            Some(home)
        } else if self.team_ids.contains(&away) {
            Some(away)
        } else {
            self.primary_team_id
        }
    }
}

/// Narrows a pool search to one gender.
///
/// Only an explicit male or female filter narrows a search. A request's
/// free-text gender preference is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenderFilter {
    Male,
    Female,
}

impl GenderFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenderFilter::Male => "male",
            GenderFilter::Female => "female",
        }
    }

    /// Blank input means no filter.
    pub fn parse_optional(value: Option<&str>) -> Result<Option<Self>, AppError> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::parse)
            .transpose()
    }

    /// Players without a recorded gender never match.
    pub fn admits(&self, gender: Option<&str>) -> bool {
        gender.is_some_and(|g| g.trim().eq_ignore_ascii_case(self.as_str()))
    }
}

impl FromStr for GenderFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(GenderFilter::Male),
            "female" => Ok(GenderFilter::Female),
            other => Err(AppError::validation(format!(
                "Invalid gender filter: {} (expected male or female)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub league_id: Uuid,
}

/// Scheduled match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Match {
    pub id: Uuid,
    pub league_id: Uuid,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Matches dated before `today` no longer accept answers.
    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.date < today
    }

    pub fn involves_team(&self, team_id: Uuid) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }
}

pub const EVENT_TYPE_PLAYER_DRAFTED: &str = "player_drafted";

/// Emitted after a player joins a team through the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DraftEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub player_id: Uuid,
    pub player_name: String,
    pub team_id: Uuid,
    pub team_name: String,
    pub league_id: Uuid,
    pub season: Option<String>,
    pub drafted_by: Uuid,
    pub occurred_at: DateTime<Utc>,
}
