//! Text builders for substitute outreach.

use chrono::{NaiveDate, NaiveTime};

use crate::config::{DEEP_LINK_PREFIX, PUSH_BODY_MAX_LENGTH, SMS_MAX_LENGTH, SMS_MAX_LINES, SUB_RSVP_PATH};

/// Match details shown in outreach messages.
#[derive(Debug, Clone)]
pub struct MatchDetails {
    pub home_team: String,
    pub away_team: String,
    pub requesting_team: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub location: Option<String>,
}

/// Public RSVP page for a token.
pub fn rsvp_url(base_url: &str, token: &str) -> String {
    format!("{}{}{}", base_url.trim_end_matches('/'), SUB_RSVP_PATH, token)
}

/// Mobile app deep link for a token.
pub fn deep_link(token: &str) -> String {
    format!("{}{}", DEEP_LINK_PREFIX, token)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

fn format_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%-I:%M %p").to_string())
        .unwrap_or_else(|| "TBD".to_string())
}

/// Outreach body sent to pool members.
pub fn build_sub_message(
    custom_message: &str,
    details: &MatchDetails,
    positions: Option<&str>,
    notes: Option<&str>,
    url: &str,
) -> String {
    let mut lines = vec![custom_message.trim().to_string(), String::new()];
    lines.push(format!("Match: {} vs {}", details.home_team, details.away_team));
    lines.push(format!("Team: {}", details.requesting_team));
    lines.push(format!("Date: {}", format_date(details.date)));
    lines.push(format!("Time: {}", format_time(details.time)));
    lines.push(format!(
        "Location: {}",
        details.location.as_deref().unwrap_or("TBD")
    ));
    if let Some(positions) = positions.filter(|p| !p.trim().is_empty()) {
        lines.push(format!("Position(s) needed: {}", positions));
    }
    if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
        lines.push(format!("Notes: {}", notes));
    }
    lines.push(String::new());
    lines.push(format!("Click here to respond: {}", url));
    lines.join("\n")
}

/// Message sent to a player once they are assigned.
pub fn build_confirmation(
    player_name: &str,
    details: &MatchDetails,
    position: Option<&str>,
) -> String {
    let mut lines = vec![
        format!("Hi {},", player_name),
        String::new(),
        format!(
            "You have been confirmed as a substitute for {}.",
            details.requesting_team
        ),
        String::new(),
        format!("Match: {} vs {}", details.home_team, details.away_team),
        format!("Date: {}", format_date(details.date)),
        format!("Time: {}", format_time(details.time)),
        format!("Location: {}", details.location.as_deref().unwrap_or("TBD")),
    ];
    if let Some(position) = position.filter(|p| !p.trim().is_empty()) {
        lines.push(format!("Position: {}", position));
    }
    lines.push(String::new());
    lines.push("Please arrive 15 minutes before the match. Thanks for stepping up!".to_string());
    lines.join("\n")
}

/// Compact SMS rendition of `message`.
pub fn sms_body(message: &str, url: Option<&str>) -> String {
    let mut parts: Vec<String> = message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("Click here to respond"))
        .take(SMS_MAX_LINES)
        .map(str::to_string)
        .collect();
    if let Some(url) = url {
        parts.push(format!("Respond: {}", url));
    }
    parts.push("Reply STOP to opt out.".to_string());
    truncate_chars(&parts.join(" | "), SMS_MAX_LENGTH)
}

/// First line of `message`, cut down for a push notification.
pub fn push_body(message: &str) -> String {
    let first = message.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    truncate_chars(first, PUSH_BODY_MAX_LENGTH)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
