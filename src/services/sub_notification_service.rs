//! Substitute outreach and assignment confirmations.
//!
//! Each contacted player gets a response record with a one-time RSVP token
//! before anything is sent, so a reply can always be matched to a request.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::messages::{
    build_confirmation, build_sub_message, deep_link, push_body, rsvp_url, sms_body, MatchDetails,
};
use crate::domain::substitute::{generate_rsvp_token, token_expiry};
use crate::domain::{
    Channel, GenderFilter, NewSubstituteResponse, Player, PoolEntry, SubstituteRequest, User,
};
use crate::errors::{AppError, AppResult};
use crate::infra::{DiscordGateway, PushGateway, PushMessage, SmsGateway, UnitOfWork};
use crate::jobs::{EmailJob, JobQueue};

/// Filters for a pool-wide outreach.
#[derive(Debug, Clone, Default)]
pub struct PoolOutreach {
    pub custom_message: String,
    /// Restrict delivery to these channels.
    pub channels: Option<Vec<Channel>>,
    /// Only players of this gender; the request's preference never filters.
    pub gender_filter: Option<GenderFilter>,
    pub position_filters: Vec<String>,
    /// Contact only these players.
    pub player_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct OutreachReport {
    pub notified: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Delivery result for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChannelResult {
    pub player_id: Uuid,
    pub sent: Vec<Channel>,
    pub failed: Vec<Channel>,
}

impl ChannelResult {
    pub fn any_sent(&self) -> bool {
        !self.sent.is_empty()
    }
}

/// Substitute notification service trait for dependency injection.
#[async_trait]
pub trait SubNotificationService: Send + Sync {
    async fn notify_pool(&self, request_id: Uuid, outreach: PoolOutreach)
        -> AppResult<OutreachReport>;

    async fn notify_individual(
        &self,
        request_id: Uuid,
        player_id: Uuid,
        custom_message: String,
    ) -> AppResult<ChannelResult>;

    /// Tell an assigned player they were selected; returns the channels used.
    async fn send_confirmation(&self, assignment_id: Uuid) -> AppResult<Vec<Channel>>;
}

/// Channels a player can be reached on for substitute outreach.
///
/// Pool preferences opt a channel in even when the account-wide switch is off.
pub fn outreach_channels(
    user: Option<&User>,
    discord_id: Option<&str>,
    pool: Option<&PoolEntry>,
) -> Vec<Channel> {
    let pool_pref = |f: fn(&PoolEntry) -> bool| pool.is_some_and(f);
    let user_flag = |f: fn(&User) -> bool| user.is_some_and(f);
    let mut channels = Vec::new();

    if user_flag(User::has_email)
        && (pool_pref(|p| p.email_for_sub_requests) || user_flag(|u| u.email_notifications))
    {
        channels.push(Channel::Email);
    }
    if user_flag(User::has_phone)
        && (pool_pref(|p| p.sms_for_sub_requests) || user_flag(|u| u.sms_notifications))
    {
        channels.push(Channel::Sms);
    }
    if discord_id.is_some_and(|d| !d.is_empty())
        && (pool_pref(|p| p.discord_for_sub_requests) || user_flag(|u| u.discord_notifications))
    {
        channels.push(Channel::Discord);
    }
    if user_flag(|u| u.push_notifications && u.has_push_tokens()) {
        channels.push(Channel::Push);
    }
    channels
}

/// A player with the account used to reach them.
struct Recipient {
    player: Player,
    user: Option<User>,
}

impl Recipient {
    fn discord_id(&self) -> Option<&str> {
        self.player
            .discord_id
            .as_deref()
            .or_else(|| self.user.as_ref().and_then(|u| u.discord_id.as_deref()))
    }
}

/// Text rendered for one delivery.
struct Outbound<'a> {
    subject: &'a str,
    body: &'a str,
    url: Option<&'a str>,
    push_data: serde_json::Value,
}

/// Concrete implementation of SubNotificationService.
pub struct SubNotifier<U: UnitOfWork> {
    uow: Arc<U>,
    discord: Arc<dyn DiscordGateway>,
    push: Arc<dyn PushGateway>,
    sms: Arc<dyn SmsGateway>,
    jobs: Arc<dyn JobQueue>,
    base_url: String,
    token_ttl_hours: i64,
}

impl<U: UnitOfWork> SubNotifier<U> {
    pub fn new(
        uow: Arc<U>,
        discord: Arc<dyn DiscordGateway>,
        push: Arc<dyn PushGateway>,
        sms: Arc<dyn SmsGateway>,
        jobs: Arc<dyn JobQueue>,
        base_url: impl Into<String>,
        token_ttl_hours: i64,
    ) -> Self {
        Self {
            uow,
            discord,
            push,
            sms,
            jobs,
            base_url: base_url.into(),
            token_ttl_hours,
        }
    }

    async fn open_request(&self, request_id: Uuid) -> AppResult<SubstituteRequest> {
        let request = self
            .uow
            .substitutes()
            .find_request(request_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !request.is_open() {
            return Err(AppError::validation(format!(
                "Substitute request is {}",
                request.status
            )));
        }
        Ok(request)
    }

    async fn match_details(&self, request: &SubstituteRequest) -> AppResult<MatchDetails> {
        let game = self
            .uow
            .league()
            .find_match(request.match_id)
            .await?
            .ok_or_else(|| AppError::validation("Match not found"))?;

        let names: HashMap<Uuid, String> = self
            .uow
            .league()
            .find_teams(vec![game.home_team_id, game.away_team_id, request.team_id])
            .await?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();
        let name = |id: Uuid| names.get(&id).cloned().unwrap_or_else(|| "TBD".to_string());

        Ok(MatchDetails {
            home_team: name(game.home_team_id),
            away_team: name(game.away_team_id),
            requesting_team: name(request.team_id),
            date: game.date,
            time: game.time,
            location: game.location,
        })
    }

    async fn recipients(&self, players: Vec<Player>) -> AppResult<Vec<Recipient>> {
        let user_ids: Vec<Uuid> = players.iter().filter_map(|p| p.user_id).collect();
        let mut users: HashMap<Uuid, User> = self
            .uow
            .users()
            .find_many(user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(players
            .into_iter()
            .map(|player| Recipient {
                user: player.user_id.and_then(|id| users.remove(&id)),
                player,
            })
            .collect())
    }

    async fn deliver_one(
        &self,
        recipient: &Recipient,
        channel: Channel,
        message: &Outbound<'_>,
    ) -> AppResult<()> {
        let user = recipient.user.as_ref();
        match channel {
            Channel::Email => {
                let to = user
                    .and_then(|u| u.email.clone())
                    .ok_or_else(|| AppError::validation("No email address"))?;
                self.jobs
                    .enqueue_email(EmailJob::new(to, message.subject, message.body))
                    .await
            }
            Channel::Sms => {
                let phone = user
                    .and_then(|u| u.phone.as_deref())
                    .ok_or_else(|| AppError::validation("No phone number"))?;
                self.sms.send(phone, &sms_body(message.body, message.url)).await
            }
            Channel::Discord => {
                let discord_id = recipient
                    .discord_id()
                    .ok_or_else(|| AppError::validation("No Discord account"))?;
                self.discord.send_dm(discord_id, message.body).await
            }
            Channel::Push => {
                let tokens = user.map(|u| u.push_tokens.clone()).unwrap_or_default();
                self.push
                    .send(PushMessage {
                        tokens,
                        title: message.subject.to_string(),
                        body: push_body(message.body),
                        data: Some(message.push_data.clone()),
                    })
                    .await
            }
            Channel::InApp => Err(AppError::validation(
                "In-app delivery is not used for substitute outreach",
            )),
        }
    }

    async fn deliver(
        &self,
        recipient: &Recipient,
        channels: &[Channel],
        message: &Outbound<'_>,
    ) -> ChannelResult {
        let mut result = ChannelResult {
            player_id: recipient.player.id,
            ..Default::default()
        };
        for &channel in channels {
            match self.deliver_one(recipient, channel, message).await {
                Ok(()) => result.sent.push(channel),
                Err(e) => {
                    tracing::warn!(
                        player_id = %recipient.player.id,
                        channel = channel.as_str(),
                        error = %e,
                        "Substitute message delivery failed"
                    );
                    result.failed.push(channel);
                }
            }
        }
        result
    }

    /// Create the response record, then send the request on `channels`.
    async fn contact(
        &self,
        request: &SubstituteRequest,
        details: &MatchDetails,
        recipient: &Recipient,
        channels: Vec<Channel>,
        custom_message: &str,
    ) -> AppResult<ChannelResult> {
        let now = Utc::now();
        let token = generate_rsvp_token();
        self.uow
            .substitutes()
            .create_response(NewSubstituteResponse {
                request_id: request.id,
                player_id: recipient.player.id,
                notification_methods: channels.clone(),
                rsvp_token: token.clone(),
                token_expires_at: token_expiry(now, self.token_ttl_hours),
            })
            .await?;

        let url = rsvp_url(&self.base_url, &token);
        let body = build_sub_message(
            custom_message,
            details,
            request.positions_needed.as_deref(),
            request.notes.as_deref(),
            &url,
        );
        let subject = format!(
            "Substitute needed: {} vs {}",
            details.home_team, details.away_team
        );
        let message = Outbound {
            subject: &subject,
            body: &body,
            url: Some(&url),
            push_data: serde_json::json!({
                "type": "sub_request",
                "request_id": request.id,
                "deep_link": deep_link(&token),
                "url": url,
            }),
        };

        let result = self.deliver(recipient, &channels, &message).await;
        if result.any_sent() {
            if let Err(e) = self
                .uow
                .pool()
                .record_request_sent(recipient.player.id, request.league_id)
                .await
            {
                tracing::warn!(player_id = %recipient.player.id, error = %e, "Failed to bump pool request count");
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl<U: UnitOfWork> SubNotificationService for SubNotifier<U> {
    async fn notify_pool(
        &self,
        request_id: Uuid,
        outreach: PoolOutreach,
    ) -> AppResult<OutreachReport> {
        let request = self.open_request(request_id).await?;
        let details = self.match_details(&request).await?;

        let mut entries = self.uow.pool().list_active(request.league_id).await?;
        if let Some(only) = &outreach.player_ids {
            entries.retain(|e| only.contains(&e.player_id));
        }
        entries.retain(|e| e.matches_positions(&outreach.position_filters));

        let contacted: HashSet<Uuid> = self
            .uow
            .substitutes()
            .responses_for_request(request_id)
            .await?
            .into_iter()
            .map(|r| r.player_id)
            .collect();

        let mut report = OutreachReport::default();
        let before = entries.len();
        entries.retain(|e| !contacted.contains(&e.player_id));
        report.skipped += u32::try_from(before - entries.len()).unwrap_or(u32::MAX);


        let players = self
            .uow
            .league()
            .find_players(entries.iter().map(|e| e.player_id).collect())
            .await?;
        let recipients = self.recipients(players).await?;
        let pool: HashMap<Uuid, PoolEntry> = entries.into_iter().map(|e| (e.player_id, e)).collect();

        for recipient in recipients {
            if let Some(wanted) = outreach.gender_filter {
                if !wanted.admits(recipient.player.gender.as_deref()) {
                    report.skipped += 1;
                    continue;
                }
            }

            let mut channels = outreach_channels(
                recipient.user.as_ref(),
                recipient.discord_id(),
                pool.get(&recipient.player.id),
            );
            if let Some(allowed) = &outreach.channels {
                channels.retain(|c| allowed.contains(c));
            }
            if channels.is_empty() {
                report.skipped += 1;
                continue;
            }

            match self
                .contact(&request, &details, &recipient, channels, &outreach.custom_message)
                .await
            {
                Ok(result) if result.any_sent() => report.notified += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    tracing::error!(player_id = %recipient.player.id, error = %e, "Failed to contact substitute");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            request_id = %request_id,
            notified = report.notified,
            skipped = report.skipped,
            failed = report.failed,
            "Substitute pool notified"
        );
        Ok(report)
    }

    async fn notify_individual(
        &self,
        request_id: Uuid,
        player_id: Uuid,
        custom_message: String,
    ) -> AppResult<ChannelResult> {
        let request = self.open_request(request_id).await?;

        if self
            .uow
            .substitutes()
            .find_response(request_id, player_id)
            .await?
            .is_some()
        {
            return Err(AppError::validation(
                "Player has already been contacted for this request",
            ));
        }

        let player = self
            .uow
            .league()
            .find_player(player_id)
            .await?
            .ok_or_else(|| AppError::validation("Player not found"))?;
        let pool = self.uow.pool().find_entry(player_id, request.league_id).await?;
        let recipient = self
            .recipients(vec![player])
            .await?
            .pop()
            .ok_or(AppError::NotFound)?;

        let channels = outreach_channels(
            recipient.user.as_ref(),
            recipient.discord_id(),
            pool.as_ref(),
        );
        if channels.is_empty() {
            return Err(AppError::validation(
                "No notification channels available for this player",
            ));
        }

        let details = self.match_details(&request).await?;
        let result = self
            .contact(&request, &details, &recipient, channels, &custom_message)
            .await?;

        tracing::info!(
            request_id = %request_id,
            player_id = %player_id,
            sent = result.sent.len(),
            failed = result.failed.len(),
            "Substitute contacted"
        );
        Ok(result)
    }

    async fn send_confirmation(&self, assignment_id: Uuid) -> AppResult<Vec<Channel>> {
        let subs = self.uow.substitutes();
        let assignment = subs
            .find_assignment(assignment_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let request = subs
            .find_request(assignment.request_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let player = self
            .uow
            .league()
            .find_player(assignment.player_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let recipient = self
            .recipients(vec![player])
            .await?
            .pop()
            .ok_or(AppError::NotFound)?;

        let outreach = subs
            .find_response(request.id, assignment.player_id)
            .await?
            .map(|r| r.notification_methods)
            .unwrap_or_default();
        let channels = if outreach.is_empty() {
            let pool = self
                .uow
                .pool()
                .find_entry(assignment.player_id, request.league_id)
                .await?;
            outreach_channels(recipient.user.as_ref(), recipient.discord_id(), pool.as_ref())
        } else {
            outreach
        };

        if channels.is_empty() {
            tracing::warn!(assignment_id = %assignment_id, "No channels to confirm assignment on");
            return Ok(Vec::new());
        }

        let details = self.match_details(&request).await?;
        let body = build_confirmation(
            &recipient.player.name,
            &details,
            assignment.position_assigned.as_deref(),
        );
        let subject = format!(
            "Substitute confirmed: {} vs {}",
            details.home_team, details.away_team
        );
        let message = Outbound {
            subject: &subject,
            body: &body,
            url: None,
            push_data: serde_json::json!({
                "type": "sub_filled",
                "request_id": request.id,
                "assignment_id": assignment.id,
            }),
        };

        let result = self.deliver(&recipient, &channels, &message).await;
        if !result.any_sent() {
            return Err(AppError::external(format!(
                "Confirmation for assignment {} could not be delivered",
                assignment_id
            )));
        }

        subs.mark_assignment_notified(assignment_id, result.sent.clone(), Utc::now())
            .await?;
        Ok(result.sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_entry(email: bool, sms: bool, discord: bool) -> PoolEntry {
        PoolEntry {
            id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
            league_id: Uuid::new_v4(),
            is_active: true,
            preferred_positions: None,
            max_matches_per_week: None,
            sms_for_sub_requests: sms,
            discord_for_sub_requests: discord,
            email_for_sub_requests: email,
            requests_received: 0,
            requests_accepted: 0,
            matches_played: 0,
            joined_pool_at: Utc::now(),
            last_active_at: None,
        }
    }

    fn reachable_user() -> User {
        let mut user = User::new(Uuid::new_v4(), "Sam".to_string());
        user.email = Some("sam@example.com".to_string());
        user.phone = Some("+15550100".to_string());
        user
    }

    #[test]
    fn test_pool_preference_opts_in() {
        let mut user = reachable_user();
        user.email_notifications = false;
        user.sms_notifications = false;
        let entry = pool_entry(true, false, false);

        let channels = outreach_channels(Some(&user), None, Some(&entry));
        assert_eq!(channels, vec![Channel::Email]);
    }

    #[test]
    fn test_user_flags_without_pool_entry() {
        let user = reachable_user();
        let channels = outreach_channels(Some(&user), Some("42"), None);
        assert_eq!(channels, vec![Channel::Email, Channel::Sms, Channel::Discord]);
    }

    #[test]
    fn test_push_needs_device_tokens() {
        let mut user = User::new(Uuid::new_v4(), "Pat".to_string());
        assert!(outreach_channels(Some(&user), None, None).is_empty());
        user.push_tokens = vec!["device".to_string()];
        assert_eq!(outreach_channels(Some(&user), None, None), vec![Channel::Push]);
    }

    #[test]
    fn test_discord_only_player_without_account() {
        let entry = pool_entry(true, true, true);
        assert_eq!(
            outreach_channels(None, Some("42"), Some(&entry)),
            vec![Channel::Discord]
        );
    }
}
