//! Multi-channel notification delivery with preference enforcement.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::container::parallel;
use crate::config::NOTIFICATION_CONCURRENCY;
use crate::domain::messages::sms_body;
use crate::domain::{
    evaluate_channels, Channel, DeliveryReport, Notification, NotificationPayload, User,
};
use crate::errors::{AppError, AppResult};
use crate::infra::{DiscordGateway, PushGateway, PushMessage, SmsGateway, UnitOfWork};
use crate::jobs::{EmailJob, JobQueue};

/// Notification service trait for dependency injection.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Deliver `payload` to every addressed user on the channels they allow.
    async fn send(&self, payload: NotificationPayload) -> AppResult<DeliveryReport>;

    /// Newest in-app notifications for a user.
    async fn list(&self, user_id: Uuid, limit: u64) -> AppResult<Vec<Notification>>;
}

/// Per-user delivery outcome before aggregation.
#[derive(Debug, Default)]
struct UserDelivery {
    delivered: Vec<Channel>,
    failed: Vec<Channel>,
    skipped: Vec<Channel>,
}

/// Concrete implementation of NotificationService.
pub struct NotificationDispatcher<U: UnitOfWork> {
    uow: Arc<U>,
    push: Arc<dyn PushGateway>,
    sms: Arc<dyn SmsGateway>,
    discord: Arc<dyn DiscordGateway>,
    jobs: Arc<dyn JobQueue>,
}

impl<U: UnitOfWork> NotificationDispatcher<U> {
    pub fn new(
        uow: Arc<U>,
        push: Arc<dyn PushGateway>,
        sms: Arc<dyn SmsGateway>,
        discord: Arc<dyn DiscordGateway>,
        jobs: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            uow,
            push,
            sms,
            discord,
            jobs,
        }
    }

    async fn deliver(
        &self,
        user: &User,
        payload: &NotificationPayload,
        channel: Channel,
    ) -> AppResult<()> {
        match channel {
            Channel::InApp => {
                let notification = Notification {
                    id: Uuid::new_v4(),
                    user_id: user.id,
                    notification_type: payload.notification_type,
                    title: payload.title.clone(),
                    message: payload.message.clone(),
                    action_url: payload.action_url.clone(),
                    data: payload.data.clone(),
                    priority: payload.priority,
                    read: false,
                    created_at: Utc::now(),
                };
                self.uow.notifications().create(notification).await?;
            }
            Channel::Push => {
                let mut data = serde_json::json!({
                    "type": payload.notification_type.as_str(),
                    "priority": payload.priority.as_str(),
                });
                if let Some(url) = &payload.action_url {
                    data["action_url"] = serde_json::Value::String(url.clone());
                }
                if let Some(extra) = &payload.data {
                    data["data"] = extra.clone();
                }
                self.push
                    .send(PushMessage {
                        tokens: user.push_tokens.clone(),
                        title: payload.title.clone(),
                        body: payload.message.clone(),
                        data: Some(data),
                    })
                    .await?;
            }
            Channel::Email => {
                let to = user
                    .email
                    .clone()
                    .ok_or_else(|| AppError::validation("User has no email address"))?;
                let mut body = payload.message.clone();
                if let Some(url) = &payload.action_url {
                    body.push_str(&format!("\n\n{}", url));
                }
                self.jobs
                    .enqueue_email(EmailJob::new(to, payload.title.clone(), body))
                    .await?;
            }
            Channel::Sms => {
                let phone = user
                    .phone
                    .as_deref()
                    .ok_or_else(|| AppError::validation("User has no phone number"))?;
                let text = format!("{}\n{}", payload.title, payload.message);
                self.sms
                    .send(phone, &sms_body(&text, payload.action_url.as_deref()))
                    .await?;
            }
            Channel::Discord => {
                let discord_id = user
                    .discord_id
                    .as_deref()
                    .ok_or_else(|| AppError::validation("User has no Discord account"))?;
                let text = format!("**{}**\n{}", payload.title, payload.message);
                self.discord.send_dm(discord_id, &text).await?;
            }
        }
        Ok(())
    }

    async fn notify_user(&self, user: &User, payload: &NotificationPayload) -> UserDelivery {
        let plan = evaluate_channels(user, payload);
        let mut outcome = UserDelivery {
            skipped: plan.skip,
            ..Default::default()
        };

        for channel in plan.send {
            match self.deliver(user, payload, channel).await {
                Ok(()) => outcome.delivered.push(channel),
                Err(e) => {
                    tracing::warn!(
                        user_id = %user.id,
                        channel = channel.as_str(),
                        error = %e,
                        "Notification delivery failed"
                    );
                    outcome.failed.push(channel);
                }
            }
        }
        outcome
    }
}

fn aggregate(outcomes: Vec<UserDelivery>) -> DeliveryReport {
    let mut report = DeliveryReport {
        total_users: u32::try_from(outcomes.len()).unwrap_or(u32::MAX),
        ..Default::default()
    };
    for outcome in outcomes {
        for channel in outcome.delivered {
            report.tally_mut(channel).success += 1;
        }
        for channel in outcome.failed {
            report.tally_mut(channel).failed += 1;
        }
        for channel in outcome.skipped {
            report.tally_mut(channel).skipped += 1;
        }
    }
    report
}

#[async_trait]
impl<U: UnitOfWork> NotificationService for NotificationDispatcher<U> {
    async fn send(&self, payload: NotificationPayload) -> AppResult<DeliveryReport> {
        if payload.user_ids.is_empty() {
            return Err(AppError::validation("No recipients specified"));
        }

        let users = self.uow.users().find_many(payload.user_ids.clone()).await?;
        if users.len() < payload.user_ids.len() {
            tracing::warn!(
                requested = payload.user_ids.len(),
                found = users.len(),
                "Some notification recipients do not exist"
            );
        }

        let payload = &payload;
        let deliveries: Vec<_> = users
            .into_iter()
            .map(|user| async move { Ok(self.notify_user(&user, payload).await) })
            .collect();
        let outcomes = parallel::join_all_limited(deliveries, NOTIFICATION_CONCURRENCY).await?;

        let report = aggregate(outcomes);
        tracing::info!(
            kind = payload.notification_type.as_str(),
            total_users = report.total_users,
            in_app = report.in_app.success,
            push = report.push.success,
            email = report.email.success,
            sms = report.sms.success,
            discord = report.discord.success,
            "Notification sent"
        );
        Ok(report)
    }

    async fn list(&self, user_id: Uuid, limit: u64) -> AppResult<Vec<Notification>> {
        self.uow.notifications().list_for_user(user_id, limit).await
    }
}
