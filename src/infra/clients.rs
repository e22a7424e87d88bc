//! Outbound HTTP gateways: the Discord bot API plus push, SMS and email providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{Config, DISCORD_DM_TIMEOUT_SECONDS, HTTP_TIMEOUT_SECONDS};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Operations the Discord bot exposes over HTTP.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DiscordGateway: Send + Sync {
    async fn send_dm(&self, discord_id: &str, message: &str) -> AppResult<()>;

    async fn assign_role(&self, discord_id: &str, discord_role_id: &str) -> AppResult<()>;

    async fn remove_role(&self, discord_id: &str, discord_role_id: &str) -> AppResult<()>;

    /// Role names the member currently holds in `guild_id`.
    async fn member_roles(&self, guild_id: &str, discord_id: &str) -> AppResult<Vec<String>>;
}

/// Mobile push delivery.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, message: PushMessage) -> AppResult<()>;
}

/// SMS delivery.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, phone: &str, body: &str) -> AppResult<()>;
}

/// Email delivery, used by the email job worker.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, message: EmailMessage) -> AppResult<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct DirectMessageRequest<'a> {
    discord_id: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct RoleChangeRequest<'a> {
    user_id: &'a str,
    role_id: &'a str,
}

#[derive(Deserialize)]
struct MemberRolesResponse {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Serialize)]
struct SmsRequest<'a> {
    to: &'a str,
    body: &'a str,
}

/// Turn a non-success status into an `External` error carrying the body.
async fn ensure_success(response: reqwest::Response, what: &str) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AppError::external(format!(
        "{} failed with status {}: {}",
        what,
        status.as_u16(),
        message
    )))
}

fn build_client(timeout_seconds: u64) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| AppError::internal(format!("HTTP client error: {}", e)))
}

/// HTTP client for the Discord bot API.
#[derive(Debug, Clone)]
pub struct DiscordBotClient {
    client: reqwest::Client,
    base_url: String,
}

impl DiscordBotClient {
    pub fn new(base_url: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            client: build_client(HTTP_TIMEOUT_SECONDS)?,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(config.bot_api_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn change_role(&self, path: &str, discord_id: &str, role_id: &str) -> AppResult<()> {
        let response = self
            .client
            .post(self.url(path))
            .json(&RoleChangeRequest {
                user_id: discord_id,
                role_id,
            })
            .send()
            .await?;
        ensure_success(response, "Discord role change").await?;
        Ok(())
    }
}

#[async_trait]
impl DiscordGateway for DiscordBotClient {
    async fn send_dm(&self, discord_id: &str, message: &str) -> AppResult<()> {
        let response = self
            .client
            .post(self.url("/send_discord_dm"))
            .timeout(Duration::from_secs(DISCORD_DM_TIMEOUT_SECONDS))
            .json(&DirectMessageRequest {
                discord_id,
                message,
            })
            .send()
            .await?;
        ensure_success(response, "Discord DM").await?;
        tracing::debug!(discord_id, "Discord DM delivered");
        Ok(())
    }

    async fn assign_role(&self, discord_id: &str, discord_role_id: &str) -> AppResult<()> {
        self.change_role("/api/discord/roles/assign", discord_id, discord_role_id)
            .await
    }

    async fn remove_role(&self, discord_id: &str, discord_role_id: &str) -> AppResult<()> {
        self.change_role("/api/discord/roles/remove", discord_id, discord_role_id)
            .await
    }

    async fn member_roles(&self, guild_id: &str, discord_id: &str) -> AppResult<Vec<String>> {
        let path = format!("/guilds/{}/members/{}/roles", guild_id, discord_id);
        let response = self.client.get(self.url(&path)).send().await?;
        let body: MemberRolesResponse = ensure_success(response, "Discord member roles")
            .await?
            .json()
            .await?;
        Ok(body.roles)
    }
}

/// Push provider reached over HTTP. Delivery fails when no URL is configured.
#[derive(Debug, Clone)]
pub struct HttpPushGateway {
    client: reqwest::Client,
    url: Option<String>,
}

impl HttpPushGateway {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self {
            client: build_client(HTTP_TIMEOUT_SECONDS)?,
            url: config.push_gateway_url.clone(),
        })
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn send(&self, message: PushMessage) -> AppResult<()> {
        let Some(url) = &self.url else {
            return Err(AppError::external("Push gateway not configured"));
        };
        let response = self.client.post(url).json(&message).send().await?;
        ensure_success(response, "Push delivery").await?;
        Ok(())
    }
}

/// SMS provider reached over HTTP. Delivery fails when no URL is configured.
#[derive(Debug, Clone)]
pub struct HttpSmsGateway {
    client: reqwest::Client,
    url: Option<String>,
}

impl HttpSmsGateway {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self {
            client: build_client(HTTP_TIMEOUT_SECONDS)?,
            url: config.sms_gateway_url.clone(),
        })
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    async fn send(&self, phone: &str, body: &str) -> AppResult<()> {
        let Some(url) = &self.url else {
            return Err(AppError::external("SMS gateway not configured"));
        };
        let response = self
            .client
            .post(url)
            .json(&SmsRequest { to: phone, body })
            .send()
            .await?;
        ensure_success(response, "SMS delivery").await?;
        Ok(())
    }
}

/// Email API reached over HTTP.
///
/// Without a configured URL messages are logged instead of sent.
#[derive(Debug, Clone)]
pub struct HttpEmailGateway {
    client: reqwest::Client,
    url: Option<String>,
}

impl HttpEmailGateway {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self {
            client: build_client(HTTP_TIMEOUT_SECONDS)?,
            url: config.email_gateway_url.clone(),
        })
    }
}

#[async_trait]
impl EmailGateway for HttpEmailGateway {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        let Some(url) = &self.url else {
            tracing::warn!("Email gateway not configured - logging email instead of sending");
            tracing::info!(
                "=== EMAIL (not sent) ===\n\
                 From: {}\n\
                 To: {}\n\
                 Subject: {}\n\
                 Body:\n{}\n\
                 ========================",
                message.from,
                message.to,
                message.subject,
                message.body
            );
            return Ok(());
        };
        let response = self.client.post(url).json(&message).send().await?;
        ensure_success(response, "Email delivery").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_gateways_fail() {
        let config = Config::for_testing();

        let sms = HttpSmsGateway::from_config(&config).unwrap();
        let err = sms.send("+15550100", "hi").await.unwrap_err();
        assert!(matches!(err, AppError::External(_)));

        let push = HttpPushGateway::from_config(&config).unwrap();
        let err = push
            .send(PushMessage {
                tokens: vec!["t".to_string()],
                title: "x".to_string(),
                body: "y".to_string(),
                data: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::External(_)));
    }

    #[test]
    fn test_bot_urls() {
        let client = DiscordBotClient::new("http://bot:5001").unwrap();
        assert_eq!(client.url("/send_discord_dm"), "http://bot:5001/send_discord_dm");
    }
}
