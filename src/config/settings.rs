//! Application settings loaded from environment variables.

use std::env;

use super::constants::{
    DEFAULT_BASE_URL, DEFAULT_BOT_API_URL, DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_DATABASE_URL,
    DEFAULT_EMAIL_FROM, DEFAULT_JWT_EXPIRATION_HOURS, DEFAULT_REDIS_URL, DEFAULT_RSVP_TOKEN_TTL_HOURS, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    MIN_JWT_SECRET_LENGTH,
};

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    /// Public web URL, used for RSVP links
    pub base_url: String,
    /// Discord bot HTTP API
    pub bot_api_url: String,
    /// Guild used to read a member's current Discord roles
    pub discord_guild_id: Option<String>,
    /// Push gateway endpoint; push delivery fails when unset
    pub push_gateway_url: Option<String>,
    /// SMS gateway endpoint; SMS delivery fails when unset
    pub sms_gateway_url: Option<String>,
    /// Email API endpoint; emails are logged instead when unset
    pub email_gateway_url: Option<String>,
    /// Sender address for outgoing email
    pub email_from: String,
    pub rsvp_token_ttl_hours: i64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("database_max_connections", &self.database_max_connections)
            .field("redis_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("base_url", &self.base_url)
            .field("bot_api_url", &self.bot_api_url)
            .field("discord_guild_id", &self.discord_guild_id)
            .field("push_gateway_url", &self.push_gateway_url.as_ref().map(|_| "[REDACTED]"))
            .field("sms_gateway_url", &self.sms_gateway_url.as_ref().map(|_| "[REDACTED]"))
            .field("email_gateway_url", &self.email_gateway_url.as_ref().map(|_| "[REDACTED]"))
            .field("email_from", &self.email_from)
            .field("rsvp_token_ttl_hours", &self.rsvp_token_ttl_hours)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if JWT_SECRET is not set in release builds or is too short.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            } else {
                panic!("JWT_SECRET environment variable must be set in production");
            }
        });

        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            panic!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS")
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            jwt_secret,
            jwt_expiration_hours: parse_var("JWT_EXPIRATION_HOURS")
                .unwrap_or(DEFAULT_JWT_EXPIRATION_HOURS),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: parse_var("SERVER_PORT").unwrap_or(DEFAULT_SERVER_PORT),
            base_url: env::var("BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            bot_api_url: env::var("BOT_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_BOT_API_URL.to_string()),
            discord_guild_id: env::var("DISCORD_GUILD_ID").ok().filter(|v| !v.is_empty()),
            push_gateway_url: env::var("PUSH_GATEWAY_URL").ok().filter(|v| !v.is_empty()),
            sms_gateway_url: env::var("SMS_GATEWAY_URL").ok().filter(|v| !v.is_empty()),
            email_gateway_url: env::var("EMAIL_GATEWAY_URL").ok().filter(|v| !v.is_empty()),
            email_from: env::var("EMAIL_FROM").unwrap_or_else(|_| DEFAULT_EMAIL_FROM.to_string()),
            rsvp_token_ttl_hours: parse_var("RSVP_TOKEN_TTL_HOURS")
                .unwrap_or(DEFAULT_RSVP_TOKEN_TTL_HOURS),
        }
    }

    /// Configuration for tests and tooling that never touch the environment.
    pub fn for_testing() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            jwt_secret: "test-secret-key-for-testing-only-32chars".to_string(),
            jwt_expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            base_url: "https://league.example.com".to_string(),
            bot_api_url: DEFAULT_BOT_API_URL.to_string(),
            discord_guild_id: None,
            push_gateway_url: None,
            sms_gateway_url: None,
            email_gateway_url: None,
            email_from: DEFAULT_EMAIL_FROM.to_string(),
            rsvp_token_ttl_hours: DEFAULT_RSVP_TOKEN_TTL_HOURS,
        }
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::for_testing();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("test-secret-key"));
        assert!(!rendered.contains("postgres://"));
    }
}
