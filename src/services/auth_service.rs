//! Authentication service - Issues and verifies JWT access tokens.
//!
//! Accounts are managed elsewhere; this service only proves who is calling.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{Config, JWT_ISSUER, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::domain::{User, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

/// JWT claims payload
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

/// Token response returned when a token is issued
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Always "Bearer"
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Lifetime in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Issue an access token for an existing user
    async fn issue_token(&self, user_id: Uuid) -> AppResult<TokenResponse>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;
}

/// Signing material derived once from the configured secret.
struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime_hours: i64,
}

impl TokenKeys {
    fn from_config(config: &Config) -> Self {
        let mut validation = Validation::default();
        validation.set_issuer(&[JWT_ISSUER]);

        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret_bytes()),
            validation,
            lifetime_hours: config.jwt_expiration_hours,
        }
    }

    fn sign(&self, user: &User) -> AppResult<TokenResponse> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            role: user.role.clone(),
            iss: JWT_ISSUER.to_string(),
            exp: (now + Duration::hours(self.lifetime_hours)).timestamp(),
            iat: now.timestamp(),
        };

        Ok(TokenResponse {
            access_token: encode(&Header::default(), &claims, &self.encoding)?,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.lifetime_hours * SECONDS_PER_HOUR,
        })
    }

    fn verify(&self, token: &str) -> AppResult<Claims> {
        Ok(decode::<Claims>(token, &self.decoding, &self.validation)?.claims)
    }
}

/// Concrete implementation of AuthService using Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    keys: TokenKeys,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(uow: Arc<U>, config: Config) -> Self {
        Self {
            uow,
            keys: TokenKeys::from_config(&config),
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> AuthService for Authenticator<U> {
    async fn issue_token(&self, user_id: Uuid) -> AppResult<TokenResponse> {
        let user = self
            .uow
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!(user_id = %user.id, role = %user.role, "Access token issued");
        self.keys.sign(&user)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        self.keys.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_keeps_role() {
        let config = Config::for_testing();
        let keys = TokenKeys::from_config(&config);
        let mut user = User::new(Uuid::new_v4(), "Admin".to_string());
        user.role = UserRole::Admin;

        let token = keys.sign(&user).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, config.jwt_expiration_hours * SECONDS_PER_HOUR);

        let claims = keys.verify(&token.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.iss, JWT_ISSUER);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let keys = TokenKeys::from_config(&Config::for_testing());
        let user = User::new(Uuid::new_v4(), "Kai".to_string());
        let token = keys.sign(&user).unwrap();

        let err = keys.verify(&format!("{}x", token.access_token)).unwrap_err();
        assert!(matches!(err, AppError::Jwt(_)));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let config = Config::for_testing();
        let keys = TokenKeys::from_config(&config);
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: UserRole::Admin,
            iss: "someone-else".to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iat: Utc::now().timestamp(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();

        assert!(keys.verify(&token).is_err());
    }
}
