//! Bearer-token authentication and role guards.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::BEARER_TOKEN_PREFIX;
use crate::domain::UserRole;
use crate::errors::AppError;
use crate::services::Claims;

/// Caller identity placed in request extensions by [`auth_middleware`].
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: UserRole,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

/// Token from `Authorization: Bearer <token>`; the scheme is case-insensitive.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let scheme = value.get(..BEARER_TOKEN_PREFIX.len())?;
    let token = value.get(BEARER_TOKEN_PREFIX.len()..)?.trim();
    (scheme.eq_ignore_ascii_case(BEARER_TOKEN_PREFIX) && !token.is_empty()).then_some(token)
}

/// Reject requests without a valid JWT, otherwise attach [`CurrentUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AppError::Unauthorized)?;
    let user = CurrentUser::from(state.services.auth().verify_token(token)?);

    tracing::debug!(user_id = %user.id, role = %user.role, "Request authenticated");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

fn require(user: &CurrentUser, allowed: bool) -> Result<(), AppError> {
    if allowed {
        Ok(())
    } else {
        tracing::debug!(user_id = %user.id, role = %user.role, "Role check failed");
        Err(AppError::Forbidden)
    }
}

/// Draft picks, role sync and league-wide metrics.
pub fn require_admin(user: &CurrentUser) -> Result<(), AppError> {
    require(user, user.role.is_admin())
}

/// Coaches and admins manage substitute requests and the pool.
pub fn require_substitute_manager(user: &CurrentUser) -> Result<(), AppError> {
    require(user, user.role.can_manage_substitutes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            role,
        }
    }

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_role_guards() {
        assert!(require_admin(&user(UserRole::Admin)).is_ok());
        assert!(require_admin(&user(UserRole::Coach)).is_err());
        assert!(require_substitute_manager(&user(UserRole::Coach)).is_ok());
        assert!(matches!(
            require_substitute_manager(&user(UserRole::User)),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
