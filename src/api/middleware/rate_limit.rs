//! Fixed-window rate limiting keyed by client IP.
//!
//! Counting goes through the [`RateLimiter`](crate::infra::RateLimiter) port.
//! When the counter store is down, requests are denied.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;

use crate::api::AppState;
use crate::config::{
    RATE_LIMIT_PUBLIC_REQUESTS, RATE_LIMIT_PUBLIC_WINDOW_SECONDS, RATE_LIMIT_REQUESTS,
    RATE_LIMIT_WINDOW_SECONDS,
};

/// A named request budget.
#[derive(Debug, Clone, Copy)]
struct Limit {
    scope: &'static str,
    max_requests: u64,
    window_seconds: u64,
}

/// Authenticated API traffic.
const GENERAL: Limit = Limit {
    scope: "general",
    max_requests: RATE_LIMIT_REQUESTS,
    window_seconds: RATE_LIMIT_WINDOW_SECONDS,
};

/// Token links opened without a login.
const PUBLIC: Limit = Limit {
    scope: "public",
    max_requests: RATE_LIMIT_PUBLIC_REQUESTS,
    window_seconds: RATE_LIMIT_PUBLIC_WINDOW_SECONDS,
};

/// 429 with a Retry-After hint.
#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", HeaderValue::from(self.retry_after));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));

        let body = json!({
            "error": {
                "code": "RATE_LIMITED",
                "message": "Too many requests. Please try again later.",
            }
        });

        (StatusCode::TOO_MANY_REQUESTS, headers, Json(body)).into_response()
    }
}

/// Client address, preferring proxy headers over the socket peer.
pub(crate) fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    // First hop of X-Forwarded-For is the original client
    if let Some(ip) = header("X-Forwarded-For").and_then(|v| v.split(',').next()) {
        return ip.trim().to_string();
    }
    if let Some(ip) = header("X-Real-IP") {
        return ip.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce(
    state: &AppState,
    limit: Limit,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let client = client_ip(request.headers(), peer);
    let key = format!("{}:{}", limit.scope, client);
    let denied = RateLimitError {
        retry_after: limit.window_seconds,
    };

    let count = match state
        .rate_limiter
        .hit(&key, limit.max_requests, limit.window_seconds)
        .await
    {
        Ok((count, true)) => count,
        Ok((count, false)) => {
            tracing::warn!(scope = limit.scope, client = %client, count, "Rate limit exceeded");
            return Err(denied);
        }
        Err(e) => {
            tracing::error!(scope = limit.scope, error = %e, "Rate limit check failed, denying request");
            return Err(denied);
        }
    };

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit.max_requests));
    headers.insert(
        "X-RateLimit-Remaining",
        HeaderValue::from(limit.max_requests.saturating_sub(count)),
    );

    Ok(response)
}

/// Budget for authenticated routes.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(&state, GENERAL, request, next).await
}

/// Tighter budget for the `/sub-rsvp` token links.
pub async fn rate_limit_public_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(&state, PUBLIC, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn test_rate_limit_error_response() {
        let response = RateLimitError { retry_after: 60 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["Retry-After"], "60");
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let h = headers(&[
            ("X-Forwarded-For", "203.0.113.7, 10.0.0.1"),
            ("X-Real-IP", "10.0.0.9"),
        ]);
        assert_eq!(client_ip(&h, None), "203.0.113.7");
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let peer: SocketAddr = "198.51.100.4:50123".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "198.51.100.4");
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn test_public_budget_is_tighter() {
        assert!(PUBLIC.max_requests <= GENERAL.max_requests);
        assert_ne!(PUBLIC.scope, GENERAL.scope);
    }
}
