//! Token and reply based answers from contacted substitutes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::substitute::{is_well_formed_token, parse_reply};
use crate::domain::{
    Match, RecordedAnswer, ResponseMethod, SubstituteRequest, SubstituteResponse,
};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

const ACCEPTED_MESSAGE: &str = "Thank you! Your response has been recorded.";
const SELECTION_NOTE: &str = " We will contact you if you are selected.";

/// What a valid token points at.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenContext {
    pub response: SubstituteResponse,
    pub request: SubstituteRequest,
    #[serde(rename = "match")]
    pub game: Match,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResponseReceipt {
    pub success: bool,
    pub message: String,
    pub response: SubstituteResponse,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct AvailabilityTotals {
    pub contacted: usize,
    pub responded: usize,
    pub available: usize,
    pub not_available: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResponseSummary {
    pub player_id: Uuid,
    pub player_name: String,
    pub is_available: Option<bool>,
    pub response_method: Option<ResponseMethod>,
    pub response_text: Option<String>,
    pub notification_sent_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailabilityReport {
    pub request_id: Uuid,
    pub totals: AvailabilityTotals,
    /// Available first, then pending, then not available.
    pub responses: Vec<ResponseSummary>,
}

/// Substitute response service trait for dependency injection.
#[async_trait]
pub trait SubResponseService: Send + Sync {
    async fn validate_token(&self, token: &str) -> AppResult<TokenContext>;

    /// Record an answer submitted through the RSVP page.
    async fn process_response(
        &self,
        token: &str,
        user_id: Uuid,
        is_available: bool,
        text: Option<String>,
    ) -> AppResult<ResponseReceipt>;

    /// Record a free-text SMS or Discord reply.
    async fn process_reply(
        &self,
        player_id: Uuid,
        text: &str,
        method: ResponseMethod,
    ) -> AppResult<SubstituteResponse>;

    async fn availability_status(&self, request_id: Uuid) -> AppResult<AvailabilityReport>;
}

/// Concrete implementation of SubResponseService.
pub struct SubResponseManager<U: UnitOfWork> {
    uow: Arc<U>,
}

fn sort_rank(is_available: Option<bool>) -> u8 {
    match is_available {
        Some(true) => 0,
        None => 1,
        Some(false) => 2,
    }
}

pub fn tally(responses: &[SubstituteResponse]) -> AvailabilityTotals {
    let mut totals = AvailabilityTotals {
        contacted: responses.len(),
        ..Default::default()
    };
    for response in responses {
        match response.is_available {
            Some(true) => totals.available += 1,
            Some(false) => totals.not_available += 1,
            None => totals.pending += 1,
        }
    }
    totals.responded = totals.available + totals.not_available;
    totals
}

impl<U: UnitOfWork> SubResponseManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    async fn record(
        &self,
        response: &SubstituteResponse,
        answer: RecordedAnswer,
    ) -> AppResult<SubstituteResponse> {
        let accepted = answer.is_available;
        let method = answer.method;
        let updated = self.uow.substitutes().record_answer(response.id, answer).await?;

        if accepted {
            let request = self
                .uow
                .substitutes()
                .find_request(response.request_id)
                .await?
                .ok_or(AppError::NotFound)?;
            self.uow
                .pool()
                .record_acceptance(response.player_id, request.league_id, Utc::now())
                .await?;
        }

        tracing::info!(
            request_id = %response.request_id,
            player_id = %response.player_id,
            available = accepted,
            method = method.as_str(),
            "Substitute response recorded"
        );
        Ok(updated)
    }
}

#[async_trait]
impl<U: UnitOfWork> SubResponseService for SubResponseManager<U> {
    async fn validate_token(&self, token: &str) -> AppResult<TokenContext> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::validation("No token provided"));
        }
        if !is_well_formed_token(token) {
            return Err(AppError::validation("Invalid or expired token"));
        }

        let response = self
            .uow
            .substitutes()
            .find_response_by_token(token)
            .await?
            .ok_or_else(|| AppError::validation("Invalid or expired token"))?;

        if response.token_used_at.is_some() {
            return Err(AppError::validation(
                "This request has already been responded to",
            ));
        }
        if response.is_token_expired(Utc::now()) {
            return Err(AppError::validation("This token has expired"));
        }

        let request = self
            .uow
            .substitutes()
            .find_request(response.request_id)
            .await?
            .ok_or_else(|| AppError::validation("Invalid or expired token"))?;
        let game = self
            .uow
            .league()
            .find_match(request.match_id)
            .await?
            .ok_or_else(|| AppError::validation("Match not found"))?;

        Ok(TokenContext {
            response,
            request,
            game,
        })
    }

    async fn process_response(
        &self,
        token: &str,
        user_id: Uuid,
        is_available: bool,
        text: Option<String>,
    ) -> AppResult<ResponseReceipt> {
        let context = self.validate_token(token).await?;

        let player = self
            .uow
            .league()
            .find_player_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::validation("User account not linked to a player profile"))?;

        if player.id != context.response.player_id {
            tracing::warn!(user_id = %user_id, request_id = %context.request.id, "Token used by another player");
            return Err(AppError::validation(
                "You are not authorized to respond to this request",
            ));
        }

        if context.response.has_responded() {
            return Err(AppError::validation(
                "You have already responded to this request",
            ));
        }

        let response = self
            .record(
                &context.response,
                RecordedAnswer {
                    is_available,
                    method: ResponseMethod::Web,
                    text: text.filter(|t| !t.trim().is_empty()),
                    mark_token_used: true,
                },
            )
            .await?;

        let mut message = ACCEPTED_MESSAGE.to_string();
        if is_available {
            message.push_str(SELECTION_NOTE);
        }

        Ok(ResponseReceipt {
            success: true,
            message,
            response,
        })
    }

    async fn process_reply(
        &self,
        player_id: Uuid,
        text: &str,
        method: ResponseMethod,
    ) -> AppResult<SubstituteResponse> {
        let response = self
            .uow
            .substitutes()
            .latest_open_response(player_id)
            .await?
            .ok_or_else(|| AppError::validation("No active substitute request found"))?;

        self.record(
            &response,
            RecordedAnswer {
                is_available: parse_reply(text),
                method,
                text: Some(text.trim().to_string()),
                mark_token_used: false,
            },
        )
        .await
    }

    async fn availability_status(&self, request_id: Uuid) -> AppResult<AvailabilityReport> {
        self.uow
            .substitutes()
            .find_request(request_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let responses = self.uow.substitutes().responses_for_request(request_id).await?;
        let totals = tally(&responses);

        let ids = responses.iter().map(|r| r.player_id).collect();
        let names: HashMap<Uuid, String> = self
            .uow
            .league()
            .find_players(ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let mut summaries: Vec<ResponseSummary> = responses
            .into_iter()
            .map(|r| ResponseSummary {
                player_name: names.get(&r.player_id).cloned().unwrap_or_default(),
                player_id: r.player_id,
                is_available: r.is_available,
                response_method: r.response_method,
                response_text: r.response_text,
                notification_sent_at: r.notification_sent_at,
                responded_at: r.responded_at,
            })
            .collect();
        summaries.sort_by_key(|s| sort_rank(s.is_available));

        Ok(AvailabilityReport {
            request_id,
            totals,
            responses: summaries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::substitute::{generate_rsvp_token, token_expiry};

    fn response(is_available: Option<bool>) -> SubstituteResponse {
        let now = Utc::now();
        SubstituteResponse {
            id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
            is_available,
            response_method: None,
            response_text: None,
            notification_sent_at: Some(now),
            notification_methods: vec![],
            responded_at: is_available.map(|_| now),
            rsvp_token: generate_rsvp_token(),
            token_expires_at: token_expiry(now, 48),
            token_used_at: None,
            created_at: now,
        }
    }

    #[test]
    fn test_tally() {
        let responses = vec![
            response(Some(true)),
            response(None),
            response(Some(false)),
            response(None),
        ];
        let totals = tally(&responses);
        assert_eq!(totals.contacted, 4);
        assert_eq!(totals.responded, 2);
        assert_eq!(totals.available, 1);
        assert_eq!(totals.not_available, 1);
        assert_eq!(totals.pending, 2);
    }

    #[test]
    fn test_sort_order() {
        let mut ranks = vec![sort_rank(Some(false)), sort_rank(None), sort_rank(Some(true))];
        ranks.sort();
        assert_eq!(ranks, vec![sort_rank(Some(true)), sort_rank(None), sort_rank(Some(false))]);
    }
}
