//! Substitute response service unit tests.

mod common;

use chrono::{Duration, Utc};
use mockall::predicate::eq;
use uuid::Uuid;

use league_coordinator::domain::{RequestStatus, ResponseMethod, SubstituteResponse};
use league_coordinator::errors::AppError;
use league_coordinator::services::{SubResponseManager, SubResponseService};

use common::{outreach, player, sub_request, upcoming_match, BuiltUnitOfWork, TestUnitOfWork};

const TOKEN: &str = "tok_0123456789abcdefABCDEF";

fn manager(uow: TestUnitOfWork) -> SubResponseManager<BuiltUnitOfWork> {
    SubResponseManager::new(uow.build())
}

fn validation_message<T: std::fmt::Debug>(result: Result<T, AppError>) -> String {
    match result {
        Err(AppError::Validation(msg)) => msg,
        other => panic!("expected validation error, got {:?}", other),
    }
}

/// Token lookup returning `record`, plus the request and match behind it.
fn token_for(record: SubstituteResponse) -> TestUnitOfWork {
    let mut uow = TestUnitOfWork::default();
    uow.substitutes
        .expect_find_response_by_token()
        .withf(|token| token == TOKEN)
        .returning(move |_| Ok(Some(record.clone())));
    uow.substitutes
        .expect_find_request()
        .returning(|id| Ok(Some(sub_request(id, RequestStatus::Open))));
    uow.league
        .expect_find_match()
        .returning(|id| Ok(Some(upcoming_match(id, Uuid::new_v4(), Uuid::new_v4()))));
    uow
}

fn answered(record: &SubstituteResponse, available: bool, method: ResponseMethod) -> SubstituteResponse {
    SubstituteResponse {
        is_available: Some(available),
        response_method: Some(method),
        responded_at: Some(Utc::now()),
        ..record.clone()
    }
}

#[tokio::test]
async fn test_token_shape_is_checked_before_lookup() {
    let mut uow = TestUnitOfWork::default();
    uow.substitutes.expect_find_response_by_token().times(0);
    let service = manager(uow);

    assert_eq!(
        validation_message(service.validate_token("   ").await),
        "No token provided"
    );
    assert_eq!(
        validation_message(service.validate_token("not a token!").await),
        "Invalid or expired token"
    );
}

#[tokio::test]
async fn test_unknown_token_is_invalid() {
    let mut uow = TestUnitOfWork::default();
    uow.substitutes
        .expect_find_response_by_token()
        .returning(|_| Ok(None));

    assert_eq!(
        validation_message(manager(uow).validate_token(TOKEN).await),
        "Invalid or expired token"
    );
}

#[tokio::test]
async fn test_used_and_expired_tokens() {
    let mut used = outreach(Uuid::new_v4(), Uuid::new_v4());
    used.token_used_at = Some(Utc::now());
    assert_eq!(
        validation_message(manager(token_for(used)).validate_token(TOKEN).await),
        "This request has already been responded to"
    );

    let mut expired = outreach(Uuid::new_v4(), Uuid::new_v4());
    expired.token_expires_at = Utc::now() - Duration::minutes(1);
    assert_eq!(
        validation_message(manager(token_for(expired)).validate_token(TOKEN).await),
        "This token has expired"
    );
}

#[tokio::test]
async fn test_valid_token_returns_context() {
    let record = outreach(Uuid::new_v4(), Uuid::new_v4());
    let request_id = record.request_id;

    let context = manager(token_for(record)).validate_token(TOKEN).await.unwrap();

    assert_eq!(context.request.id, request_id);
    assert_eq!(context.game.id, context.request.match_id);
}

#[tokio::test]
async fn test_answer_by_reply_then_link_is_already_responded() {
    let player_id = Uuid::new_v4();
    let mut record = outreach(Uuid::new_v4(), player_id);
    record.responded_at = Some(Utc::now());
    record.is_available = Some(true);
    record.response_method = Some(ResponseMethod::Sms);

    let mut uow = token_for(record);
    uow.league
        .expect_find_player_by_user()
        .returning(move |_| Ok(Some(player(player_id, Uuid::new_v4()))));
    uow.substitutes.expect_record_answer().times(0);

    let result = manager(uow)
        .process_response(TOKEN, Uuid::new_v4(), false, None)
        .await;

    assert_eq!(
        validation_message(result),
        "You have already responded to this request"
    );
}

#[tokio::test]
async fn test_token_of_another_player_is_refused() {
    let record = outreach(Uuid::new_v4(), Uuid::new_v4());

    let mut uow = token_for(record);
    uow.league
        .expect_find_player_by_user()
        .returning(|_| Ok(Some(player(Uuid::new_v4(), Uuid::new_v4()))));
    uow.substitutes.expect_record_answer().times(0);

    let result = manager(uow)
        .process_response(TOKEN, Uuid::new_v4(), true, None)
        .await;

    assert_eq!(
        validation_message(result),
        "You are not authorized to respond to this request"
    );
}

#[tokio::test]
async fn test_accepting_by_link_counts_acceptance() {
    let player_id = Uuid::new_v4();
    let record = outreach(Uuid::new_v4(), player_id);
    let response_id = record.id;
    let stored = answered(&record, true, ResponseMethod::Web);

    let mut uow = token_for(record);
    uow.league
        .expect_find_player_by_user()
        .returning(move |_| Ok(Some(player(player_id, Uuid::new_v4()))));
    uow.substitutes
        .expect_record_answer()
        .withf(move |id, answer| {
            *id == response_id
                && answer.is_available
                && answer.method == ResponseMethod::Web
                && answer.mark_token_used
                && answer.text.is_none()
        })
        .times(1)
        .returning(move |_, _| Ok(stored.clone()));
    uow.pool
        .expect_record_acceptance()
        .withf(move |player, _, _| *player == player_id)
        .times(1)
        .returning(|_, _, _| Ok(()));

    let receipt = manager(uow)
        .process_response(TOKEN, Uuid::new_v4(), true, Some("  ".to_string()))
        .await
        .unwrap();

    assert!(receipt.success);
    assert_eq!(
        receipt.message,
        "Thank you! Your response has been recorded. We will contact you if you are selected."
    );
    assert_eq!(receipt.response.is_available, Some(true));
}

#[tokio::test]
async fn test_declining_reply_is_recorded_without_acceptance() {
    let player_id = Uuid::new_v4();
    let record = outreach(Uuid::new_v4(), player_id);
    let stored = answered(&record, false, ResponseMethod::Sms);

    let mut uow = TestUnitOfWork::default();
    uow.substitutes
        .expect_latest_open_response()
        .with(eq(player_id))
        .returning(move |_| Ok(Some(record.clone())));
    uow.substitutes
        .expect_record_answer()
        .withf(|_, answer| {
            !answer.is_available
                && answer.method == ResponseMethod::Sms
                && !answer.mark_token_used
                && answer.text.as_deref() == Some("no thanks")
        })
        .times(1)
        .returning(move |_, _| Ok(stored.clone()));
    uow.pool.expect_record_acceptance().times(0);

    let response = manager(uow)
        .process_reply(player_id, " no thanks ", ResponseMethod::Sms)
        .await
        .unwrap();

    assert_eq!(response.is_available, Some(false));
}

#[tokio::test]
async fn test_yes_reply_accepts() {
    let player_id = Uuid::new_v4();
    let record = outreach(Uuid::new_v4(), player_id);
    let stored = answered(&record, true, ResponseMethod::Discord);

    let mut uow = TestUnitOfWork::default();
    uow.substitutes
        .expect_latest_open_response()
        .returning(move |_| Ok(Some(record.clone())));
    uow.substitutes
        .expect_record_answer()
        .withf(|_, answer| answer.is_available)
        .returning(move |_, _| Ok(stored.clone()));
    uow.substitutes
        .expect_find_request()
        .returning(|id| Ok(Some(sub_request(id, RequestStatus::Open))));
    uow.pool
        .expect_record_acceptance()
        .times(1)
        .returning(|_, _, _| Ok(()));

    let response = manager(uow)
        .process_reply(player_id, "Y", ResponseMethod::Discord)
        .await
        .unwrap();

    assert_eq!(response.response_method, Some(ResponseMethod::Discord));
}

#[tokio::test]
async fn test_reply_without_open_request() {
    let mut uow = TestUnitOfWork::default();
    uow.substitutes
        .expect_latest_open_response()
        .returning(|_| Ok(None));

    let result = manager(uow)
        .process_reply(Uuid::new_v4(), "yes", ResponseMethod::Sms)
        .await;

    assert_eq!(
        validation_message(result),
        "No active substitute request found"
    );
}

#[tokio::test]
async fn test_availability_lists_available_first() {
    let request_id = Uuid::new_v4();
    let (declined, pending, accepted) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut uow = TestUnitOfWork::default();
    uow.substitutes
        .expect_find_request()
        .returning(|id| Ok(Some(sub_request(id, RequestStatus::Open))));
    uow.substitutes
        .expect_responses_for_request()
        .returning(move |request_id| {
            let mut no = outreach(request_id, declined);
            no.is_available = Some(false);
            let mut yes = outreach(request_id, accepted);
            yes.is_available = Some(true);
            Ok(vec![no, outreach(request_id, pending), yes])
        });
    uow.league.expect_find_players().returning(|ids| {
        Ok(ids
            .into_iter()
            .map(|id| player(id, Uuid::new_v4()))
            .collect())
    });

    let report = manager(uow).availability_status(request_id).await.unwrap();

    assert_eq!(report.totals.contacted, 3);
    assert_eq!(report.totals.responded, 2);
    assert_eq!(report.totals.pending, 1);
    let order: Vec<Uuid> = report.responses.iter().map(|r| r.player_id).collect();
    assert_eq!(order, vec![accepted, pending, declined]);
    assert_eq!(report.responses[0].player_name, "Sam Keeper");
}
