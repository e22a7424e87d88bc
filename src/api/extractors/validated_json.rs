//! JSON body extractor that runs `validator` rules before the handler sees it.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::errors::AppError;

/// Deserialized and validated request body.
///
/// ```rust,ignore
/// async fn cancel(ValidatedJson(body): ValidatedJson<CancelBody>) { .. }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_message)?;

        value
            .validate()
            .map_err(|e| AppError::validation(describe(&e)))?;

        Ok(ValidatedJson(value))
    }
}

fn rejection_message(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::validation("Expected a JSON body (Content-Type: application/json)")
        }
        JsonRejection::JsonSyntaxError(_) => AppError::validation("Request body is not valid JSON"),
        other => AppError::validation(other.body_text()),
    }
}

/// One message per failing rule, ordered by field name.
fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Sample {
        #[validate(range(min = 1, max = 10, message = "substitutes_needed must be between 1 and 10"))]
        substitutes_needed: i32,
        #[validate(length(max = 5))]
        notes: String,
    }

    #[test]
    fn test_messages_follow_field_order() {
        let errors = Sample {
            substitutes_needed: 11,
            notes: "far too long".to_string(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            describe(&errors),
            "notes is invalid, substitutes_needed must be between 1 and 10"
        );
    }
}
