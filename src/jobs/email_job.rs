//! Email background job.
//!
//! Email is never sent inline by request handlers; every channel that
//! delivers email enqueues one of these jobs instead.

use apalis::prelude::Data;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::retry_transient;
use crate::errors::AppError;
use crate::infra::{EmailGateway, EmailMessage};

/// Email job payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailJob {
    /// Recipient email address
    pub to: String,
    /// Email subject line
    pub subject: String,
    /// Plain text body
    pub body: String,
    /// Optional sender override (defaults to EMAIL_FROM)
    #[serde(default)]
    pub from: Option<String>,
}

impl EmailJob {
    /// Create a new email job
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            from: None,
        }
    }

    fn into_message(self, default_from: &str) -> EmailMessage {
        EmailMessage {
            from: self.from.unwrap_or_else(|| default_from.to_string()),
            to: self.to,
            subject: self.subject,
            body: self.body,
        }
    }
}

/// Shared state for the email worker.
#[derive(Clone)]
pub struct EmailWorkerContext {
    pub gateway: Arc<dyn EmailGateway>,
    pub default_from: String,
}

/// Email job handler - delivers one email with bounded retries
pub async fn email_job_handler(
    job: EmailJob,
    ctx: Data<EmailWorkerContext>,
) -> Result<(), AppError> {
    let message = job.into_message(&ctx.default_from);

    tracing::info!(
        to = %message.to,
        from = %message.from,
        subject = %message.subject,
        "Processing email job"
    );

    retry_transient("email", || ctx.gateway.send(message.clone())).await?;

    tracing::info!(to = %message.to, "Email processed successfully");
    Ok(())
}
