//! Deferred notification fan-out.

use apalis::prelude::Data;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::retry_transient;
use crate::domain::NotificationPayload;
use crate::errors::AppError;
use crate::services::NotificationService;

/// Send one notification payload in the background.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJob {
    pub payload: NotificationPayload,
}

pub async fn notification_job_handler(
    job: NotificationJob,
    service: Data<Arc<dyn NotificationService>>,
) -> Result<(), AppError> {
    tracing::info!(
        kind = job.payload.notification_type.as_str(),
        users = job.payload.user_ids.len(),
        "Processing notification job"
    );

    let report = retry_transient("notification", || service.send(job.payload.clone())).await?;

    tracing::info!(
        total_users = report.total_users,
        in_app = report.in_app.success,
        push = report.push.success,
        email = report.email.success,
        sms = report.sms.success,
        discord = report.discord.success,
        "Notification job finished"
    );
    Ok(())
}
