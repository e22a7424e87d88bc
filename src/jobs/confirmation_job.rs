//! Assignment confirmation delivery.

use apalis::prelude::Data;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::retry_transient;
use crate::errors::AppError;
use crate::services::SubNotificationService;

/// Tell an assigned substitute they have been selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationJob {
    pub assignment_id: Uuid,
}

pub async fn confirmation_job_handler(
    job: ConfirmationJob,
    service: Data<Arc<dyn SubNotificationService>>,
) -> Result<(), AppError> {
    let channels = retry_transient("confirmation", || {
        service.send_confirmation(job.assignment_id)
    })
    .await?;

    tracing::info!(
        assignment_id = %job.assignment_id,
        channels = channels.len(),
        "Assignment confirmation sent"
    );
    Ok(())
}
