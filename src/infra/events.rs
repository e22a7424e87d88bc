//! Idempotent RSVP event publication onto Redis streams.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use super::cache::{cache_error, Cache};
use crate::config::{
    CACHE_PREFIX_EVENT_PUBLISHED, EVENT_DEDUP_TTL_SECONDS, STREAM_DEAD_LETTER,
    STREAM_MAXLEN_ANALYTICS, STREAM_MAXLEN_AUDIT, STREAM_MAXLEN_DEAD_LETTER,
    STREAM_MAXLEN_DISCORD, STREAM_MAXLEN_DRAFT, STREAM_MAXLEN_WEBSOCKET, STREAM_DRAFT,
    STREAM_PREFIX_RSVP,
};
use crate::domain::{DraftEvent, RsvpEvent, StreamTarget};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Result of a publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Stream entry ids, one per routed stream.
    Published(Vec<String>),
    /// The event id was already published.
    Duplicate,
}

/// Publisher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct PublisherStats {
    pub published: u64,
    pub failed: u64,
    pub duplicates: u64,
}

/// Publishes committed RSVP changes to downstream consumers.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &RsvpEvent) -> AppResult<PublishOutcome>;

    /// Append a draft pick to the draft stream.
    async fn publish_draft(&self, event: &DraftEvent) -> AppResult<String>;

    async fn health_check(&self) -> AppResult<()>;

    fn stats(&self) -> PublisherStats;
}

/// Stream key for a target.
pub fn stream_name(target: StreamTarget) -> String {
    format!("{}{}", STREAM_PREFIX_RSVP, target.as_str())
}

fn stream_maxlen(target: StreamTarget) -> u64 {
    match target {
        StreamTarget::Audit => STREAM_MAXLEN_AUDIT,
        StreamTarget::Analytics => STREAM_MAXLEN_ANALYTICS,
        StreamTarget::Websocket => STREAM_MAXLEN_WEBSOCKET,
        StreamTarget::Discord => STREAM_MAXLEN_DISCORD,
    }
}

/// Redis streams publisher with a dead letter stream.
pub struct RedisEventPublisher {
    cache: Cache,
    published: AtomicU64,
    failed: AtomicU64,
    duplicates: AtomicU64,
}

impl RedisEventPublisher {
    pub fn new(cache: Cache) -> Self {
        Self {
            cache,
            published: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
        }
    }

    async fn already_published(&self, marker: &str) -> bool {
        match self.cache.exists(marker).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(error = %e, marker, "Dedup check failed, publishing anyway");
                false
            }
        }
    }

    async fn dead_letter(&self, event_json: &str, reason: &str) {
        let mut conn = self.cache.connection();
        let failed_at = chrono::Utc::now().to_rfc3339();
        let result: Result<String, _> = redis::cmd("XADD")
            .arg(STREAM_DEAD_LETTER)
            .arg("MAXLEN")
            .arg("~")
            .arg(STREAM_MAXLEN_DEAD_LETTER)
            .arg("*")
            .arg("original_event")
            .arg(event_json)
            .arg("error_reason")
            .arg(reason)
            .arg("failed_at")
            .arg(&failed_at)
            .query_async(&mut conn)
            .await;

        if let Err(e) = result {
            tracing::error!(error = %e, "Failed to write event to dead letter stream");
        }
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, event: &RsvpEvent) -> AppResult<PublishOutcome> {
        let marker = format!("{}{}", CACHE_PREFIX_EVENT_PUBLISHED, event.event_id);
        if self.already_published(&marker).await {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(event_id = %event.event_id, "Event already published");
            return Ok(PublishOutcome::Duplicate);
        }

        let payload = serde_json::to_string(event)
            .map_err(|e| AppError::internal(format!("Event serialization error: {}", e)))?;
        let event_id = event.event_id.to_string();
        let routing_key = event.routing_key();

        let mut pipe = redis::pipe();
        pipe.atomic();
        for target in event.targets() {
            pipe.cmd("XADD")
                .arg(stream_name(target))
                .arg("MAXLEN")
                .arg("~")
                .arg(stream_maxlen(target))
                .arg("*")
                .arg("event_id")
                .arg(&event_id)
                .arg("event_type")
                .arg(&event.event_type)
                .arg("routing_key")
                .arg(&routing_key)
                .arg("data")
                .arg(&payload);
        }
        pipe.cmd("SET")
            .arg(&marker)
            .arg(1)
            .arg("EX")
            .arg(EVENT_DEDUP_TTL_SECONDS)
            .ignore();

        let mut conn = self.cache.connection();
        let result: Result<Vec<String>, _> = pipe.query_async(&mut conn).await;

        match result {
            Ok(ids) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    event_id = %event.event_id,
                    streams = ids.len(),
                    "Event published"
                );
                Ok(PublishOutcome::Published(ids))
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(event_id = %event.event_id, error = %e, "Event publish failed");
                self.dead_letter(&payload, &e.to_string()).await;
                Err(AppError::external(format!("Event publish failed: {}", e)))
            }
        }
    }

    async fn publish_draft(&self, event: &DraftEvent) -> AppResult<String> {
        let payload = serde_json::to_string(event)
            .map_err(|e| AppError::internal(format!("Event serialization error: {}", e)))?;

        let mut conn = self.cache.connection();
        let result: Result<String, _> = redis::cmd("XADD")
            .arg(STREAM_DRAFT)
            .arg("MAXLEN")
            .arg("~")
            .arg(STREAM_MAXLEN_DRAFT)
            .arg("*")
            .arg("event_id")
            .arg(event.event_id.to_string())
            .arg("event_type")
            .arg(&event.event_type)
            .arg("data")
            .arg(&payload)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(id) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                Ok(id)
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(event_id = %event.event_id, error = %e, "Draft event publish failed");
                self.dead_letter(&payload, &e.to_string()).await;
                Err(AppError::external(format!("Event publish failed: {}", e)))
            }
        }
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.cache.connection();
        let _: i64 = redis::cmd("XLEN")
            .arg(stream_name(StreamTarget::Audit))
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    fn stats(&self) -> PublisherStats {
        PublisherStats {
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_names() {
        assert_eq!(stream_name(StreamTarget::Audit), "rsvp:audit");
        assert_eq!(stream_name(StreamTarget::Discord), "rsvp:discord");
        assert_eq!(stream_maxlen(StreamTarget::Audit), 100_000);
        assert_eq!(stream_maxlen(StreamTarget::Analytics), 50_000);
    }
}
