//! Service Container - Centralized service access with parallel execution support.
//!
//! The container wires every service to one Unit of Work, one Redis
//! connection and one job queue.
//!
//! Features:
//! - Centralized access to all application services
//! - Thread-safe concurrent access via Arc
//! - Parallel execution utilities for independent operations
//! - Compatible with async/await and tokio runtime

use std::future::Future;
use std::sync::Arc;

use super::{
    AuthService, DraftService, NotificationService, PoolService, RoleSyncService, RsvpService,
    SubNotificationService, SubResponseService, SubstituteService,
};
use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::{
    Cache, DiscordBotClient, DiscordGateway, HttpPushGateway, HttpSmsGateway, Persistence,
    PushGateway, RedisEventPublisher, SmsGateway,
};
use crate::jobs::JobQueue;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
///
/// Provides centralized access to all application services.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    /// Get authentication service
    fn auth(&self) -> Arc<dyn AuthService>;

    /// Get RSVP service
    fn rsvp(&self) -> Arc<dyn RsvpService>;

    /// Get substitute request service
    fn substitutes(&self) -> Arc<dyn SubstituteService>;

    /// Get substitute pool service
    fn pool(&self) -> Arc<dyn PoolService>;

    /// Get substitute response service
    fn sub_responses(&self) -> Arc<dyn SubResponseService>;

    /// Get notification service
    fn notifications(&self) -> Arc<dyn NotificationService>;

    /// Get substitute outreach service
    fn sub_notifications(&self) -> Arc<dyn SubNotificationService>;

    /// Get draft service
    fn draft(&self) -> Arc<dyn DraftService>;

    /// Get Discord role sync service
    fn role_sync(&self) -> Arc<dyn RoleSyncService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    rsvp_service: Arc<dyn RsvpService>,
    substitute_service: Arc<dyn SubstituteService>,
    pool_service: Arc<dyn PoolService>,
    sub_response_service: Arc<dyn SubResponseService>,
    notification_service: Arc<dyn NotificationService>,
    sub_notification_service: Arc<dyn SubNotificationService>,
    draft_service: Arc<dyn DraftService>,
    role_sync_service: Arc<dyn RoleSyncService>,
}

impl Services {
    /// Create service container from database connection, Redis and the job queue.
    pub fn from_connection(
        db: sea_orm::DatabaseConnection,
        cache: Cache,
        jobs: Arc<dyn JobQueue>,
        config: Config,
    ) -> AppResult<Self> {
        use super::{
            Authenticator, DraftManager, NotificationDispatcher, PoolManager, RoleSyncer,
            RsvpCoordinator, SubNotifier, SubResponseManager, SubstituteManager,
        };

        let uow = Arc::new(Persistence::new(db));
        let cache = Arc::new(cache);
        let events = Arc::new(RedisEventPublisher::new((*cache).clone()));
        let discord: Arc<dyn DiscordGateway> = Arc::new(DiscordBotClient::from_config(&config)?);
        let push: Arc<dyn PushGateway> = Arc::new(HttpPushGateway::from_config(&config)?);
        let sms: Arc<dyn SmsGateway> = Arc::new(HttpSmsGateway::from_config(&config)?);

        Ok(Self {
            rsvp_service: Arc::new(RsvpCoordinator::new(
                uow.clone(),
                cache.clone(),
                cache.clone(),
                events.clone(),
            )),
            substitute_service: Arc::new(SubstituteManager::new(
                uow.clone(),
                cache.clone(),
                jobs.clone(),
            )),
            pool_service: Arc::new(PoolManager::new(uow.clone())),
            sub_response_service: Arc::new(SubResponseManager::new(uow.clone())),
            notification_service: Arc::new(NotificationDispatcher::new(
                uow.clone(),
                push.clone(),
                sms.clone(),
                discord.clone(),
                jobs.clone(),
            )),
            sub_notification_service: Arc::new(SubNotifier::new(
                uow.clone(),
                discord.clone(),
                push,
                sms,
                jobs,
                config.base_url.clone(),
                config.rsvp_token_ttl_hours,
            )),
            draft_service: Arc::new(DraftManager::new(uow.clone(), cache, events)),
            role_sync_service: Arc::new(RoleSyncer::new(
                uow.clone(),
                discord,
                config.discord_guild_id.clone(),
            )),
            auth_service: Arc::new(Authenticator::new(uow, config)),
        })
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn rsvp(&self) -> Arc<dyn RsvpService> {
        self.rsvp_service.clone()
    }

    fn substitutes(&self) -> Arc<dyn SubstituteService> {
        self.substitute_service.clone()
    }

    fn pool(&self) -> Arc<dyn PoolService> {
        self.pool_service.clone()
    }

    fn sub_responses(&self) -> Arc<dyn SubResponseService> {
        self.sub_response_service.clone()
    }

    fn notifications(&self) -> Arc<dyn NotificationService> {
        self.notification_service.clone()
    }

    fn sub_notifications(&self) -> Arc<dyn SubNotificationService> {
        self.sub_notification_service.clone()
    }

    fn draft(&self) -> Arc<dyn DraftService> {
        self.draft_service.clone()
    }

    fn role_sync(&self) -> Arc<dyn RoleSyncService> {
        self.role_sync_service.clone()
    }
}

/// Concurrent fan-out helpers used by the services.
pub mod parallel {
    use super::*;

    /// Run homogeneous operations concurrently, keeping input order.
    pub async fn join_all<F, T>(futures: Vec<F>) -> AppResult<Vec<T>>
    where
        F: Future<Output = AppResult<T>>,
    {
        let results = futures::future::join_all(futures).await;
        results.into_iter().collect()
    }

    /// Run operations with at most `limit` in flight.
    ///
    /// Completion order is not preserved.
    ///
    /// # Example
    /// ```ignore
    /// let sends: Vec<_> = users.into_iter().map(|user| notify(user, &payload)).collect();
    /// let reports = parallel::join_all_limited(sends, NOTIFICATION_CONCURRENCY).await?;
    /// ```
    pub async fn join_all_limited<F, T, I>(futures: I, limit: usize) -> AppResult<Vec<T>>
    where
        F: Future<Output = AppResult<T>>,
        I: IntoIterator<Item = F>,
    {
        use futures::stream::{self, TryStreamExt};

        let futures: Vec<AppResult<F>> = futures.into_iter().map(Ok).collect();
        stream::iter(futures)
            .try_buffer_unordered(limit.max(1))
            .try_collect()
            .await
    }
}

/// Bulk processing in fixed-size chunks.
pub mod batch {
    use super::*;
    use crate::errors::AppError;

    /// Process items chunk by chunk, running each chunk concurrently.
    ///
    /// # Example
    /// ```ignore
    /// let results = batch::process(
    ///     commands,
    ///     RSVP_BULK_BATCH_SIZE,
    ///     |cmd| async move { Ok(rsvp.update_rsvp(cmd).await) },
    /// ).await?;
    /// ```
    pub async fn process<T, R, F, Fut>(
        items: Vec<T>,
        batch_size: usize,
        processor: F,
    ) -> AppResult<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Fut + Send + Sync,
        Fut: Future<Output = AppResult<R>> + Send,
    {
        if batch_size == 0 {
            return Err(AppError::validation("batch_size must be greater than 0"));
        }

        let mut results = Vec::with_capacity(items.len());
        let mut remaining = items;

        while !remaining.is_empty() {
            let drain_count = std::cmp::min(batch_size, remaining.len());
            let chunk: Vec<_> = remaining.drain(..drain_count).map(&processor).collect();
            results.extend(parallel::join_all(chunk).await?);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parallel_join_all_keeps_order() {
        let futures: Vec<_> = (0..5).map(|i| async move { Ok(i) as AppResult<i32> }).collect();
        let results = parallel::join_all(futures).await.unwrap();
        assert_eq!(results, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_join_all_limited_collects_everything() {
        let mut results = parallel::join_all_limited(
            (0..6).map(|i| async move { Ok(i * 10) as AppResult<i32> }),
            2,
        )
        .await
        .unwrap();
        results.sort();
        assert_eq!(results, vec![0, 10, 20, 30, 40, 50]);
    }

    #[tokio::test]
    async fn test_batch_process_spans_chunks() {
        let results = batch::process((1..=7).collect(), 3, |n: u32| async move {
            Ok(n * n) as AppResult<u32>
        })
        .await
        .unwrap();
        assert_eq!(results, vec![1, 4, 9, 16, 25, 36, 49]);
    }

    #[tokio::test]
    async fn test_batch_process_rejects_zero_size() {
        let result = batch::process(vec![1], 0, |n: u32| async move { Ok(n) as AppResult<u32> }).await;
        assert!(result.is_err());
    }
}
