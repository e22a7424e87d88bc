//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::{Cache, Database, RateLimiter};
use crate::jobs::JobQueue;
use crate::services::{ServiceContainer, Services};

/// Application state containing all services (DI container).
#[derive(Clone)]
pub struct AppState {
    /// Every application service
    pub services: Arc<dyn ServiceContainer>,
    /// Request counting for the rate limit middleware
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Background job queue, used by deferred endpoints
    pub jobs: Arc<dyn JobQueue>,
}

impl AppState {
    /// Create application state from live connections and config.
    pub fn from_config(
        database: &Database,
        cache: Cache,
        jobs: Arc<dyn JobQueue>,
        config: Config,
    ) -> AppResult<Self> {
        let rate_limiter: Arc<dyn RateLimiter> = Arc::new(cache.clone());
        let services = Services::from_connection(
            database.get_connection(),
            cache,
            jobs.clone(),
            config,
        )?;

        Ok(Self {
            services: Arc::new(services),
            rate_limiter,
            jobs,
        })
    }

    /// Create new application state with manually injected services.
    pub fn new(
        services: Arc<dyn ServiceContainer>,
        rate_limiter: Arc<dyn RateLimiter>,
        jobs: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            services,
            rate_limiter,
            jobs,
        }
    }
}
