//! Redis cache implementation.
//!
//! Provides the shared Redis connection plus the coordination primitives
//! built on it: distributed locks, operation idempotency records and rate
//! limiting.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError, Script};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::config::{
    Config, CACHE_PREFIX_LOCK, CACHE_PREFIX_RATE_LIMIT, CACHE_PREFIX_RSVP_OPERATION,
    DEFAULT_LOCK_RETRY_DELAY_MS,
};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// INCR plus first-hit EXPIRE in one round-trip, so a window always expires.
static RATE_WINDOW: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local count = redis.call("INCR", KEYS[1])
        if count == 1 then
            redis.call("EXPIRE", KEYS[1], ARGV[1])
        end
        return count
        "#,
    )
});

/// DEL only while the stored token is still ours.
static RELEASE_LOCK: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        if redis.call("GET", KEYS[1]) == ARGV[1] then
            return redis.call("DEL", KEYS[1])
        end
        return 0
        "#,
    )
});

/// Shared Redis handle. Cloning is cheap.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    pub async fn connect(config: &Config) -> Result<Self, RedisError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;
        tracing::info!("Redis connected");
        Ok(Self { connection })
    }

    /// Raw connection for stream commands.
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    /// JSON value stored under `key`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.connection();
        let raw: Option<String> = conn.get(key).await.map_err(cache_error)?;
        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| AppError::internal(format!("Cached value for {} is corrupt: {}", key, e)))
        })
        .transpose()
    }

    /// Store `value` as JSON, expiring after `ttl_seconds`.
    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::internal(format!("Cannot cache value for {}: {}", key, e)))?;
        let mut conn = self.connection();
        conn.set_ex::<_, _, ()>(key, json, ttl_seconds)
            .await
            .map_err(cache_error)
    }

    pub async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.connection();
        conn.exists(key).await.map_err(cache_error)
    }

    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    /// Count a hit in the current window. Returns (hits so far, allowed).
    async fn count_hit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<(u64, bool)> {
        let mut conn = self.connection();
        let count: u64 = RATE_WINDOW
            .key(format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier))
            .arg(window_seconds)
            .invoke_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok((count, count <= max_requests))
    }

    /// SET NX EX, polling every DEFAULT_LOCK_RETRY_DELAY_MS for up to `wait_ms`.
    async fn take_lock(
        &self,
        resource: &str,
        ttl_seconds: u64,
        wait_ms: u64,
    ) -> AppResult<Option<LockGuard>> {
        let key = format!("{}{}", CACHE_PREFIX_LOCK, resource);
        let token = Uuid::new_v4().to_string();
        let attempts = wait_ms / DEFAULT_LOCK_RETRY_DELAY_MS + 1;
        let mut conn = self.connection();

        for attempt in 1..=attempts {
            let won: Option<String> = redis::cmd("SET")
                .arg(&key)
                .arg(&token)
                .arg("NX")
                .arg("EX")
                .arg(ttl_seconds)
                .query_async(&mut conn)
                .await
                .map_err(cache_error)?;

            if won.is_some() {
                tracing::debug!(resource, attempt, "Lock acquired");
                return Ok(Some(LockGuard {
                    cache: Some(Arc::new(self.clone())),
                    key,
                    lock_id: token,
                    released: false,
                }));
            }
            if attempt < attempts {
                sleep(Duration::from_millis(DEFAULT_LOCK_RETRY_DELAY_MS)).await;
            }
        }

        tracing::warn!(resource, wait_ms, "Lock still held after waiting");
        Ok(None)
    }

    async fn release_lock(&self, key: &str, lock_id: &str) -> AppResult<bool> {
        let mut conn = self.connection();
        let deleted: i32 = RELEASE_LOCK
            .key(key)
            .arg(lock_id)
            .invoke_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(deleted == 1)
    }
}

// =============================================================================
// Coordination Ports
// =============================================================================

/// Keyed mutual exclusion with a fixed expiry.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Acquire `resource`, waiting up to `wait_ms`. `None` means it stayed busy.
    async fn acquire(
        &self,
        resource: &str,
        ttl_seconds: u64,
        wait_ms: u64,
    ) -> AppResult<Option<LockGuard>>;
}

#[async_trait]
impl LockManager for Cache {
    async fn acquire(
        &self,
        resource: &str,
        ttl_seconds: u64,
        wait_ms: u64,
    ) -> AppResult<Option<LockGuard>> {
        self.take_lock(resource, ttl_seconds, wait_ms).await
    }
}

/// Fixed-window request counting.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one hit for `identifier`; returns (current_count, is_allowed).
    async fn hit(&self, identifier: &str, max_requests: u64, window_seconds: u64)
        -> AppResult<(u64, bool)>;
}

#[async_trait]
impl RateLimiter for Cache {
    async fn hit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<(u64, bool)> {
        self.count_hit(identifier, max_requests, window_seconds).await
    }
}

/// Results of completed operations, keyed by caller supplied operation id.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn get_operation(&self, operation_id: &str) -> AppResult<Option<serde_json::Value>>;

    async fn store_operation(
        &self,
        operation_id: &str,
        result: serde_json::Value,
        ttl_seconds: u64,
    ) -> AppResult<()>;

    /// Round-trip to the backing store.
    async fn ping(&self) -> AppResult<()>;
}

#[async_trait]
impl IdempotencyStore for Cache {
    async fn get_operation(&self, operation_id: &str) -> AppResult<Option<serde_json::Value>> {
        let key = format!("{}{}", CACHE_PREFIX_RSVP_OPERATION, operation_id);
        self.get(&key).await
    }

    async fn store_operation(
        &self,
        operation_id: &str,
        result: serde_json::Value,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let key = format!("{}{}", CACHE_PREFIX_RSVP_OPERATION, operation_id);
        self.set_with_ttl(&key, &result, ttl_seconds).await
    }

    async fn ping(&self) -> AppResult<()> {
        Cache::ping(self).await
    }
}

// =============================================================================
// Lock Guard
// =============================================================================

/// Held lock. Dropping it releases the key in the background; the TTL
/// covers a process that dies first.
pub struct LockGuard {
    cache: Option<Arc<Cache>>,
    key: String,
    lock_id: String,
    released: bool,
}

impl LockGuard {
    /// A guard not backed by Redis, for in-process callers and tests.
    pub fn unmanaged(resource: &str) -> Self {
        Self {
            cache: None,
            key: format!("{}{}", CACHE_PREFIX_LOCK, resource),
            lock_id: Uuid::new_v4().to_string(),
            released: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release now and surface any Redis error.
    pub async fn release(mut self) -> AppResult<()> {
        self.released = true;
        let Some(cache) = self.cache.take() else {
            return Ok(());
        };
        if !cache.release_lock(&self.key, &self.lock_id).await? {
            tracing::warn!(key = %self.key, "Lock expired before release");
        }
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Some(cache) = self.cache.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let key = std::mem::take(&mut self.key);
        let lock_id = std::mem::take(&mut self.lock_id);

        runtime.spawn(async move {
            if let Err(e) = cache.release_lock(&key, &lock_id).await {
                tracing::error!(key = %key, error = %e, "Failed to release lock on drop");
            }
        });
    }
}

pub(crate) fn cache_error(e: RedisError) -> AppError {
    tracing::error!(error = %e, "Redis command failed");
    AppError::internal(format!("Redis error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_prefixes() {
        assert_eq!(CACHE_PREFIX_RATE_LIMIT, "rate_limit:");
        assert_eq!(CACHE_PREFIX_LOCK, "lock:");
        assert_eq!(CACHE_PREFIX_RSVP_OPERATION, "rsvp:operation:");
    }

    #[tokio::test]
    async fn test_unmanaged_guard_releases_quietly() {
        let guard = LockGuard::unmanaged("draft:42");
        assert_eq!(guard.key(), "lock:draft:42");
        guard.release().await.unwrap();
    }

    #[test]
    fn test_unmanaged_guard_drops_outside_runtime() {
        drop(LockGuard::unmanaged("rsvp:1:2"));
    }
}
