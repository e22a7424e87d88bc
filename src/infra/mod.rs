//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections and repositories
//! - Redis locks, idempotency records and event streams
//! - HTTP gateways for Discord, push, SMS and email
//! - Unit of Work for transaction management

pub mod cache;
pub mod clients;
pub mod db;
pub mod events;
pub mod repositories;
pub mod unit_of_work;

pub use cache::{Cache, IdempotencyStore, LockGuard, LockManager, RateLimiter};
pub use clients::{
    DiscordBotClient, DiscordGateway, EmailGateway, EmailMessage, HttpEmailGateway,
    HttpPushGateway, HttpSmsGateway, PushGateway, PushMessage, SmsGateway,
};
pub use db::{Database, Migrator};
pub use events::{EventPublisher, PublishOutcome, PublisherStats, RedisEventPublisher};
pub use repositories::{
    AvailabilityRepository, LeagueRepository, NotificationRepository, PoolRepository,
    RoleRepository, SubstituteRepository, UserRepository,
};
pub use unit_of_work::{
    Persistence, PoolWrites, SubstituteWrites, TransactionContext, TxFuture, UnitOfWork,
};

#[cfg(any(test, feature = "test-utils"))]
pub use cache::{MockIdempotencyStore, MockLockManager, MockRateLimiter};
#[cfg(any(test, feature = "test-utils"))]
pub use clients::{MockDiscordGateway, MockEmailGateway, MockPushGateway, MockSmsGateway};
#[cfg(any(test, feature = "test-utils"))]
pub use events::MockEventPublisher;
#[cfg(any(test, feature = "test-utils"))]
pub use unit_of_work::{MockPoolWrites, MockSubstituteWrites};
