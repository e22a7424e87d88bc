//! Repository layer - Data access abstraction
//!
//! One trait per aggregate with a SeaORM-backed `*Store` implementation.
//! Traits are mockable under the `test-utils` feature.

mod availability_repository;
pub(crate) mod entities;
mod league_repository;
mod notification_repository;
mod pool_repository;
mod role_repository;
mod substitute_repository;
mod user_repository;

pub use availability_repository::{AvailabilityRepository, AvailabilityStore};
pub use league_repository::{LeagueRepository, LeagueStore};
pub use notification_repository::{NotificationRepository, NotificationStore};
pub use pool_repository::{PoolRepository, PoolStore};
pub use role_repository::{RoleRepository, RoleStore};
pub use substitute_repository::{SubstituteRepository, SubstituteStore};
pub use user_repository::{UserRepository, UserStore};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use availability_repository::MockAvailabilityRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use league_repository::MockLeagueRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use notification_repository::MockNotificationRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use pool_repository::MockPoolRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use role_repository::MockRoleRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use substitute_repository::MockSubstituteRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
