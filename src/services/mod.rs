//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion.
//!
//! All services use Unit of Work pattern for centralized repository
//! access and transaction management.

mod auth_service;
pub mod container;
mod draft_service;
mod notification_service;
mod pool_service;
mod role_sync_service;
mod rsvp_service;
mod sub_notification_service;
mod sub_response_service;
mod substitute_service;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use auth_service::{AuthService, Authenticator, Claims, TokenResponse};
pub use draft_service::{
    DraftManager, DraftPick, DraftResult, DraftService, DRAFT_IN_PROGRESS_MESSAGE,
};
pub use notification_service::{NotificationDispatcher, NotificationService};
pub use pool_service::{PlayerSubStats, PoolManager, PoolMember, PoolService};
pub use role_sync_service::{RoleSyncService, RoleSyncer};
pub use rsvp_service::{
    BulkFailure, BulkRsvpResult, BulkSummary, HealthStatus, PlayerRsvp, RsvpCommand,
    RsvpCoordinator, RsvpCounts, RsvpHealth, RsvpMetrics, RsvpResult, RsvpService, RsvpStatus,
};
pub use sub_notification_service::{
    outreach_channels, ChannelResult, OutreachReport, PoolOutreach, SubNotificationService,
    SubNotifier,
};
pub use sub_response_service::{
    AvailabilityReport, AvailabilityTotals, ResponseReceipt, ResponseSummary, SubResponseManager,
    SubResponseService, TokenContext,
};
pub use substitute_service::{
    AssignSubstitute, CreateSubRequest, RequestDetails, SubstituteManager, SubstituteService,
};

// Parallel execution utilities
pub use container::{batch, parallel};

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
