//! Domain layer - Core league entities and rules
//!
//! Entities, value objects and pure decision functions. Nothing here touches
//! the database, Redis or the network.

pub mod availability;
pub mod league;
pub mod messages;
pub mod notification;
pub mod role;
pub mod substitute;
pub mod user;

pub use availability::{
    plan_transition, AppliedChange, Availability, AvailabilityWrite, RsvpEvent, RsvpResponse,
    RsvpSource, RsvpTransition, StreamTarget, EVENT_TYPE_RSVP_UPDATED,
};
pub use league::{DraftEvent, GenderFilter, Match, Player, Team, EVENT_TYPE_PLAYER_DRAFTED};
pub use notification::{
    evaluate_channels, Channel, ChannelPlan, ChannelTally, DeliveryReport, Notification,
    NotificationPayload, NotificationType, Priority,
};
pub use role::{compute_role_diff, Role, RoleDiff, RoleSyncReport, SyncOutcome};
pub use substitute::{
    NewAssignment, NewSubstituteRequest, NewSubstituteResponse, PoolAction, PoolEntry,
    PoolHistory, PoolPreferences, RecordedAnswer, RequestStatus, ResponseMethod,
    SubstituteAssignment, SubstituteRequest, SubstituteResponse,
};
pub use user::{NotificationPreferences, User, UserRole};
