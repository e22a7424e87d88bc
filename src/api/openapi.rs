//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    draft_handler, notification_handler, pool_handler, role_handler, rsvp_handler,
    sub_rsvp_handler, substitute_handler,
};
use crate::domain::{
    Channel, ChannelTally, DeliveryReport, DraftEvent, Match, Notification, NotificationPayload,
    NotificationType, Player, PoolEntry, Priority, RequestStatus, ResponseMethod, RoleDiff,
    RoleSyncReport, RsvpEvent, RsvpResponse, RsvpSource, SubstituteAssignment, SubstituteRequest,
    SubstituteResponse, Team,
};
use crate::infra::PublisherStats;
use crate::services::{
    AvailabilityReport, AvailabilityTotals, BulkFailure, BulkRsvpResult, BulkSummary,
    ChannelResult, DraftResult, HealthStatus, OutreachReport, PlayerRsvp, PlayerSubStats,
    PoolMember, RequestDetails, ResponseReceipt, ResponseSummary, RsvpCommand, RsvpCounts,
    RsvpHealth, RsvpMetrics, RsvpResult, RsvpStatus, TokenContext,
};
use crate::types::MessageResponse;

/// OpenAPI documentation for the League Coordinator
#[derive(OpenApi)]
#[openapi(
    info(
        title = "League Coordinator",
        version = "0.1.0",
        description = "RSVP, substitute, notification, draft and Discord role coordination for a recreational soccer league"
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // RSVP
        rsvp_handler::update_rsvp,
        rsvp_handler::bulk_update_rsvps,
        rsvp_handler::get_rsvp_status,
        rsvp_handler::rsvp_metrics,
        // Substitute requests
        substitute_handler::create_request,
        substitute_handler::list_requests,
        substitute_handler::get_request,
        substitute_handler::cancel_request,
        substitute_handler::assign_substitute,
        substitute_handler::notify_pool,
        substitute_handler::notify_player,
        substitute_handler::availability_status,
        substitute_handler::record_reply,
        // Substitute pool
        pool_handler::join_pool,
        pool_handler::leave_pool,
        pool_handler::update_preferences,
        pool_handler::get_entry,
        pool_handler::list_pool,
        pool_handler::player_stats,
        // Token RSVP
        sub_rsvp_handler::validate_token,
        sub_rsvp_handler::respond_with_token,
        // Notifications
        notification_handler::send_notification,
        notification_handler::list_notifications,
        // Draft
        draft_handler::draft_player,
        // Roles
        role_handler::sync_role,
        role_handler::sync_all_roles,
        role_handler::role_assigned,
        role_handler::role_removed,
        role_handler::reconcile_user,
    ),
    components(
        schemas(
            // Domain types
            Channel,
            ChannelTally,
            DeliveryReport,
            DraftEvent,
            Match,
            Notification,
            NotificationPayload,
            NotificationType,
            Player,
            PoolEntry,
            Priority,
            RequestStatus,
            ResponseMethod,
            RoleDiff,
            RoleSyncReport,
            RsvpEvent,
            RsvpResponse,
            RsvpSource,
            SubstituteAssignment,
            SubstituteRequest,
            SubstituteResponse,
            Team,
            PublisherStats,
            // Service types
            AvailabilityReport,
            AvailabilityTotals,
            BulkFailure,
            BulkRsvpResult,
            BulkSummary,
            ChannelResult,
            DraftResult,
            HealthStatus,
            OutreachReport,
            PlayerRsvp,
            PlayerSubStats,
            PoolMember,
            RequestDetails,
            ResponseReceipt,
            ResponseSummary,
            RsvpCommand,
            RsvpCounts,
            RsvpHealth,
            RsvpMetrics,
            RsvpResult,
            RsvpStatus,
            TokenContext,
            MessageResponse,
            // Request bodies
            rsvp_handler::UpdateRsvpRequest,
            rsvp_handler::BulkRsvpRequest,
            substitute_handler::CreateSubRequestBody,
            substitute_handler::AssignSubstituteBody,
            substitute_handler::NotifyPoolBody,
            substitute_handler::NotifyPlayerBody,
            substitute_handler::InboundReplyBody,
            pool_handler::PoolPreferencesBody,
            pool_handler::JoinPoolBody,
            pool_handler::UpdatePoolBody,
            sub_rsvp_handler::TokenAnswerBody,
            notification_handler::SendNotificationBody,
            draft_handler::DraftPickBody,
            role_handler::RoleChangeResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "RSVP", description = "Match availability"),
        (name = "Substitutes", description = "Substitute requests, assignment and outreach"),
        (name = "Substitute Pool", description = "League substitute pools"),
        (name = "Substitute RSVP", description = "Token links sent to substitutes"),
        (name = "Notifications", description = "Multi-channel notifications"),
        (name = "Draft", description = "Draft picks"),
        (name = "Roles", description = "Discord role sync")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT issued with the `token` command"))
                        .build(),
                ),
            );
        }
    }
}
