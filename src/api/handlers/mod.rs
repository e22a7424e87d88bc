//! HTTP request handlers.

pub mod draft_handler;
pub mod notification_handler;
pub mod pool_handler;
pub mod role_handler;
pub mod rsvp_handler;
pub mod sub_rsvp_handler;
pub mod substitute_handler;

pub use draft_handler::draft_routes;
pub use notification_handler::notification_routes;
pub use pool_handler::pool_routes;
pub use role_handler::role_routes;
pub use rsvp_handler::rsvp_routes;
pub use sub_rsvp_handler::sub_rsvp_routes;
pub use substitute_handler::substitute_routes;

use uuid::Uuid;

use super::middleware::CurrentUser;
use super::AppState;
use crate::errors::{AppError, AppResult};

/// Players act on their own profile; coaches and admins on anyone's.
pub(crate) async fn ensure_own_player(
    state: &AppState,
    user: &CurrentUser,
    player_id: Uuid,
) -> AppResult<()> {
    if user.role.can_manage_substitutes() {
        return Ok(());
    }
    let player = state.services.rsvp().player_for_user(user.id).await?;
    if player.id == player_id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
