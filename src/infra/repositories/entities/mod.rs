//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod availability;
pub mod device_token;
pub mod game;
pub mod notification;
pub mod player;
pub mod player_team;
pub mod role;
pub mod substitute_assignment;
pub mod substitute_pool;
pub mod substitute_pool_history;
pub mod substitute_request;
pub mod substitute_response;
pub mod team;
pub mod user;
pub mod user_role;
