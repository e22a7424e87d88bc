//! API middleware.

mod auth;
mod rate_limit;

pub use auth::{auth_middleware, require_admin, require_substitute_manager, CurrentUser};
pub(crate) use rate_limit::client_ip;
pub use rate_limit::{rate_limit_middleware, rate_limit_public_middleware, RateLimitError};
