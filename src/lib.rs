//! League Coordinator - match availability and substitute coordination
//!
//! Tracks player RSVPs for matches, finds substitutes from league pools,
//! fans notifications out over in-app, push, email, SMS and Discord, runs
//! draft picks and keeps Discord roles in line with league roles.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core league entities and rules
//! - **services**: Use cases (RSVP, substitutes, notifications, draft, roles)
//! - **infra**: Database, Redis, event streams and outbound gateways
//! - **jobs**: apalis background workers
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared response types
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! league-coordinator serve
//!
//! # Run migrations
//! league-coordinator migrate up
//!
//! # Start the background workers
//! league-coordinator jobs work
//!
//! # Issue an API token for a user
//! league-coordinator token --user-id <uuid>
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod jobs;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{User, UserRole};
pub use errors::{AppError, AppResult};
pub use infra::Cache;
