//! CLI module - Command-line interface for the application.
//!
//! Provides commands for:
//! - `serve` - Start the HTTP server
//! - `migrate` - Database migrations
//! - `jobs` - Background workers and queue maintenance
//! - `token` - Issue an access token

pub mod args;

pub use args::{Cli, Commands};
