//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config::DEFAULT_REQUEST_EXPIRY_DAYS;

/// League Coordinator - RSVP, substitute and notification coordination
#[derive(Parser, Debug)]
#[command(name = "league-coordinator")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Run database migrations
    Migrate(MigrateArgs),

    /// Manage background jobs
    Jobs(JobsArgs),

    /// Issue an access token for an existing user
    Token(TokenArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Host to bind to (defaults to SERVER_HOST)
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on (defaults to SERVER_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

/// Migration actions
#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Apply pending migrations
    Up,
    /// Roll back applied migrations, newest first
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// List migrations and whether each is applied
    Status,
    /// Drop every table and re-apply all migrations (wipes league data)
    Fresh {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

/// Arguments for the jobs command
#[derive(Parser, Debug)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub action: JobsAction,
}

/// Job management actions
#[derive(Subcommand, Debug)]
pub enum JobsAction {
    /// Start background job worker
    Work,
    /// List pending jobs
    List,
    /// Clear failed jobs
    Clear,
    /// Expire stale open substitute requests
    Cleanup {
        /// Expire OPEN requests created more than this many days ago
        #[arg(short, long, default_value_t = DEFAULT_REQUEST_EXPIRY_DAYS)]
        days: i64,
    },
}

/// Arguments for the token command
#[derive(Parser, Debug)]
pub struct TokenArgs {
    /// User to issue the token for
    #[arg(long)]
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cleanup_defaults_to_a_week() {
        let cli = Cli::parse_from(["league-coordinator", "jobs", "cleanup"]);
        match cli.command {
            Commands::Jobs(JobsArgs {
                action: JobsAction::Cleanup { days },
            }) => assert_eq!(days, 7),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
