//! `league-coordinator` binary: serve the API, run workers, manage the schema.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use league_coordinator::{
    cli::{Cli, Commands},
    commands,
    config::Config,
};

/// Used when RUST_LOG is unset.
const DEFAULT_LOG_FILTER: &str = "league_coordinator=info,tower_http=info,apalis=info,sqlx=warn";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::from_env();
    tracing::debug!(?config, "Configuration loaded");

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::Migrate(args) => commands::migrate::execute(args, config).await,
        Commands::Jobs(args) => commands::jobs::execute(args, config).await,
        Commands::Token(args) => commands::token::execute(args, config).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, code = e.code(), "Command failed");
        std::process::exit(1);
    }
}

/// `--verbose` wins over RUST_LOG.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("league_coordinator=debug,tower_http=debug,apalis=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();
}
