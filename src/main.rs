use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod command;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let verbose = cli.verbose
        || std::env::var(cfsession::config::DEBUG_ENV)
            .map(|v| cfsession::config::is_truthy(&v))
            .unwrap_or(false);
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let session = command::connect(&cli).await?;

    match cli.command {
        Commands::Info => command::run_info(&session).await?,
        Commands::FeatureFlags => command::run_feature_flags(&session).await?,
        Commands::SetFeatureFlag { name, enabled } => {
            command::run_set_feature_flag(&session, &name, enabled).await?
        }
        Commands::Orgs => command::run_orgs(&session).await?,
        Commands::Stacks => command::run_stacks(&session).await?,
    }

    Ok(())
}
