use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// cfsession - inspect and configure a Cloud Foundry platform
#[derive(Parser)]
#[command(name = "cfsession")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// API endpoint, e.g. api.sys.example.com
    #[arg(long, env = "CF_API")]
    pub api: String,

    #[arg(short = 'u', long, env = "CF_USERNAME")]
    pub user: String,

    #[arg(short = 'p', long, env = "CF_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// UAA client for group operations
    #[arg(long, env = "CF_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "CF_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// PEM file with an additional CA certificate to trust
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,

    /// Accept any TLS certificate (insecure)
    #[arg(long)]
    pub skip_ssl_validation: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the platform discovery document
    Info,
    /// List feature flags
    FeatureFlags,
    /// Enable or disable one feature flag
    SetFeatureFlag {
        name: String,
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// List organizations
    Orgs,
    /// List stacks
    Stacks,
}
