mod feature_flags;
mod info;
mod orgs;
mod stacks;

pub use feature_flags::{run_feature_flags, run_set_feature_flag};
pub use info::run_info;
pub use orgs::run_orgs;
pub use stacks::run_stacks;

use anyhow::{Context, Result};
use cfsession::{Session, SessionOptions};

use crate::cli::Cli;

/// Open a session from the global command-line options.
pub async fn connect(cli: &Cli) -> Result<Session> {
    let ca_cert = cli
        .ca_cert
        .as_ref()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read CA certificate: {:?}", path))
        })
        .transpose()?;

    let options = SessionOptions {
        endpoint: cli.api.clone(),
        user: cli.user.clone(),
        password: cli.password.clone(),
        uaa_client_id: cli.client_id.clone(),
        uaa_client_secret: cli.client_secret.clone(),
        ca_cert,
        skip_ssl_validation: cli.skip_ssl_validation,
    };

    Session::new(&options)
        .await
        .with_context(|| format!("Failed to connect to {}", cli.api))
}
