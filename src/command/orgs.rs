use anyhow::{Context, Result};
use cfsession::Session;

pub async fn run_orgs(session: &Session) -> Result<()> {
    let orgs = session
        .org_manager()
        .list()
        .await
        .context("Failed to list organizations")?;

    if orgs.is_empty() {
        println!("No organizations found.");
        return Ok(());
    }

    for org in &orgs {
        println!("{}  {}  {}", org.guid(), org.entity.name, org.entity.status);
    }
    Ok(())
}
