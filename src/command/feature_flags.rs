use std::collections::BTreeMap;

use anyhow::{Context, Result};
use cfsession::Session;

pub async fn run_feature_flags(session: &Session) -> Result<()> {
    let flags = session
        .get_feature_flags()
        .await
        .context("Failed to read feature flags")?;

    let width = flags.keys().map(String::len).max().unwrap_or(0);
    for (name, enabled) in &flags {
        let state = if *enabled { "enabled" } else { "disabled" };
        println!("{:<width$}  {}", name, state, width = width);
    }

    Ok(())
}

pub async fn run_set_feature_flag(session: &Session, name: &str, enabled: bool) -> Result<()> {
    let flags = BTreeMap::from([(name.to_string(), enabled)]);
    session
        .set_feature_flags(&flags)
        .await
        .with_context(|| format!("Failed to set feature flag {}", name))?;

    println!(
        "✅ Feature flag {} {}",
        name,
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}
