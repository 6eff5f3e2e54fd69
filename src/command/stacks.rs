use anyhow::{Context, Result};
use cfsession::Session;

pub async fn run_stacks(session: &Session) -> Result<()> {
    let stacks = session
        .stack_manager()
        .list()
        .await
        .context("Failed to list stacks")?;

    for stack in &stacks {
        println!("{:<16} {}", stack.entity.name, stack.entity.description);
    }
    Ok(())
}
