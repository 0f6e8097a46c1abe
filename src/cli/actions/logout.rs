use crate::cli::actions::console::Console;
use anyhow::{Context, Result};

/// Sign out locally and, when reachable, on the server.
/// # Errors
/// Returns an error if the stored session cannot be cleared.
pub async fn execute(console: &Console) -> Result<()> {
    console
        .client
        .logout()
        .await
        .context("failed to clear the stored session")?;

    println!("Signed out");
    Ok(())
}
