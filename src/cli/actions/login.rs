use crate::cli::actions::console::Console;
use anyhow::{Context, Result};
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub email: String,
    pub password: SecretString,
}

/// Sign in and cache the profile used by the route guard.
/// # Errors
/// Returns an error if the credentials are rejected or the session cannot be stored.
pub async fn execute(console: &Console, args: Args) -> Result<()> {
    let profile = console
        .client
        .login(&args.email, &args.password)
        .await
        .context("login failed")?;

    let name = if profile.nickname.is_empty() {
        &profile.email
    } else {
        &profile.nickname
    };
    println!("Signed in as {name} (id {})", profile.id);

    Ok(())
}
