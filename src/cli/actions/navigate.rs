use crate::{
    cli::actions::console::Console,
    rbac::HttpPermissionOracle,
    router::{find_route, RouteGuard},
};
use anyhow::{anyhow, Result};

#[derive(Debug)]
pub struct Args {
    pub route: String,
}

/// Run the route guard for a console route and print the outcome.
/// # Errors
/// Returns an error if the route is not part of the console.
pub async fn execute(console: &Console, args: Args) -> Result<()> {
    let rule = find_route(&args.route)
        .ok_or_else(|| anyhow!("unknown console route: {}", args.route))?;

    let guard = RouteGuard::new(
        console.session().clone(),
        HttpPermissionOracle::new(console.client.clone()),
        console.client.config().permission_timeout,
    );

    println!("{}", guard.authorize(&rule).await);

    Ok(())
}
