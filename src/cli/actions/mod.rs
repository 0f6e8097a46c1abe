pub mod console;
pub mod login;
pub mod logout;
pub mod navigate;
pub mod request;
pub mod status;

// Internal "interpreter" for `Action`.
mod run;

use crate::cli::globals::GlobalArgs;

#[derive(Debug)]
pub enum Action {
    Login(login::Args),
    Logout,
    Status,
    Navigate(navigate::Args),
    Request(request::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self, globals: &GlobalArgs) -> anyhow::Result<()> {
        run::execute(self, globals).await
    }
}
