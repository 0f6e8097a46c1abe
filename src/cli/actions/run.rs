use crate::cli::{
    actions::{console::Console, login, logout, navigate, request, status, Action},
    globals::GlobalArgs,
};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action, globals: &GlobalArgs) -> Result<()> {
    let mut console = Console::open(globals)?;

    let outcome = match action {
        Action::Login(args) => login::execute(&console, args).await,
        Action::Logout => logout::execute(&console).await,
        Action::Status => status::execute(&console),
        Action::Navigate(args) => navigate::execute(&console, args).await,
        Action::Request(args) => request::execute(&console, args).await,
    };

    console.report_redirects();
    outcome
}
