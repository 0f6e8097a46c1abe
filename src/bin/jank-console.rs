use anyhow::Result;
use jank_console::cli::start;

#[tokio::main]
async fn main() -> Result<()> {
    let (action, globals) = start()?;

    action.execute(&globals).await
}
