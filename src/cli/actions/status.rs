use crate::cli::actions::console::Console;
use anyhow::Result;

/// Print the stored session without contacting the API.
pub fn execute(console: &Console) -> Result<()> {
    let session = console.session();

    if !session.is_authenticated() {
        println!("Not signed in");
        return Ok(());
    }

    println!("Signed in");
    match session.cached_profile() {
        Some(profile) => {
            println!("  id:       {}", profile.id);
            println!("  email:    {}", profile.email);
            if !profile.nickname.is_empty() {
                println!("  nickname: {}", profile.nickname);
            }
            if !profile.role.is_empty() {
                println!("  role:     {}", profile.role);
            }
        }
        None => println!("  no cached profile; permission checks will be denied"),
    }

    Ok(())
}
