//! Me command - the logged-in user's profile.

use anyhow::Result;
use clap::Args;
use console::Style;

use super::{Context, print_header, print_json};

/// Arguments for the me command.
#[derive(Args, Debug)]
pub struct MeArgs {}

/// Run the me command.
pub async fn run(_args: MeArgs, ctx: &Context) -> Result<()> {
    let client = ctx.api_client()?;
    let profile = client.users().me().await?;

    if ctx.json_output {
        return print_json(&profile);
    }

    let dim = Style::new().dim();
    print_header("Spotify Profile");
    println!("Name:  {}", profile.name());
    println!("ID:    {}", profile.id);
    if let Some(email) = &profile.email {
        println!("Email: {}", email);
    }
    if let Some(country) = &profile.country {
        println!("Country: {}", country);
    }
    if let Some(image) = profile.image_url() {
        println!("{}", dim.apply_to(format!("Avatar: {}", image)));
    }

    Ok(())
}
