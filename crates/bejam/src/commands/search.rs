//! Search command - find tracks.

use anyhow::Result;
use clap::Args;

use super::{Context, print_header, print_json, print_tracks};

/// Arguments for the search command.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// What to search for
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Maximum tracks to show (1-50)
    #[arg(short, long, default_value = "20")]
    pub limit: u32,
}

/// Run the search command.
pub async fn run(args: SearchArgs, ctx: &Context) -> Result<()> {
    let query = args.query.join(" ");
    let client = ctx.api_client()?;
    let tracks = client.tracks().search(&query, args.limit).await?;

    if ctx.json_output {
        return print_json(&tracks);
    }

    print_header(&format!("Tracks matching \"{}\"", query));
    print_tracks(&tracks, ctx.verbose);
    Ok(())
}
