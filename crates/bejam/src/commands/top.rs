//! Top command - most played tracks.

use anyhow::Result;
use clap::Args;

use super::{Context, print_header, print_json, print_tracks};

/// Arguments for the top command.
#[derive(Args, Debug)]
pub struct TopArgs {
    /// Number of tracks (1-50)
    #[arg(short, long, default_value = "10")]
    pub limit: u32,
}

/// Run the top command.
pub async fn run(args: TopArgs, ctx: &Context) -> Result<()> {
    let client = ctx.api_client()?;
    let tracks = client.tracks().top(args.limit).await?;

    if ctx.json_output {
        return print_json(&tracks);
    }

    print_header("Your Top Tracks");
    print_tracks(&tracks, ctx.verbose);
    Ok(())
}
