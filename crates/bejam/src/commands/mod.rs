//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod me;
pub mod search;
pub mod top;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use bejam_client::SpotifyClient;
use bejam_config::BejamConfig;
use bejam_oauth::{LoginFlow, TokenManager, create_file_store};
use console::Style;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Merged configuration.
    pub config: BejamConfig,
    /// Directory holding the user `config.toml`.
    pub config_dir: PathBuf,
    /// Config files that were found and merged, lowest precedence first.
    pub loaded_from: Vec<PathBuf>,
    /// Where `auth.json` lives.
    pub data_dir: PathBuf,
}

impl Context {
    pub fn token_manager(&self) -> Arc<TokenManager> {
        Arc::new(TokenManager::new(
            self.config.oauth(),
            create_file_store(&self.data_dir),
        ))
    }

    pub fn login_flow(&self) -> LoginFlow {
        LoginFlow::new(self.token_manager())
    }

    /// Web API client that refreshes the stored token when it expires.
    pub fn api_client(&self) -> Result<SpotifyClient> {
        let api = self.config.api();
        let client = SpotifyClient::builder()
            .base_url(&api.base_url)
            .timeout(api.timeout())
            .market(&api.market)
            .token_provider(self.token_manager())
            .build()?;
        Ok(client)
    }
}

/// Print `value` as pretty JSON.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Bold heading followed by a rule.
pub fn print_header(title: &str) {
    let dim = Style::new().dim();
    println!("{}", console::style(title).bold());
    println!("{}", dim.apply_to("─".repeat(50)));
}

/// Print a numbered list of tracks.
pub fn print_tracks(tracks: &[bejam_client::Track], verbose: bool) {
    let dim = Style::new().dim();
    if tracks.is_empty() {
        println!("{}", dim.apply_to("No tracks found"));
        return;
    }

    for (i, track) in tracks.iter().enumerate() {
        println!(
            "{:>3}. {} {}",
            i + 1,
            track.name,
            dim.apply_to(format!("- {}", track.artist_names()))
        );
        if verbose {
            println!("     {}", dim.apply_to(format!("id: {}", track.id)));
            if let Some(preview) = &track.preview_url {
                println!("     {}", dim.apply_to(format!("preview: {}", preview)));
            }
        }
    }
}
