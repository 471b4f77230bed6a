//! BeJam - log in to Spotify and browse your music from the terminal.
//!
//! Main entry point for the BeJam CLI.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::Style;
use tracing_appender::non_blocking::WorkerGuard;

mod commands;

use commands::{auth, config, me, search, top};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// BeJam - log in to Spotify and browse your music from the terminal
#[derive(Parser)]
#[command(name = "bejam")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config directory (default: platform config dir + /bejam)
    #[arg(long, global = true, env = "BEJAM_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in, check or clear the Spotify session
    Auth(auth::AuthArgs),

    /// Show, locate or initialize the configuration
    Config(config::ConfigArgs),

    /// Show your Spotify profile
    Me(me::MeArgs),

    /// Search for tracks
    Search(search::SearchArgs),

    /// Show your most played tracks
    Top(top::TopArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_dir = cli.config_dir.clone().or_else(bejam_config::config_dir);
    let _guard = init_tracing(cli.verbose, config_dir.as_deref());

    match run(cli, config_dir).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

/// Console (human-readable, stderr) + rotating JSON file in `<config dir>/logs`.
fn init_tracing(verbose: bool, config_dir: Option<&Path>) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "bejam=debug,bejam_oauth=debug,bejam_client=debug,bejam_config=debug,info"
    } else {
        "bejam=warn,bejam_oauth=warn,bejam_client=warn,warn"
    };

    let (file_layer, guard) = match config_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir.join("logs"), "bejam.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "bejam=trace,bejam_oauth=trace,bejam_client=trace,bejam_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    guard
}

async fn run(cli: Cli, config_dir: Option<PathBuf>) -> Result<()> {
    let config_dir = config_dir.ok_or_else(|| {
        anyhow::anyhow!("Could not determine config directory; pass --config-dir or set BEJAM_CONFIG_DIR")
    })?;

    let loaded = bejam_config::load_config_with_options(None, Some(&config_dir))?;
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::debug!(sources = ?loaded.loaded_from(), "config loaded");
    loaded.config.validate()?;

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        data_dir: loaded.data_dir(),
        loaded_from: loaded.loaded_from().into_iter().map(Path::to_path_buf).collect(),
        config_dir: loaded.config_dir,
        config: loaded.config,
    };

    match cli.command {
        Commands::Auth(args) => auth::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
        Commands::Me(args) => me::run(args, &ctx).await,
        Commands::Search(args) => search::run(args, &ctx).await,
        Commands::Top(args) => top::run(args, &ctx).await,
    }
}

/// Print a failed command as one line, plus what to do about it.
fn report(err: &anyhow::Error) {
    let red = Style::new().red();
    eprintln!("{} {}", red.apply_to("Error:"), err);
    if let Some(hint) = hint_for(err) {
        eprintln!("{}", Style::new().dim().apply_to(hint));
    }
}

fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    let (requires_login, transient) = if let Some(e) = err.downcast_ref::<bejam_oauth::OAuthError>() {
        (e.requires_login(), e.is_transient())
    } else if let Some(e) = err.downcast_ref::<bejam_client::Error>() {
        let transient = match e {
            bejam_client::Error::Http(_) => true,
            bejam_client::Error::Token(t) => t.is_transient(),
            other => other.is_rate_limited() || other.is_server_error(),
        };
        (e.is_auth_error(), transient)
    } else {
        return None;
    };

    if requires_login {
        Some("Run 'bejam auth login' to log in again.")
    } else if transient {
        Some("This may be temporary; try again.")
    } else {
        None
    }
}
