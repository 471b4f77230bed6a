//! Config command - configuration inspection and setup.

use anyhow::Result;
use bejam_config::BejamConfig;
use clap::{Args, Subcommand};
use console::Style;
use serde_json::json;

use super::{Context, print_header, print_json};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration and where it came from
    Show,

    /// Show the user configuration file path
    Path,

    /// Write a config file with every default filled in
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
        ConfigCommand::Init { force } => cmd_init(force, ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let effective = ctx.config.effective();

    if ctx.json_output {
        return print_json(&json!({
            "config": effective,
            "loaded_from": ctx.loaded_from,
            "data_dir": ctx.data_dir,
        }));
    }

    let dim = Style::new().dim();
    print_header("Configuration");
    if ctx.loaded_from.is_empty() {
        println!("{}", dim.apply_to("No config files found; using defaults."));
    } else {
        for path in &ctx.loaded_from {
            println!("{}", dim.apply_to(format!("Loaded: {}", path.display())));
        }
    }
    println!("{}", dim.apply_to(format!("Data dir: {}", ctx.data_dir.display())));
    println!();
    print!("{}", effective.to_toml()?);
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let path = bejam_config::config_path(&ctx.config_dir);
    if ctx.json_output {
        return print_json(&json!({
            "path": path,
            "exists": path.exists(),
        }));
    }
    println!("{}", path.display());
    Ok(())
}

fn cmd_init(force: bool, ctx: &Context) -> Result<()> {
    let path = bejam_config::config_path(&ctx.config_dir);
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    bejam_config::save_config(&BejamConfig::new().effective(), &path)?;

    let green = Style::new().green();
    println!("{} Wrote {}", green.apply_to("✓"), path.display());
    Ok(())
}
