//! Auth command - Spotify login and token management.

use anyhow::Result;
use bejam_oauth::TokenStatus;
use clap::{Args, Subcommand};
use console::Style;
use serde_json::json;

use super::{Context, print_header, print_json};

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Log in with Spotify in the browser
    Login {
        /// Only print the authorization URL; don't try to open a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Show login status and token expiry
    Status,

    /// Refresh the access token now
    Refresh,

    /// Clear stored tokens
    Logout,
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AuthCommand::Login { no_browser } => cmd_login(no_browser, ctx).await,
        AuthCommand::Status => cmd_status(ctx).await,
        AuthCommand::Refresh => cmd_refresh(ctx).await,
        AuthCommand::Logout => cmd_logout(ctx).await,
    }
}

async fn cmd_login(no_browser: bool, ctx: &Context) -> Result<()> {
    let flow = ctx.login_flow();
    let dim = Style::new().dim();

    let status = flow.tokens().status().await?;
    if status.logged_in && !status.is_expired {
        println!(
            "Already logged in (expires in {})",
            status.expires_in_display()
        );
        println!("Run 'bejam auth logout' first to log in again.");
        return Ok(());
    }

    let open_browser = ctx.config.auth().open_browser && !no_browser;
    let timeout = flow.tokens().config().callback_timeout;

    print_header("Spotify Login");
    println!();

    let login = flow.login(|url| {
        println!("Open this URL in your browser:");
        println!();
        println!("  {}", url);
        println!();
        if open_browser && open_url(url).is_err() {
            println!("{}", dim.apply_to("(Could not open browser automatically)"));
            println!();
        }
        match timeout {
            Some(limit) => println!(
                "{}",
                dim.apply_to(format!(
                    "Waiting for the redirect (gives up after {}s, Ctrl-C to cancel)...",
                    limit.as_secs()
                ))
            ),
            None => println!("{}", dim.apply_to("Waiting for the redirect (Ctrl-C to cancel)...")),
        }
    });

    let auth = tokio::select! {
        result = login => result?,
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("Login cancelled");
        }
    };

    let status = TokenStatus::from_auth(&auth, flow.tokens().now_millis());
    let green = Style::new().green();
    println!();
    println!("{} Logged in", green.apply_to("✓"));
    println!("  Expires in: {}", status.expires_in_display());
    if !status.has_refresh_token {
        println!(
            "{}",
            dim.apply_to("  No refresh token issued; you will need to log in again when it expires.")
        );
    }

    Ok(())
}

async fn cmd_status(ctx: &Context) -> Result<()> {
    let tokens = ctx.token_manager();
    let status = tokens.status().await?;

    if ctx.json_output {
        return print_json(&json!({
            "logged_in": status.logged_in,
            "expired": status.is_expired,
            "has_refresh_token": status.has_refresh_token,
            "expires_at": status.expires_at_display(),
            "expires_in_secs": status.expires_in_secs,
            "login_pending": status.login_pending,
        }));
    }

    print_header("Authentication Status");

    if status.logged_in {
        println!("Spotify: logged in");
        println!("  Expires: {}", status.expires_in_display());
        if let Some(at) = status.expires_at_display() {
            println!("  Expires at: {}", at);
        }
        println!(
            "  Refresh token: {}",
            if status.has_refresh_token { "yes" } else { "no" }
        );
    } else {
        println!("Spotify: not logged in");
        println!("  Run 'bejam auth login' to log in");
    }

    if ctx.verbose {
        let dim = Style::new().dim();
        println!();
        println!(
            "{}",
            dim.apply_to(format!("Token file: {}", ctx.data_dir.join(bejam_oauth::store::AUTH_FILE).display()))
        );
        if status.login_pending {
            println!("{}", dim.apply_to("A login attempt was started but not completed."));
        }
    }

    Ok(())
}

async fn cmd_refresh(ctx: &Context) -> Result<()> {
    let tokens = ctx.token_manager();
    let auth = tokens.refresh().await?;
    let status = TokenStatus::from_auth(&auth, tokens.now_millis());

    if ctx.json_output {
        return print_json(&json!({
            "refreshed": true,
            "expires_at": status.expires_at_display(),
            "expires_in_secs": status.expires_in_secs,
        }));
    }

    let green = Style::new().green();
    println!(
        "{} Access token refreshed (expires in {})",
        green.apply_to("✓"),
        status.expires_in_display()
    );
    Ok(())
}

async fn cmd_logout(ctx: &Context) -> Result<()> {
    let flow = ctx.login_flow();
    let was_logged_in = flow.tokens().status().await?.logged_in;

    flow.logout().await?;

    if was_logged_in {
        println!("Logged out; stored tokens removed.");
    } else {
        println!("Not logged in; nothing to remove.");
    }
    Ok(())
}

/// Try to open a URL in the default browser.
fn open_url(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).status()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).status()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", url])
            .status()?;
    }
    Ok(())
}
