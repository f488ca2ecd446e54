//! Slapper Bot - Main Entry Point
//!
//! Runs the click loop for every Telegram session found in the sessions
//! directory, or signs in a new session interactively.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use dialoguer::{Input, Password};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use slapper_bot::config::{FarmSettings, TelegramConfig};
use slapper_bot::driver::{self, AccountDriver};
use slapper_bot::store::AccountStore;
use slapper_bot::telegram::{TelegramBot, TelegramError};

/// Telegram mini-app clicker farm.
#[derive(Parser, Debug)]
#[command(name = "slapper")]
#[command(about = "Click, claim daily boosts and buy upgrades for every session")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Directory with `*.session` files (overrides SESSIONS_DIR).
    #[arg(short, long)]
    sessions_dir: Option<PathBuf>,

    /// Sign in a new session with this name and exit.
    #[arg(long, value_name = "NAME")]
    add_session: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Load configurations
    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let mut settings = FarmSettings::from_env_with_defaults()
        .context("Invalid farm settings in environment")?;
    if let Some(dir) = args.sessions_dir {
        settings.sessions_dir = dir;
    }
    settings
        .validate()
        .context("Farm settings validation failed")?;

    if let Some(name) = args.add_session {
        return add_session(&tg_config, &settings, &name).await;
    }

    let sessions = driver::discover_sessions(&settings.sessions_dir).with_context(|| {
        format!(
            "Failed to read sessions directory {}",
            settings.sessions_dir.display()
        )
    })?;

    if sessions.is_empty() {
        bail!(
            "No session files in {}. Create one with: slapper --add-session NAME",
            settings.sessions_dir.display()
        );
    }

    let store = Arc::new(
        AccountStore::open(&settings.accounts_path, &settings.status_log_path)
            .context("Failed to open account store")?,
    );

    info!("Detected {} sessions | {} accounts in store", sessions.len(), store.len().await);

    let settings = Arc::new(settings);
    let drivers: Vec<AccountDriver> = sessions
        .into_iter()
        .map(|(name, path)| {
            AccountDriver::new(
                &name,
                path,
                tg_config.clone(),
                Arc::clone(&settings),
                Arc::clone(&store),
            )
        })
        .collect();

    info!("Bot is running. Use Ctrl+C to stop.");

    tokio::select! {
        summary = driver::run_all(drivers) => {
            info!(
                "All accounts done: {} finished, {} invalid sessions, {} failed",
                summary.finished, summary.invalid_sessions, summary.failed
            );
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Signs in a new session file interactively.
async fn add_session(config: &TelegramConfig, settings: &FarmSettings, name: &str) -> Result<()> {
    std::fs::create_dir_all(&settings.sessions_dir).with_context(|| {
        format!(
            "Failed to create sessions directory {}",
            settings.sessions_dir.display()
        )
    })?;

    let path = driver::session_path(&settings.sessions_dir, name);
    let bot = TelegramBot::connect(config, &path, None)
        .await
        .context("Failed to connect to Telegram")?;

    if bot.is_authorized().await.context("Failed to check authorization")? {
        warn!("Session {} is already signed in", path.display());
    } else {
        authenticate(&bot, config).await?;
        info!("Session saved to {}", path.display());
    }

    bot.disconnect();
    Ok(())
}

/// Handles Telegram authentication.
async fn authenticate(bot: &TelegramBot, config: &TelegramConfig) -> Result<()> {
    info!("Authentication required");

    let phone: String = Input::new()
        .with_prompt("Enter your phone number (with country code)")
        .interact_text()?;

    let token = bot
        .request_login_code(&phone, &config.api_hash)
        .await
        .context("Failed to request login code")?;

    info!("Login code sent to your Telegram app");

    let code: String = Input::new()
        .with_prompt("Enter the login code")
        .interact_text()?;

    match bot.sign_in(&token, &code).await {
        Ok(()) => {
            info!("Successfully signed in!");
            Ok(())
        }
        Err(TelegramError::PasswordRequired(password_token)) => {
            info!("Two-factor authentication is enabled");

            let hint = password_token.hint().unwrap_or("no hint");
            info!("Password hint: {}", hint);

            let password: String = Password::new()
                .with_prompt("Enter your 2FA password")
                .interact()?;

            bot.check_password(password_token, &password)
                .await
                .context("2FA authentication failed")?;

            info!("Successfully signed in with 2FA!");
            Ok(())
        }
        Err(e) => Err(e).context("Authentication failed"),
    }
}
