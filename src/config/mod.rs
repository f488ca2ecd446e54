//! Configuration module for the slapper bot.
//!
//! Handles loading and validation of the Telegram API credentials and
//! the farming settings shared by every account loop.

mod settings;

pub use settings::{ConfigError, ExhaustedAction, FarmSettings, SampleRange, TelegramConfig};

/// Bot that hosts the game web app.
pub const GAME_BOT_USERNAME: &str = "wormfare_slap_bot";

/// Web app URL requested from the bot.
pub const GAME_WEB_APP_URL: &str = "https://www.clicker.wormfare.com/";

/// Base URL of the game API.
pub const GAME_API_BASE_URL: &str = "https://api.clicker.wormfare.com";
