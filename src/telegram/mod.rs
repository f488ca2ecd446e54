//! Telegram client wrapper module.
//!
//! Provides the session handling needed to open the game's web app:
//! interactive sign-in for new sessions and extraction of the web-app
//! init payload for existing ones.

mod client;
mod web_app;

pub use client::{
    PwdToken as PasswordToken, TelegramBot, TelegramError, Token as LoginToken,
    extract_web_app_data,
};
pub use web_app::{InitDataSource, WebAppAuthorizer};
