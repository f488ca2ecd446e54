//! Web-app init payload source backed by a Telegram session file.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{TelegramBot, TelegramError};
use crate::config::TelegramConfig;

/// Produces the init payload the game login expects.
#[async_trait]
pub trait InitDataSource: Send {
    async fn init_data(&mut self) -> Result<String, TelegramError>;
}

/// Connects with one account's session, opens the game web app and
/// disconnects again.
#[derive(Debug, Clone)]
pub struct WebAppAuthorizer {
    account: String,
    config: TelegramConfig,
    session_path: PathBuf,
    bot_username: String,
    web_app_url: String,
    proxy: Option<String>,
}

impl WebAppAuthorizer {
    #[must_use]
    pub fn new(
        account: &str,
        config: TelegramConfig,
        session_path: PathBuf,
        bot_username: &str,
        web_app_url: &str,
    ) -> Self {
        Self {
            account: account.to_owned(),
            config,
            session_path,
            bot_username: bot_username.to_owned(),
            web_app_url: web_app_url.to_owned(),
            proxy: None,
        }
    }

    /// Routes the MTProto connection through the account's proxy.
    ///
    /// Only SOCKS5 proxies can carry MTProto; anything else is skipped with
    /// a warning and Telegram is reached directly.
    #[must_use]
    pub fn with_proxy(mut self, proxy: Option<&str>) -> Self {
        self.proxy = proxy.and_then(|url| {
            let usable = mtproto_proxy(url);
            if usable.is_none() {
                warn!(
                    "{} | Proxy scheme is not SOCKS5, connecting to Telegram directly",
                    self.account
                );
            }
            usable
        });
        self
    }

    async fn fetch(&self, bot: &TelegramBot) -> Result<String, TelegramError> {
        if !bot.is_authorized().await? {
            return Err(TelegramError::InvalidSession(format!(
                "{} is not signed in",
                self.session_path.display()
            )));
        }

        bot.request_web_app_data(&self.bot_username, &self.web_app_url)
            .await
    }
}

#[async_trait]
impl InitDataSource for WebAppAuthorizer {
    async fn init_data(&mut self) -> Result<String, TelegramError> {
        let bot =
            TelegramBot::connect(&self.config, &self.session_path, self.proxy.as_deref()).await?;
        let result = self.fetch(&bot).await;
        bot.disconnect();

        if result.is_ok() {
            debug!("{} | Web app data received", self.account);
        }
        result
    }
}

/// Returns the proxy URL if MTProto can be tunnelled through it.
fn mtproto_proxy(url: &str) -> Option<String> {
    let (scheme, _) = url.split_once("://")?;
    matches!(scheme.to_ascii_lowercase().as_str(), "socks5" | "socks5h").then(|| url.to_owned())
}
