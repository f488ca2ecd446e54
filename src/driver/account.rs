//! Runs one account: proxy, user agent, web-app login, click loop.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{
    FarmSettings, GAME_API_BASE_URL, GAME_BOT_USERNAME, GAME_WEB_APP_URL, TelegramConfig,
};
use crate::farm::{ClickLoop, FarmError};
use crate::game::{ApiError, RemoteGameClient};
use crate::store::{AccountStore, StoreError};
use crate::telegram::{InitDataSource, WebAppAuthorizer};

/// User agents handed out to accounts that do not have one yet.
pub const ANDROID_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Linux; Android 13; SM-S918B Build/TP1A.220624.014; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/120.0.6099.144 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8 Build/UD1A.231105.004; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/121.0.6167.101 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 12; M2101K20G Build/SKQ1.211006.001; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/119.0.6045.193 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; CPH2449 Build/TP1A.220905.001; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/120.0.6099.210 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 11; moto g(30) Build/RRMS31.Q1-4-24-6; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/118.0.5993.111 Mobile Safari/537.36",
];

/// Errors that end an account run.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Farm(#[from] FarmError),

    #[error("Proxy {proxy} failed the connectivity check: {source}")]
    ProxyCheck {
        proxy: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to build game client: {0}")]
    Client(#[source] ApiError),

    #[error("Account store error: {0}")]
    Store(#[from] StoreError),
}

impl DriverError {
    /// Whether the Telegram session behind the account is unusable.
    #[must_use]
    pub const fn is_invalid_session(&self) -> bool {
        matches!(self, Self::Farm(FarmError::InvalidSession(_)))
    }
}

/// Everything needed to farm with one Telegram session.
#[derive(Debug)]
pub struct AccountDriver {
    account: String,
    session_path: PathBuf,
    telegram: TelegramConfig,
    settings: Arc<FarmSettings>,
    store: Arc<AccountStore>,
}

impl AccountDriver {
    #[must_use]
    pub fn new(
        account: &str,
        session_path: PathBuf,
        telegram: TelegramConfig,
        settings: Arc<FarmSettings>,
        store: Arc<AccountStore>,
    ) -> Self {
        Self {
            account: account.to_owned(),
            session_path,
            telegram,
            settings,
            store,
        }
    }

    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Runs the account until its loop ends or fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy check fails, the store cannot be
    /// updated, or the Telegram session is invalid.
    pub async fn run(self) -> Result<(), DriverError> {
        let proxy = if self.settings.use_proxy_from_store {
            self.store.proxy(&self.account).await
        } else {
            None
        };

        let user_agent = self
            .store
            .assign_user_agent(&self.account, ANDROID_USER_AGENTS)
            .await?;

        let client = RemoteGameClient::new(
            &self.account,
            GAME_API_BASE_URL,
            &user_agent,
            proxy.as_deref(),
        )
        .map_err(DriverError::Client)?;

        if let Some(proxy) = &proxy {
            match client.probe_proxy(self.settings.proxy_probe_timeout()).await {
                Ok(ip) => info!("{} | Proxy IP: {}", self.account, ip),
                Err(source) => {
                    return Err(DriverError::ProxyCheck {
                        proxy: mask_proxy(proxy),
                        source,
                    });
                }
            }
        }

        let mut authorizer = WebAppAuthorizer::new(
            &self.account,
            self.telegram.clone(),
            self.session_path.clone(),
            GAME_BOT_USERNAME,
            GAME_WEB_APP_URL,
        )
        .with_proxy(proxy.as_deref());

        let init_data = match authorizer.init_data().await {
            Ok(init_data) => Some(init_data),
            Err(e) if e.is_invalid_session() => {
                return Err(FarmError::InvalidSession(e.to_string()).into());
            }
            Err(e) => {
                warn!("{} | Could not open the web app yet: {}", self.account, e);
                None
            }
        };

        let mut farm = ClickLoop::new(
            &self.account,
            client,
            authorizer,
            Arc::clone(&self.settings),
        )
        .with_store(Arc::clone(&self.store));

        if let Some(init_data) = init_data {
            farm = farm.with_init_data(init_data);
        }

        farm.run().await?;
        Ok(())
    }
}

/// Hides proxy credentials for logging.
fn mask_proxy(proxy: &str) -> String {
    match (proxy.split_once("://"), proxy.rsplit_once('@')) {
        (Some((scheme, _)), Some((_, host))) => format!("{scheme}://***@{host}"),
        (None, Some((_, host))) => format!("***@{host}"),
        _ => proxy.to_owned(),
    }
}
