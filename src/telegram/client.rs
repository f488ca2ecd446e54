//! Telegram client wrapper for web-app authorization.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use grammers_client::client::{LoginToken, PasswordToken};
use grammers_client::{Client, InvocationError, SenderPool, SignInError, sender};
use grammers_session::storages::SqliteSession;
use grammers_tl_types as tl;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::TelegramConfig;

/// Re-export types for external use.
pub use grammers_client::client::{LoginToken as Token, PasswordToken as PwdToken};

/// RPC errors meaning the session can never be used again.
const INVALID_SESSION_ERRORS: &[&str] = &[
    "AUTH_KEY_UNREGISTERED",
    "AUTH_KEY_INVALID",
    "AUTH_KEY_DUPLICATED",
    "SESSION_REVOKED",
    "SESSION_EXPIRED",
    "USER_DEACTIVATED",
    "USER_DEACTIVATED_BAN",
];

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Not authorized. Please sign in first.")]
    NotAuthorized,

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Password required for 2FA")]
    PasswordRequired(PasswordToken),

    #[error("Invalid password")]
    InvalidPassword(PasswordToken),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Bot @{0} could not be resolved")]
    BotNotFound(String),

    #[error("Web app URL has no usable init data: {0}")]
    WebAppData(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl TelegramError {
    /// Whether retrying with the same session is pointless.
    #[must_use]
    pub const fn is_invalid_session(&self) -> bool {
        matches!(self, Self::InvalidSession(_) | Self::NotAuthorized)
    }

    /// How long Telegram asked us to back off, if it did.
    #[must_use]
    pub fn flood_wait(&self) -> Option<Duration> {
        match self {
            Self::FloodWait(seconds) => Some(Duration::from_secs(u64::from(*seconds))),
            _ => None,
        }
    }
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        let err_str = err.to_string();

        if is_invalid_session_error(&err_str) {
            return Self::InvalidSession(err_str);
        }

        // Check for flood wait errors
        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str)
        {
            return Self::FloodWait(seconds);
        }

        Self::Invocation(err_str)
    }
}

fn is_invalid_session_error(err_msg: &str) -> bool {
    INVALID_SESSION_ERRORS
        .iter()
        .any(|name| err_msg.contains(name))
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "flood wait "];

    for pattern in patterns {
        if let Some(idx) = err_msg.to_lowercase().find(&pattern.to_lowercase()) {
            let start = idx + pattern.len();
            let num_str: String = err_msg[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// Pulls the init payload out of a web-view URL.
///
/// The payload sits between `tgWebAppData=` and `&tgWebAppVersion` and is
/// percent-encoded twice.
///
/// # Errors
///
/// Returns an error if the marker is missing or the payload is not UTF-8.
pub fn extract_web_app_data(url: &str) -> Result<String, TelegramError> {
    let (_, rest) = url
        .split_once("tgWebAppData=")
        .ok_or_else(|| TelegramError::WebAppData("missing tgWebAppData".to_owned()))?;
    let raw = rest
        .split_once("&tgWebAppVersion")
        .map_or(rest, |(data, _)| data);

    let once = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|e| TelegramError::WebAppData(e.to_string()))?;
    let twice = percent_decode_str(&once)
        .decode_utf8()
        .map_err(|e| TelegramError::WebAppData(e.to_string()))?;

    if twice.is_empty() {
        return Err(TelegramError::WebAppData("empty tgWebAppData".to_owned()));
    }

    Ok(twice.into_owned())
}

/// High-level Telegram client wrapper.
pub struct TelegramBot {
    /// The underlying grammers client.
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects to Telegram using the session stored at `session_path`,
    /// optionally through a SOCKS5 `proxy` URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened or the connection
    /// fails.
    pub async fn connect(
        config: &TelegramConfig,
        session_path: &Path,
        proxy: Option<&str>,
    ) -> Result<Self, TelegramError> {
        debug!("Connecting to Telegram with {}...", session_path.display());

        let session = Arc::new(
            SqliteSession::open(session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates: _updates,
            handle,
        } = SenderPool::with_configuration(
            Arc::clone(&session),
            config.api_id,
            sender::ConnectionParams {
                proxy_url: proxy.map(str::to_owned),
                ..sender::ConnectionParams::default()
            },
        );

        let client = Client::new(handle.clone());

        // Spawn the sender pool runner
        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        Ok(Self {
            client,
            handle: handle.thin,
            _pool_task: pool_task,
        })
    }

    /// Checks if the client is authorized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check fails.
    pub async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client.is_authorized().await.map_err(|e| {
            let err: TelegramError = e.into();
            match err {
                TelegramError::InvalidSession(_) => err,
                other => TelegramError::Connection(other.to_string()),
            }
        })
    }

    /// Requests a login code to be sent to the phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn request_login_code(
        &self,
        phone: &str,
        api_hash: &str,
    ) -> Result<LoginToken, TelegramError> {
        info!("Requesting login code for phone: {}...", mask_phone(phone));

        self.client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| TelegramError::SignInFailed(e.to_string()))
    }

    /// Signs in with the login code.
    ///
    /// # Errors
    ///
    /// Returns an error if sign in fails.
    pub async fn sign_in(&self, token: &LoginToken, code: &str) -> Result<(), TelegramError> {
        info!("Signing in with login code...");

        match self.client.sign_in(token, code).await {
            Ok(_user) => Ok(()),
            Err(SignInError::PasswordRequired(password_token)) => {
                debug!("2FA password required, hint: {:?}", password_token.hint());
                Err(TelegramError::PasswordRequired(password_token))
            }
            Err(SignInError::InvalidCode) => {
                Err(TelegramError::SignInFailed("Invalid code".to_owned()))
            }
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Checks the 2FA password.
    ///
    /// # Errors
    ///
    /// Returns an error if the password is invalid.
    pub async fn check_password(
        &self,
        password_token: PasswordToken,
        password: &str,
    ) -> Result<(), TelegramError> {
        info!("Checking 2FA password...");

        match self.client.check_password(password_token, password).await {
            Ok(_user) => Ok(()),
            Err(SignInError::InvalidPassword(token)) => Err(TelegramError::InvalidPassword(token)),
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Opens the bot's web app and returns its init payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the bot cannot be resolved, the web view request
    /// fails, or the returned URL carries no payload.
    pub async fn request_web_app_data(
        &self,
        bot_username: &str,
        web_app_url: &str,
    ) -> Result<String, TelegramError> {
        let (peer, bot) = self.resolve_bot(bot_username).await?;

        let request = tl::functions::messages::RequestWebView {
            from_bot_menu: false,
            silent: false,
            compact: false,
            fullscreen: false,
            peer,
            bot,
            url: Some(web_app_url.to_owned()),
            start_param: None,
            theme_params: None,
            platform: "android".to_owned(),
            reply_to: None,
            send_as: None,
        };

        let tl::enums::WebViewResult::Url(result) = self.client.invoke(&request).await?;
        debug!("Web view opened for @{}", bot_username);

        extract_web_app_data(&result.url)
    }

    /// Resolves a bot username into the input peer and input user the web
    /// view request expects.
    async fn resolve_bot(
        &self,
        username: &str,
    ) -> Result<(tl::enums::InputPeer, tl::enums::InputUser), TelegramError> {
        let request = tl::functions::contacts::ResolveUsername {
            username: username.to_owned(),
            referer: None,
        };

        let tl::enums::contacts::ResolvedPeer::Peer(resolved) =
            self.client.invoke(&request).await?;

        let tl::enums::Peer::User(peer_user) = resolved.peer else {
            return Err(TelegramError::BotNotFound(username.to_owned()));
        };

        let user = resolved
            .users
            .into_iter()
            .find_map(|user| match user {
                tl::enums::User::User(user) if user.id == peer_user.user_id => Some(user),
                _ => None,
            })
            .ok_or_else(|| TelegramError::BotNotFound(username.to_owned()))?;

        let access_hash = user.access_hash.unwrap_or_default();

        Ok((
            tl::enums::InputPeer::User(tl::types::InputPeerUser {
                user_id: user.id,
                access_hash,
            }),
            tl::enums::InputUser::User(tl::types::InputUser {
                user_id: user.id,
                access_hash,
            }),
        ))
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        debug!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot").finish_non_exhaustive()
    }
}

/// Masks a phone number for logging (shows last 4 digits).
fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 4 {
        format!("***{}", &digits[digits.len() - 4..])
    } else {
        "****".to_owned()
    }
}
