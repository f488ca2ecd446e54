//! HTTP client for the game API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue, ORIGIN, REFERER,
};
use reqwest::{Client, Proxy, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use super::types::{
    BoostCatalog, ClickResult, DailyBoosts, FreeBoost, ProfileSnapshot, RawBoostEntry,
    UpgradableBoost,
};

/// Seconds subtracted from "now" when stamping a click batch.
pub const CLICK_BACKDATE_SECS: f64 = 10.0;

/// Endpoint used to check which IP a proxy exits from.
pub const PROXY_PROBE_URL: &str = "https://httpbin.org/ip";

const WEB_APP_ORIGIN: &str = "https://www.clicker.wormfare.com";

/// Errors returned by the game API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Login rejected: {0}")]
    Auth(String),

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {endpoint}: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },

    #[error("Not logged in")]
    NoToken,

    #[error("Invalid proxy {proxy}: {reason}")]
    InvalidProxy { proxy: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Operations the click loop needs from the game.
#[async_trait]
pub trait GameApi: Send + Sync {
    /// Exchanges the web-app init payload for an access token and attaches
    /// it to every later request.
    async fn authenticate(&mut self, init_data: &str) -> Result<String, ApiError>;

    async fn fetch_profile(&self) -> Result<ProfileSnapshot, ApiError>;

    /// Never fails: errors are logged and reported as nothing available.
    async fn fetch_daily_boosts(&self) -> DailyBoosts;

    async fn fetch_upgrade_catalog(&self) -> Result<BoostCatalog, ApiError>;

    async fn submit_clicks(&self, amount: u64, turbo_active: bool)
    -> Result<ClickResult, ApiError>;

    async fn claim_free_boost(&self, kind: FreeBoost) -> Result<(), ApiError>;

    async fn purchase_upgrade(&self, kind: UpgradableBoost) -> Result<(), ApiError>;
}

/// Timestamp sent with a click batch: now, rounded to the millisecond and
/// backdated by [`CLICK_BACKDATE_SECS`], in milliseconds.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn start_timestamp(now: DateTime<Utc>) -> f64 {
    let seconds = (now.timestamp_micros() as f64 / 1000.0).round() / 1000.0;
    (seconds - CLICK_BACKDATE_SECS) * 1000.0
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeResponse {
    origin: Option<String>,
}

/// Game API client bound to one account's user agent and proxy.
pub struct RemoteGameClient {
    http: Client,
    base_url: String,
    account: String,
    access_token: Option<String>,
}

impl RemoteGameClient {
    /// Builds a client. `proxy` accepts `http://`, `https://` and
    /// `socks5://` URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is invalid or the TLS backend
    /// cannot be initialized.
    pub fn new(
        account: &str,
        base_url: &str,
        user_agent: &str,
        proxy: Option<&str>,
    ) -> Result<Self, ApiError> {
        let mut builder = Client::builder()
            .default_headers(default_headers())
            .user_agent(user_agent);

        if let Some(proxy_url) = proxy {
            let proxy = Proxy::all(proxy_url).map_err(|e| ApiError::InvalidProxy {
                proxy: proxy_url.to_owned(),
                reason: e.to_string(),
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_owned(),
            account: account.to_owned(),
            access_token: None,
        })
    }

    /// Returns the attached access token, if logged in.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Asks an IP echo service which address the proxy exits from.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe fails or does not finish within
    /// `timeout`.
    pub async fn probe_proxy(&self, timeout: Duration) -> Result<String, ApiError> {
        let response = self
            .http
            .get(PROXY_PROBE_URL)
            .timeout(timeout)
            .send()
            .await?;
        let probe: ProbeResponse = read_json("proxy probe", response).await?;
        Ok(probe.origin.unwrap_or_else(|| "unknown".to_owned()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self.access_token.as_deref().ok_or(ApiError::NoToken)?;
        Ok(request.bearer_auth(token))
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T, ApiError> {
        let request = self.authorized(self.http.get(self.url(endpoint)))?;
        read_json(endpoint, request.send().await?).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let request = self.authorized(self.http.post(self.url(endpoint)).json(body))?;
        read_json(endpoint, request.send().await?).await
    }

    async fn post_unit(
        &self,
        endpoint: &'static str,
        body: &serde_json::Value,
    ) -> Result<(), ApiError> {
        let request = self.authorized(self.http.post(self.url(endpoint)).json(body))?;
        check_status(endpoint, request.send().await?).await.map(drop)
    }
}

#[async_trait]
impl GameApi for RemoteGameClient {
    async fn authenticate(&mut self, init_data: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "initData": init_data }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Auth(e.to_string()))?;
        let token = login
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Auth("response has no accessToken".to_owned()))?;

        debug!("{} | Access token received", self.account);
        self.access_token = Some(token.clone());
        Ok(token)
    }

    async fn fetch_profile(&self) -> Result<ProfileSnapshot, ApiError> {
        self.get_json("/user/profile").await
    }

    async fn fetch_daily_boosts(&self) -> DailyBoosts {
        match self.get_json::<Vec<RawBoostEntry>>("/game/daily-boosts").await {
            Ok(entries) => DailyBoosts::from_entries(&entries),
            Err(e) => {
                error!("{} | Error when getting daily boosts: {}", self.account, e);
                DailyBoosts::default()
            }
        }
    }

    async fn fetch_upgrade_catalog(&self) -> Result<BoostCatalog, ApiError> {
        const ENDPOINT: &str = "/game/available-boosts";
        let entries: Vec<RawBoostEntry> = self.get_json(ENDPOINT).await?;
        BoostCatalog::from_entries(&entries).ok_or_else(|| ApiError::Decode {
            endpoint: ENDPOINT,
            reason: format!("expected 3 upgradable boosts, got {}", entries.len()),
        })
    }

    async fn submit_clicks(
        &self,
        amount: u64,
        turbo_active: bool,
    ) -> Result<ClickResult, ApiError> {
        let body = json!({
            "amount": amount,
            "isTurbo": turbo_active,
            "startTimestamp": start_timestamp(Utc::now()),
        });
        self.post_json("/game/save-clicks", &body).await
    }

    async fn claim_free_boost(&self, kind: FreeBoost) -> Result<(), ApiError> {
        self.post_unit("/game/activate-daily-boost", &json!({ "type": kind.wire_name() }))
            .await
    }

    async fn purchase_upgrade(&self, kind: UpgradableBoost) -> Result<(), ApiError> {
        self.post_unit("/game/buy-boost", &json!({ "type": kind.wire_name() }))
            .await
    }
}

impl std::fmt::Debug for RemoteGameClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteGameClient")
            .field("account", &self.account)
            .field("base_url", &self.base_url)
            .field("logged_in", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ORIGIN, HeaderValue::from_static(WEB_APP_ORIGIN));
    headers.insert(REFERER, HeaderValue::from_static("https://www.clicker.wormfare.com/"));
    headers
}

async fn check_status(endpoint: &'static str, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        endpoint,
        status: status.as_u16(),
        body: truncate_for_log(&body, 200),
    })
}

async fn read_json<T: DeserializeOwned>(
    endpoint: &'static str,
    response: Response,
) -> Result<T, ApiError> {
    let response = check_status(endpoint, response).await?;
    response.json().await.map_err(|e| ApiError::Decode {
        endpoint,
        reason: e.to_string(),
    })
}

/// Truncates a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_start_timestamp_backdates_ten_seconds() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let expected = (1_700_000_000.123_f64 - 10.0) * 1000.0;
        assert_eq!(start_timestamp(now).to_bits(), expected.to_bits());
    }

    #[test]
    fn test_start_timestamp_rounds_to_millis() {
        let now = Utc.timestamp_opt(1_700_000_000, 456_700_000).unwrap();
        let expected = (1_700_000_000.457_f64 - 10.0) * 1000.0;
        assert_eq!(start_timestamp(now).to_bits(), expected.to_bits());
    }

    #[test]
    fn test_client_requires_token() {
        let client =
            RemoteGameClient::new("acc", "https://example.invalid/", "test-agent", None).unwrap();
        assert!(client.access_token().is_none());
        assert_eq!(client.url("/user/profile"), "https://example.invalid/user/profile");
        assert!(matches!(
            client.authorized(client.http.get("https://example.invalid")),
            Err(ApiError::NoToken)
        ));
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let result = RemoteGameClient::new(
            "acc",
            "https://example.invalid",
            "ua",
            Some("http://proxy:99999"),
        );
        assert!(matches!(result, Err(ApiError::InvalidProxy { .. })));
    }

    #[tokio::test]
    async fn test_daily_boosts_soft_fail() {
        let client =
            RemoteGameClient::new("acc", "https://example.invalid", "test-agent", None).unwrap();
        assert_eq!(client.fetch_daily_boosts().await, DailyBoosts::default());
        assert!(matches!(
            client.fetch_upgrade_catalog().await,
            Err(ApiError::NoToken)
        ));
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("Hello", 10), "Hello");
        assert_eq!(truncate_for_log("Hello, World!", 5), "Hello...");
    }
}
