//! Application settings and Telegram configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Telegram API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(api_id: i32, api_hash: String) -> Self {
        Self { api_id, api_hash }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TG_API_ID` and `TG_API_HASH` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id: i32 = std::env::var("TG_API_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_ID"))?
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = std::env::var("TG_API_HASH")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_HASH"))?;

        Ok(Self { api_id, api_hash })
    }
}

/// Inclusive integer range sampled uniformly (`"lo,hi"` in the environment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRange {
    pub min: u64,
    pub max: u64,
}

impl SampleRange {
    #[must_use]
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Draws a value in `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.min >= self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

impl FromStr for SampleRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidRange(s.to_owned());
        let (lo, hi) = s
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split_once(',')
            .ok_or_else(invalid)?;
        let min = lo.trim().parse().map_err(|_| invalid())?;
        let max = hi.trim().parse().map_err(|_| invalid())?;
        Ok(Self { min, max })
    }
}

/// What to do when energy drops below the floor and nothing else applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustedAction {
    /// Sleep `sleep_by_min_energy` and keep farming.
    #[default]
    Sleep,
    /// End this account's run.
    Stop,
}

impl FromStr for ExhaustedAction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sleep" => Ok(Self::Sleep),
            "stop" | "break" => Ok(Self::Stop),
            other => Err(ConfigError::InvalidValue {
                key: "ON_EXHAUSTED",
                value: other.to_owned(),
            }),
        }
    }
}

/// Farming behaviour shared by every account loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmSettings {
    /// Directory containing `*.session` files, one per account.
    pub sessions_dir: PathBuf,

    /// JSON file with per-account proxies and user agents.
    pub accounts_path: PathBuf,

    /// JSON-lines status log.
    pub status_log_path: PathBuf,

    /// Read each account's proxy from the account store.
    pub use_proxy_from_store: bool,

    /// Clicks per batch before turbo bonus and multiplier.
    pub random_clicks: SampleRange,

    /// Extra clicks added to a batch while turbo is active.
    pub turbo_bonus: u64,

    /// Energy floor below which the energy boost is claimed.
    pub min_available_energy: u64,

    /// Seconds to sleep once energy is exhausted.
    pub sleep_by_min_energy_secs: u64,

    pub on_exhausted: ExhaustedAction,

    pub apply_daily_energy: bool,
    pub apply_daily_turbo: bool,

    pub auto_upgrade_click: bool,
    pub max_click_level: u32,

    pub auto_upgrade_energy: bool,
    pub max_energy_level: u32,

    pub auto_upgrade_charge: bool,
    pub max_charge_level: u32,

    /// Seconds between click batches.
    pub sleep_between_clicks: SampleRange,

    /// Pause around boost claims and purchases.
    pub settle_delay_secs: u64,

    /// Pause after a failed iteration.
    pub recovery_delay_secs: u64,

    /// Age after which the access token is renewed.
    pub token_lifetime_secs: u64,

    /// Timeout of the proxy connectivity probe.
    pub proxy_probe_timeout_secs: u64,
}

impl Default for FarmSettings {
    fn default() -> Self {
        Self {
            sessions_dir: PathBuf::from("sessions"),
            accounts_path: PathBuf::from("accounts.json"),
            status_log_path: PathBuf::from("status.jsonl"),
            use_proxy_from_store: false,
            random_clicks: SampleRange::new(50, 200),
            turbo_bonus: 2500,
            min_available_energy: 200,
            sleep_by_min_energy_secs: 1800,
            on_exhausted: ExhaustedAction::Sleep,
            apply_daily_energy: true,
            apply_daily_turbo: true,
            auto_upgrade_click: true,
            max_click_level: 5,
            auto_upgrade_energy: true,
            max_energy_level: 5,
            auto_upgrade_charge: true,
            max_charge_level: 5,
            sleep_between_clicks: SampleRange::new(10, 25),
            settle_delay_secs: 5,
            recovery_delay_secs: 7,
            token_lifetime_secs: 3600,
            proxy_probe_timeout_secs: 5,
        }
    }
}

impl FarmSettings {
    /// Creates farm settings from environment variables with defaults.
    ///
    /// Unset or empty variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env_with_defaults() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key/value source.
    ///
    /// # Errors
    ///
    /// Returns an error if a present value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        let path = |key: &str, default: PathBuf| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map_or(default, PathBuf::from)
        };

        Ok(Self {
            sessions_dir: path("SESSIONS_DIR", d.sessions_dir),
            accounts_path: path("ACCOUNTS_FILE", d.accounts_path),
            status_log_path: path("STATUS_LOG_FILE", d.status_log_path),
            use_proxy_from_store: env_value(
                &lookup,
                "USE_PROXY_FROM_STORE",
                d.use_proxy_from_store,
            )?,
            random_clicks: env_value(&lookup, "RANDOM_CLICKS_COUNT", d.random_clicks)?,
            turbo_bonus: env_value(&lookup, "ADD_CLICKS_ON_TURBO", d.turbo_bonus)?,
            min_available_energy: env_value(
                &lookup,
                "MIN_AVAILABLE_ENERGY",
                d.min_available_energy,
            )?,
            sleep_by_min_energy_secs: env_value(
                &lookup,
                "SLEEP_BY_MIN_ENERGY",
                d.sleep_by_min_energy_secs,
            )?,
            on_exhausted: env_value(&lookup, "ON_EXHAUSTED", d.on_exhausted)?,
            apply_daily_energy: env_value(&lookup, "APPLY_DAILY_ENERGY", d.apply_daily_energy)?,
            apply_daily_turbo: env_value(&lookup, "APPLY_DAILY_TURBO", d.apply_daily_turbo)?,
            auto_upgrade_click: env_value(&lookup, "AUTO_UPGRADE_CLICK", d.auto_upgrade_click)?,
            max_click_level: env_value(&lookup, "MAX_CLICK_LEVEL", d.max_click_level)?,
            auto_upgrade_energy: env_value(&lookup, "AUTO_UPGRADE_ENERGY", d.auto_upgrade_energy)?,
            max_energy_level: env_value(&lookup, "MAX_ENERGY_LEVEL", d.max_energy_level)?,
            auto_upgrade_charge: env_value(&lookup, "AUTO_UPGRADE_CHARGE", d.auto_upgrade_charge)?,
            max_charge_level: env_value(&lookup, "MAX_CHARGE_LEVEL", d.max_charge_level)?,
            sleep_between_clicks: env_value(
                &lookup,
                "SLEEP_BETWEEN_CLICKS",
                d.sleep_between_clicks,
            )?,
            settle_delay_secs: env_value(&lookup, "SETTLE_DELAY", d.settle_delay_secs)?,
            recovery_delay_secs: env_value(&lookup, "RECOVERY_DELAY", d.recovery_delay_secs)?,
            token_lifetime_secs: env_value(&lookup, "TOKEN_LIFETIME", d.token_lifetime_secs)?,
            proxy_probe_timeout_secs: env_value(
                &lookup,
                "PROXY_PROBE_TIMEOUT",
                d.proxy_probe_timeout_secs,
            )?,
        })
    }

    /// Checks the ranges and limits for consistency.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistent setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, range) in [
            ("RANDOM_CLICKS_COUNT", self.random_clicks),
            ("SLEEP_BETWEEN_CLICKS", self.sleep_between_clicks),
        ] {
            if range.min > range.max {
                return Err(ConfigError::InvertedRange {
                    key,
                    min: range.min,
                    max: range.max,
                });
            }
        }

        if self.random_clicks.max == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RANDOM_CLICKS_COUNT",
                value: "0,0".to_owned(),
            });
        }

        if self.token_lifetime_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TOKEN_LIFETIME",
                value: "0".to_owned(),
            });
        }

        Ok(())
    }

    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    #[must_use]
    pub const fn recovery_delay(&self) -> Duration {
        Duration::from_secs(self.recovery_delay_secs)
    }

    #[must_use]
    pub const fn exhausted_delay(&self) -> Duration {
        Duration::from_secs(self.sleep_by_min_energy_secs)
    }

    #[must_use]
    pub const fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_secs)
    }

    #[must_use]
    pub const fn proxy_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_probe_timeout_secs)
    }
}

/// Parses `key` from `lookup`, keeping `default` only when it is unset.
fn env_value<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            parse_env_value(&raw).ok_or(ConfigError::InvalidValue { key, value: raw })
        }
        _ => Ok(default),
    }
}

fn parse_env_value<T: FromStr>(raw: &str) -> Option<T> {
    let raw = raw.trim();
    // Accept the Python-style booleans people copy from other bots.
    let normalized = match raw {
        "True" | "TRUE" | "1" | "yes" => "true",
        "False" | "FALSE" | "0" | "no" => "false",
        other => other,
    };
    normalized.parse().ok().or_else(|| raw.parse().ok())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("Invalid range \"{0}\" (expected \"min,max\")")]
    InvalidRange(String),

    #[error("{key}: minimum {min} is greater than maximum {max}")]
    InvertedRange { key: &'static str, min: u64, max: u64 },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
