//! Remote game client module.
//!
//! Typed access to the clicker game's HTTP API: login, profile, boost
//! catalogs, click submission and boost purchases.

mod client;
mod types;

pub use client::{
    ApiError, CLICK_BACKDATE_SECS, GameApi, PROXY_PROBE_URL, RemoteGameClient, start_timestamp,
};
pub use types::{
    BoostCatalog, CatalogEntry, ClickResult, DAILY_BOOST_ORDER, DailyBoosts, FreeBoost,
    ProfileSnapshot, RawBoostEntry, UPGRADE_CATALOG_ORDER, UpgradableBoost,
};
