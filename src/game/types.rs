//! Wire types of the game API.
//!
//! The boost endpoints answer with bare JSON arrays whose meaning is
//! positional. Everything positional is translated here, through
//! [`DAILY_BOOST_ORDER`] and [`UPGRADE_CATALOG_ORDER`], so the rest of the
//! crate only sees named fields.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Daily boosts that can be claimed for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FreeBoost {
    #[serde(rename = "turbo")]
    Turbo,
    #[serde(rename = "full_energy")]
    FullEnergy,
}

impl FreeBoost {
    /// Name used by the API.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Turbo => "turbo",
            Self::FullEnergy => "full_energy",
        }
    }

    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "turbo" => Some(Self::Turbo),
            "full_energy" => Some(Self::FullEnergy),
            _ => None,
        }
    }
}

impl fmt::Display for FreeBoost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Turbo => write!(f, "turbo"),
            Self::FullEnergy => write!(f, "energy"),
        }
    }
}

/// Boosts bought with score; each has its own level and price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradableBoost {
    /// Score per click ("slap" level).
    #[serde(rename = "energy_per_tap")]
    ClickPower,
    #[serde(rename = "energy_max")]
    MaxEnergy,
    #[serde(rename = "energy_per_second")]
    RechargeRate,
}

impl UpgradableBoost {
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::ClickPower => "energy_per_tap",
            Self::MaxEnergy => "energy_max",
            Self::RechargeRate => "energy_per_second",
        }
    }

    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "energy_per_tap" => Some(Self::ClickPower),
            "energy_max" => Some(Self::MaxEnergy),
            "energy_per_second" => Some(Self::RechargeRate),
            _ => None,
        }
    }
}

impl fmt::Display for UpgradableBoost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClickPower => write!(f, "click power"),
            Self::MaxEnergy => write!(f, "max energy"),
            Self::RechargeRate => write!(f, "recharge rate"),
        }
    }
}

/// Position of each entry in `GET /game/daily-boosts`.
pub const DAILY_BOOST_ORDER: [FreeBoost; 2] = [FreeBoost::FullEnergy, FreeBoost::Turbo];

/// Position of each entry in `GET /game/available-boosts`.
pub const UPGRADE_CATALOG_ORDER: [UpgradableBoost; 3] = [
    UpgradableBoost::MaxEnergy,
    UpgradableBoost::RechargeRate,
    UpgradableBoost::ClickPower,
];

/// Result of `GET /user/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileSnapshot {
    pub score: u64,

    /// Score gained per click.
    #[serde(rename = "energyPerTap")]
    pub click_multiplier: u64,

    #[serde(rename = "earnedScoreToday", default)]
    pub earned_today: u64,

    #[serde(rename = "earnedScoreThisWeek", default)]
    pub earned_this_week: u64,

    #[serde(default)]
    pub rank: Option<u64>,
}

/// Result of `POST /game/save-clicks`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClickResult {
    #[serde(rename = "energyLeft")]
    pub energy_remaining: u64,

    #[serde(rename = "score")]
    pub new_score: u64,

    #[serde(rename = "totalEarnedScore", default)]
    pub total_earned_score: u64,
}

/// One element of either boost array, before it is given a name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBoostEntry {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub level: u32,

    #[serde(default)]
    pub price_in_score: u64,

    #[serde(default)]
    pub available_count: u32,
}

/// Free boosts still claimable today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyBoosts {
    pub turbo: u32,
    pub full_energy: u32,
}

impl DailyBoosts {
    /// Names the daily-boost array. An explicit `type` wins over position;
    /// missing entries count as unavailable.
    #[must_use]
    pub fn from_entries(entries: &[RawBoostEntry]) -> Self {
        let mut boosts = Self::default();
        for (index, entry) in entries.iter().enumerate() {
            let kind = entry
                .kind
                .as_deref()
                .and_then(FreeBoost::from_wire)
                .or_else(|| DAILY_BOOST_ORDER.get(index).copied());
            match kind {
                Some(FreeBoost::Turbo) => boosts.turbo = entry.available_count,
                Some(FreeBoost::FullEnergy) => boosts.full_energy = entry.available_count,
                None => {}
            }
        }
        boosts
    }

    #[must_use]
    pub const fn available(&self, kind: FreeBoost) -> u32 {
        match kind {
            FreeBoost::Turbo => self.turbo,
            FreeBoost::FullEnergy => self.full_energy,
        }
    }
}

/// Next level and its price for one upgradable boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind: UpgradableBoost,
    pub level: u32,
    pub price: u64,
}

/// The three upgrade tracks, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoostCatalog {
    pub click_power: CatalogEntry,
    pub max_energy: CatalogEntry,
    pub recharge_rate: CatalogEntry,
}

impl BoostCatalog {
    /// Names the upgrade array. Returns `None` unless all three tracks are
    /// present.
    #[must_use]
    pub fn from_entries(entries: &[RawBoostEntry]) -> Option<Self> {
        let mut click_power = None;
        let mut max_energy = None;
        let mut recharge_rate = None;

        for (index, raw) in entries.iter().enumerate() {
            let Some(kind) = raw
                .kind
                .as_deref()
                .and_then(UpgradableBoost::from_wire)
                .or_else(|| UPGRADE_CATALOG_ORDER.get(index).copied())
            else {
                continue;
            };
            let entry = CatalogEntry {
                kind,
                level: raw.level,
                price: raw.price_in_score,
            };
            match kind {
                UpgradableBoost::ClickPower => click_power = Some(entry),
                UpgradableBoost::MaxEnergy => max_energy = Some(entry),
                UpgradableBoost::RechargeRate => recharge_rate = Some(entry),
            }
        }

        Some(Self {
            click_power: click_power?,
            max_energy: max_energy?,
            recharge_rate: recharge_rate?,
        })
    }

    #[must_use]
    pub const fn entry(&self, kind: UpgradableBoost) -> CatalogEntry {
        match kind {
            UpgradableBoost::ClickPower => self.click_power,
            UpgradableBoost::MaxEnergy => self.max_energy,
            UpgradableBoost::RechargeRate => self.recharge_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(json: &str) -> Vec<RawBoostEntry> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_daily_boosts_positional() {
        let daily = DailyBoosts::from_entries(&entries(
            r#"[{"availableCount": 3}, {"availableCount": 1}]"#,
        ));
        assert_eq!(daily.full_energy, 3);
        assert_eq!(daily.turbo, 1);
    }

    #[test]
    fn test_daily_boosts_type_overrides_position() {
        let daily = DailyBoosts::from_entries(&entries(
            r#"[{"type": "turbo", "availableCount": 2}, {"type": "full_energy", "availableCount": 0}]"#,
        ));
        assert_eq!(daily.turbo, 2);
        assert_eq!(daily.full_energy, 0);
    }

    #[test]
    fn test_daily_boosts_missing_entries_are_zero() {
        assert_eq!(DailyBoosts::from_entries(&[]), DailyBoosts::default());
    }

    #[test]
    fn test_catalog_positional_mapping() {
        let catalog = BoostCatalog::from_entries(&entries(
            r#"[
                {"level": 2, "priceInScore": 500},
                {"level": 4, "priceInScore": 700},
                {"level": 3, "priceInScore": 900}
            ]"#,
        ))
        .unwrap();

        assert_eq!(catalog.max_energy.level, 2);
        assert_eq!(catalog.max_energy.price, 500);
        assert_eq!(catalog.recharge_rate.level, 4);
        assert_eq!(catalog.recharge_rate.price, 700);
        assert_eq!(catalog.click_power.level, 3);
        assert_eq!(catalog.entry(UpgradableBoost::ClickPower).price, 900);
    }

    #[test]
    fn test_catalog_named_entries_in_any_order() {
        let catalog = BoostCatalog::from_entries(&entries(
            r#"[
                {"type": "energy_per_tap", "level": 7, "priceInScore": 10},
                {"type": "energy_max", "level": 1, "priceInScore": 20},
                {"type": "energy_per_second", "level": 5, "priceInScore": 30}
            ]"#,
        ))
        .unwrap();

        assert_eq!(catalog.click_power.level, 7);
        assert_eq!(catalog.max_energy.price, 20);
        assert_eq!(catalog.recharge_rate.kind, UpgradableBoost::RechargeRate);
    }

    #[test]
    fn test_catalog_incomplete() {
        let partial = entries(r#"[{"level": 1, "priceInScore": 1}]"#);
        assert!(BoostCatalog::from_entries(&partial).is_none());
    }

    #[test]
    fn test_profile_deserialize() {
        let profile: ProfileSnapshot = serde_json::from_str(
            r#"{"score": 1500, "energyPerTap": 3, "earnedScoreToday": 40,
                "earnedScoreThisWeek": 90, "rank": 12, "nickname": "x"}"#,
        )
        .unwrap();
        assert_eq!(profile.score, 1500);
        assert_eq!(profile.click_multiplier, 3);
        assert_eq!(profile.earned_this_week, 90);
        assert_eq!(profile.rank, Some(12));
    }

    #[test]
    fn test_wire_names_round_trip() {
        for kind in UPGRADE_CATALOG_ORDER {
            assert_eq!(UpgradableBoost::from_wire(kind.wire_name()), Some(kind));
        }
        for kind in DAILY_BOOST_ORDER {
            assert_eq!(FreeBoost::from_wire(kind.wire_name()), Some(kind));
        }
        assert_eq!(
            serde_json::to_string(&FreeBoost::FullEnergy).unwrap(),
            "\"full_energy\""
        );
    }
}
