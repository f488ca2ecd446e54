//! Action policy: what to do after a click batch.
//!
//! The chain is evaluated in a fixed order and the first branch that
//! applies wins:
//! 1. free energy boost, when available and energy is below the floor
//! 2. free turbo boost, when available
//! 3. click power upgrade
//! 4. max energy upgrade
//! 5. recharge rate upgrade
//! 6. exhausted, when energy is below the floor
//! 7. otherwise idle until the next batch

use rand::Rng;

use crate::config::FarmSettings;
use crate::game::{BoostCatalog, CatalogEntry, DailyBoosts, FreeBoost, UpgradableBoost};

/// Remote state observed right after a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Telemetry {
    pub energy: u64,
    pub balance: u64,
    pub daily: DailyBoosts,
    pub catalog: BoostCatalog,
}

/// The single action chosen for this iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Claim(FreeBoost),
    Upgrade(CatalogEntry),
    Exhausted,
    Idle,
}

/// Runs the decision chain.
#[must_use]
pub fn decide(telemetry: &Telemetry, settings: &FarmSettings) -> Decision {
    let low_energy = telemetry.energy < settings.min_available_energy;

    let daily = &telemetry.daily;
    if daily.available(FreeBoost::FullEnergy) > 0 && low_energy && settings.apply_daily_energy {
        return Decision::Claim(FreeBoost::FullEnergy);
    }

    if daily.available(FreeBoost::Turbo) > 0 && settings.apply_daily_turbo {
        return Decision::Claim(FreeBoost::Turbo);
    }

    let tracks = [
        (
            UpgradableBoost::ClickPower,
            settings.auto_upgrade_click,
            settings.max_click_level,
        ),
        (
            UpgradableBoost::MaxEnergy,
            settings.auto_upgrade_energy,
            settings.max_energy_level,
        ),
        (
            UpgradableBoost::RechargeRate,
            settings.auto_upgrade_charge,
            settings.max_charge_level,
        ),
    ];

    for (kind, enabled, max_level) in tracks {
        let entry = telemetry.catalog.entry(kind);
        if can_upgrade(enabled, &entry, telemetry.balance, max_level) {
            return Decision::Upgrade(entry);
        }
    }

    if low_energy {
        return Decision::Exhausted;
    }

    Decision::Idle
}

/// Balance must strictly exceed the price; the level limit is inclusive.
fn can_upgrade(enabled: bool, entry: &CatalogEntry, balance: u64, max_level: u32) -> bool {
    enabled && balance > entry.price && entry.level <= max_level
}

/// Clicks to submit for a given random sample.
#[must_use]
pub const fn batch_size(sample: u64, turbo_active: bool, turbo_bonus: u64, multiplier: u64) -> u64 {
    let base = if turbo_active {
        sample.saturating_add(turbo_bonus)
    } else {
        sample
    };
    base.saturating_mul(multiplier)
}

/// Draws the next batch size.
pub fn click_batch<R: Rng + ?Sized>(
    rng: &mut R,
    settings: &FarmSettings,
    turbo_active: bool,
    multiplier: u64,
) -> u64 {
    let sample = settings.random_clicks.sample(rng);
    batch_size(sample, turbo_active, settings.turbo_bonus, multiplier.max(1))
}
