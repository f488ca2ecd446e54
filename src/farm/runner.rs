//! Click loop for one account.
//!
//! Each iteration:
//! 1. Log in if there is no token or it expired (profile is refreshed only
//!    here)
//! 2. Submit a random click batch
//! 3. Fetch daily boosts and the upgrade catalog
//! 4. While turbo is active, skip the decision and clear turbo after the
//!    idle delay
//! 5. Otherwise run the decision chain: claim, upgrade, exhausted or idle
//!
//! Game API failures are logged and retried on the next iteration. Only an
//! invalid Telegram session ends the loop with an error.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{error, info, warn};

use super::AccountSession;
use super::policy::{Decision, Telemetry, click_batch, decide};
use crate::config::{ExhaustedAction, FarmSettings};
use crate::game::{CatalogEntry, FreeBoost, GameApi, UpgradableBoost};
use crate::store::{AccountStore, StatusRecord};
use crate::telegram::InitDataSource;

/// Errors that end an account's loop.
#[derive(Debug, Error)]
pub enum FarmError {
    #[error("Invalid session: {0}")]
    InvalidSession(String),
}

/// What one iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Login or telemetry failed; the recovery delay was taken.
    Recovered,
    /// The batch was rejected; the idle delay was taken.
    ClicksFailed,
    /// A turbo batch was submitted and turbo cleared.
    TurboBatch,
    Claimed { boost: FreeBoost, success: bool },
    Upgraded { boost: UpgradableBoost, success: bool },
    /// Energy ran out and the long sleep was taken.
    Exhausted { energy: u64 },
    /// Nothing to do; the idle delay was taken.
    Idle,
    /// Energy ran out and the loop should end.
    Stopped,
}

/// Outcome of the login check at the top of an iteration.
#[derive(Debug, Clone, Copy)]
enum Login {
    Ready,
    /// Login failed softly; wait this long before the next iteration.
    Retry(Duration),
}

/// Drives one account until it runs out of energy (when configured to
/// stop) or its session becomes invalid.
pub struct ClickLoop<G, S> {
    account: String,
    api: G,
    init_source: S,
    settings: Arc<FarmSettings>,
    session: AccountSession,
    /// Init payload obtained before the loop started, used for the first
    /// login.
    pending_init_data: Option<String>,
    store: Option<Arc<AccountStore>>,
    rng: StdRng,
}

impl<G: GameApi, S: InitDataSource> ClickLoop<G, S> {
    #[must_use]
    pub fn new(account: &str, api: G, init_source: S, settings: Arc<FarmSettings>) -> Self {
        Self {
            account: account.to_owned(),
            api,
            init_source,
            settings,
            session: AccountSession::new(),
            pending_init_data: None,
            store: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Writes status rows to `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<AccountStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses `init_data` for the first login instead of asking the source.
    #[must_use]
    pub fn with_init_data(mut self, init_data: String) -> Self {
        self.pending_init_data = Some(init_data);
        self
    }

    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn session(&self) -> &AccountSession {
        &self.session
    }

    pub fn api(&self) -> &G {
        &self.api
    }

    /// Runs iterations until the loop stops or the session is invalid.
    pub async fn run(&mut self) -> Result<(), FarmError> {
        info!("{} | Click loop started", self.account);

        loop {
            if self.step().await? == Step::Stopped {
                info!("{} | Out of energy, leaving this account", self.account);
                return Ok(());
            }
        }
    }

    /// Runs a single iteration, delays included.
    pub async fn step(&mut self) -> Result<Step, FarmError> {
        if let Login::Retry(delay) = self.ensure_logged_in().await? {
            self.pause(delay).await;
            return Ok(Step::Recovered);
        }

        let turbo_active = self.session.turbo_active;
        let amount = click_batch(
            &mut self.rng,
            &self.settings,
            turbo_active,
            self.session.click_multiplier,
        );

        let result = match self.api.submit_clicks(amount, turbo_active).await {
            Ok(result) => result,
            Err(e) => {
                error!("{} | Error when clicking: {}", self.account, e);
                self.sleep_between_batches().await;
                return Ok(Step::ClicksFailed);
            }
        };

        let delta = self.session.apply_clicks(&result);
        self.record("clicks", delta).await;

        let daily = self.api.fetch_daily_boosts().await;
        let catalog = match self.api.fetch_upgrade_catalog().await {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("{} | Error when getting upgradable boosts: {}", self.account, e);
                self.pause(self.settings.recovery_delay()).await;
                return Ok(Step::Recovered);
            }
        };

        info!(
            "{} | Successful clicks! | Balance: {} ({:+}) | Total: {}",
            self.account, self.session.balance, delta, result.total_earned_score
        );

        if turbo_active {
            self.idle().await;
            return Ok(Step::TurboBatch);
        }

        let telemetry = Telemetry {
            energy: result.energy_remaining,
            balance: self.session.balance,
            daily,
            catalog,
        };

        match decide(&telemetry, &self.settings) {
            Decision::Claim(boost) => Ok(self.claim(boost).await),
            Decision::Upgrade(entry) => Ok(self.upgrade(entry).await),
            Decision::Exhausted => Ok(self.exhausted(result.energy_remaining).await),
            Decision::Idle => {
                self.idle().await;
                Ok(Step::Idle)
            }
        }
    }

    /// Returns [`Login::Retry`] when login failed in a way worth retrying.
    async fn ensure_logged_in(&mut self) -> Result<Login, FarmError> {
        let recovery = Login::Retry(self.settings.recovery_delay());
        if !self.session.needs_login(self.settings.token_lifetime()) {
            return Ok(Login::Ready);
        }

        let init_data = match self.pending_init_data.take() {
            Some(init_data) => init_data,
            None => match self.init_source.init_data().await {
                Ok(init_data) => init_data,
                Err(e) if e.is_invalid_session() => {
                    return Err(FarmError::InvalidSession(e.to_string()));
                }
                Err(e) => {
                    error!("{} | Unknown error during authorization: {}", self.account, e);
                    return Ok(match e.flood_wait() {
                        Some(wait) => Login::Retry(wait.max(self.settings.recovery_delay())),
                        None => recovery,
                    });
                }
            },
        };

        match self.api.authenticate(&init_data).await {
            Ok(token) => self.session.set_token(token),
            Err(e) => {
                error!("{} | Error while getting access token: {}", self.account, e);
                return Ok(recovery);
            }
        }

        match self.api.fetch_profile().await {
            Ok(profile) => {
                self.session.apply_profile(&profile);
                info!(
                    "{} | Balance: {} | Rank: {}",
                    self.account,
                    profile.score,
                    profile.rank.map_or_else(|| "-".to_owned(), |r| r.to_string())
                );
                info!(
                    "{} | Earned today: +{} | Earned this week: +{}",
                    self.account, profile.earned_today, profile.earned_this_week
                );
                Ok(Login::Ready)
            }
            Err(e) => {
                error!("{} | Error while getting profile data: {}", self.account, e);
                self.session.invalidate_token();
                Ok(recovery)
            }
        }
    }

    async fn claim(&mut self, boost: FreeBoost) -> Step {
        let settle = self.settings.settle_delay();
        info!(
            "{} | Sleep {}s before activating the daily {} boost",
            self.account,
            settle.as_secs(),
            boost
        );
        self.pause(settle).await;

        let success = match self.api.claim_free_boost(boost).await {
            Ok(()) => {
                info!("{} | {} boost applied", self.account, capitalize(&boost.to_string()));
                self.record(&format!("boost:{}", boost.wire_name()), 1).await;
                if boost == FreeBoost::Turbo {
                    self.session.turbo_active = true;
                }
                self.pause(settle).await;
                true
            }
            Err(e) => {
                error!("{} | Error when applying {} boost: {}", self.account, boost, e);
                self.pause(self.settings.recovery_delay()).await;
                false
            }
        };

        Step::Claimed { boost, success }
    }

    async fn upgrade(&mut self, entry: CatalogEntry) -> Step {
        let settle = self.settings.settle_delay();
        info!(
            "{} | Sleep {}s before upgrading {} to level {}",
            self.account,
            settle.as_secs(),
            entry.kind,
            entry.level
        );
        self.pause(settle).await;

        let success = match self.api.purchase_upgrade(entry.kind).await {
            Ok(()) => {
                info!(
                    "{} | {} upgraded to level {}",
                    self.account,
                    capitalize(&entry.kind.to_string()),
                    entry.level
                );
                self.record(
                    &format!("upgrade:{}", entry.kind.wire_name()),
                    i64::from(entry.level),
                )
                .await;
                self.pause(settle).await;
                true
            }
            Err(e) => {
                error!("{} | Error when upgrading {}: {}", self.account, entry.kind, e);
                self.pause(self.settings.recovery_delay()).await;
                false
            }
        };

        Step::Upgraded {
            boost: entry.kind,
            success,
        }
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn exhausted(&mut self, energy: u64) -> Step {
        info!("{} | Minimum energy reached: {}", self.account, energy);
        self.record("exhausted", energy as i64).await;

        match self.settings.on_exhausted {
            ExhaustedAction::Sleep => {
                let delay = self.settings.exhausted_delay();
                info!("{} | Sleep {}s", self.account, delay.as_secs());
                self.pause(delay).await;
                Step::Exhausted { energy }
            }
            ExhaustedAction::Stop => Step::Stopped,
        }
    }

    /// Standard pause after a batch; ends a turbo window.
    async fn idle(&mut self) {
        self.session.turbo_active = false;
        self.sleep_between_batches().await;
    }

    async fn sleep_between_batches(&mut self) {
        let secs = self.settings.sleep_between_clicks.sample(&mut self.rng);
        info!("{} | Sleep {}s", self.account, secs);
        self.pause(Duration::from_secs(secs)).await;
    }

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn record(&self, status: &str, amount: i64) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store
            .append_status(&StatusRecord::new(&self.account, status, amount))
            .await
        {
            warn!("{} | Failed to write status log: {}", self.account, e);
        }
    }
}

impl<G, S> std::fmt::Debug for ClickLoop<G, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickLoop")
            .field("account", &self.account)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::config::SampleRange;
    use crate::game::{
        ApiError, BoostCatalog, ClickResult, DailyBoosts, ProfileSnapshot,
    };
    use crate::telegram::TelegramError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Authenticate(String),
        Profile,
        Daily,
        Catalog,
        Clicks { amount: u64, turbo: bool },
        Claim(FreeBoost),
        Upgrade(UpgradableBoost),
    }

    struct MockGame {
        calls: Mutex<Vec<Call>>,
        score: Mutex<u64>,
        multiplier: u64,
        energy_left: u64,
        daily: DailyBoosts,
        catalog: BoostCatalog,
        fail_clicks: AtomicBool,
        fail_catalog: bool,
    }

    impl MockGame {
        fn new(score: u64, energy_left: u64, catalog: BoostCatalog) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                score: Mutex::new(score),
                multiplier: 1,
                energy_left,
                daily: DailyBoosts::default(),
                catalog,
                fail_clicks: AtomicBool::new(false),
                fail_catalog: false,
            }
        }

        fn push(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
            self.calls().iter().filter(|c| matches(*c)).count()
        }
    }

    #[async_trait]
    impl GameApi for MockGame {
        async fn authenticate(&mut self, init_data: &str) -> Result<String, ApiError> {
            self.push(Call::Authenticate(init_data.to_owned()));
            Ok(format!("token-for-{init_data}"))
        }

        async fn fetch_profile(&self) -> Result<ProfileSnapshot, ApiError> {
            self.push(Call::Profile);
            Ok(ProfileSnapshot {
                score: *self.score.lock().unwrap(),
                click_multiplier: self.multiplier,
                earned_today: 0,
                earned_this_week: 0,
                rank: Some(1),
            })
        }

        async fn fetch_daily_boosts(&self) -> DailyBoosts {
            self.push(Call::Daily);
            self.daily
        }

        async fn fetch_upgrade_catalog(&self) -> Result<BoostCatalog, ApiError> {
            self.push(Call::Catalog);
            if self.fail_catalog {
                return Err(ApiError::Decode {
                    endpoint: "/game/available-boosts",
                    reason: "boom".to_owned(),
                });
            }
            Ok(self.catalog)
        }

        async fn submit_clicks(
            &self,
            amount: u64,
            turbo_active: bool,
        ) -> Result<ClickResult, ApiError> {
            self.push(Call::Clicks {
                amount,
                turbo: turbo_active,
            });
            if self.fail_clicks.load(Ordering::SeqCst) {
                return Err(ApiError::Status {
                    endpoint: "/game/save-clicks",
                    status: 500,
                    body: String::new(),
                });
            }
            let mut score = self.score.lock().unwrap();
            *score += amount;
            Ok(ClickResult {
                energy_remaining: self.energy_left,
                new_score: *score,
                total_earned_score: *score,
            })
        }

        async fn claim_free_boost(&self, kind: FreeBoost) -> Result<(), ApiError> {
            self.push(Call::Claim(kind));
            Ok(())
        }

        async fn purchase_upgrade(&self, kind: UpgradableBoost) -> Result<(), ApiError> {
            self.push(Call::Upgrade(kind));
            Ok(())
        }
    }

    #[derive(Clone, Copy)]
    enum SourceMode {
        Ok,
        Invalid,
        Offline,
        FloodWait(u32),
    }

    struct MockSource {
        mode: SourceMode,
        calls: usize,
    }

    impl MockSource {
        fn new(mode: SourceMode) -> Self {
            Self { mode, calls: 0 }
        }
    }

    #[async_trait]
    impl InitDataSource for MockSource {
        async fn init_data(&mut self) -> Result<String, TelegramError> {
            self.calls += 1;
            match self.mode {
                SourceMode::Ok => Ok(format!("init-{}", self.calls)),
                SourceMode::Invalid => {
                    Err(TelegramError::InvalidSession("AUTH_KEY_UNREGISTERED".to_owned()))
                }
                SourceMode::Offline => Err(TelegramError::Connection("offline".to_owned())),
                SourceMode::FloodWait(seconds) => Err(TelegramError::FloodWait(seconds)),
            }
        }
    }

    fn entry(kind: UpgradableBoost, level: u32, price: u64) -> CatalogEntry {
        CatalogEntry { kind, level, price }
    }

    fn catalog(click: (u32, u64)) -> BoostCatalog {
        BoostCatalog {
            click_power: entry(UpgradableBoost::ClickPower, click.0, click.1),
            max_energy: entry(UpgradableBoost::MaxEnergy, 1, u64::MAX),
            recharge_rate: entry(UpgradableBoost::RechargeRate, 1, u64::MAX),
        }
    }

    fn settings() -> FarmSettings {
        FarmSettings {
            random_clicks: SampleRange::new(10, 20),
            turbo_bonus: 100,
            max_click_level: 10,
            ..FarmSettings::default()
        }
    }

    fn click_loop(
        game: MockGame,
        mode: SourceMode,
        settings: FarmSettings,
    ) -> ClickLoop<MockGame, MockSource> {
        ClickLoop::new("test", game, MockSource::new(mode), Arc::new(settings))
            .with_rng(StdRng::seed_from_u64(1))
    }

    fn is_clicks(call: &Call) -> bool {
        matches!(call, Call::Clicks { .. })
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_power_upgrade_scenario() {
        let game = MockGame::new(1000, 5000, catalog((3, 900)));
        let mut farm = click_loop(game, SourceMode::Ok, settings());

        let step = farm.step().await.unwrap();

        assert_eq!(
            step,
            Step::Upgraded {
                boost: UpgradableBoost::ClickPower,
                success: true
            }
        );
        assert_eq!(farm.api().count(is_clicks), 1);
        assert_eq!(
            farm.api().count(|c| *c == Call::Upgrade(UpgradableBoost::ClickPower)),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_energy_claim_beats_turbo() {
        let mut game = MockGame::new(0, 10, catalog((1, u64::MAX)));
        game.daily = DailyBoosts {
            turbo: 1,
            full_energy: 1,
        };
        let mut farm = click_loop(game, SourceMode::Ok, settings());

        let step = farm.step().await.unwrap();

        assert_eq!(
            step,
            Step::Claimed {
                boost: FreeBoost::FullEnergy,
                success: true
            }
        );
        assert_eq!(farm.api().count(|c| *c == Call::Claim(FreeBoost::Turbo)), 0);
        assert!(!farm.session().turbo_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_turbo_window_lasts_one_batch() {
        let mut game = MockGame::new(0, 5000, catalog((1, u64::MAX)));
        game.daily = DailyBoosts {
            turbo: 1,
            full_energy: 0,
        };
        let mut farm = click_loop(game, SourceMode::Ok, settings());

        assert_eq!(
            farm.step().await.unwrap(),
            Step::Claimed {
                boost: FreeBoost::Turbo,
                success: true
            }
        );
        assert!(farm.session().turbo_active);

        assert_eq!(farm.step().await.unwrap(), Step::TurboBatch);
        assert!(!farm.session().turbo_active);

        let clicks: Vec<_> = farm
            .api()
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Clicks { amount, turbo } => Some((amount, turbo)),
                _ => None,
            })
            .collect();
        assert_eq!(clicks.len(), 2);
        assert!(!clicks[0].1);
        assert!((10..=20).contains(&clicks[0].0));
        assert!(clicks[1].1);
        assert!((110..=120).contains(&clicks[1].0));

        // The turbo batch takes no decision even though turbo is still offered.
        assert_eq!(farm.api().count(|c| matches!(c, Call::Claim(_))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiplier_from_profile_scales_batches() {
        let mut game = MockGame::new(0, 5000, catalog((1, u64::MAX)));
        game.multiplier = 4;
        let mut farm = click_loop(game, SourceMode::Ok, settings());

        assert_eq!(farm.step().await.unwrap(), Step::Idle);
        let amount = farm
            .api()
            .calls()
            .into_iter()
            .find_map(|c| match c {
                Call::Clicks { amount, .. } => Some(amount),
                _ => None,
            })
            .unwrap();
        assert_eq!(amount % 4, 0);
        assert!((10..=20).contains(&(amount / 4)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_sleeps_by_default() {
        let game = MockGame::new(0, 10, catalog((1, u64::MAX)));
        let mut farm = click_loop(game, SourceMode::Ok, settings());

        assert_eq!(farm.step().await.unwrap(), Step::Exhausted { energy: 10 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_stop_ends_run() {
        let game = MockGame::new(0, 10, catalog((1, u64::MAX)));
        let settings = FarmSettings {
            on_exhausted: ExhaustedAction::Stop,
            ..settings()
        };
        let mut farm = click_loop(game, SourceMode::Ok, settings);

        farm.run().await.unwrap();
        assert_eq!(farm.api().count(is_clicks), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_session_is_fatal() {
        let game = MockGame::new(0, 5000, catalog((1, u64::MAX)));
        let mut farm = click_loop(game, SourceMode::Invalid, settings());

        assert!(matches!(farm.run().await, Err(FarmError::InvalidSession(_))));
        assert!(farm.api().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_auth_failure_recovers() {
        let game = MockGame::new(0, 5000, catalog((1, u64::MAX)));
        let mut farm = click_loop(game, SourceMode::Offline, settings());

        assert_eq!(farm.step().await.unwrap(), Step::Recovered);
        assert_eq!(farm.step().await.unwrap(), Step::Recovered);
        assert!(farm.api().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_clicks_skip_decisions() {
        let mut game = MockGame::new(0, 5000, catalog((1, 0)));
        game.fail_clicks.store(true, Ordering::SeqCst);
        let mut farm = click_loop(game, SourceMode::Ok, settings());

        assert_eq!(farm.step().await.unwrap(), Step::ClicksFailed);
        assert_eq!(farm.api().count(|c| *c == Call::Daily), 0);
        assert_eq!(farm.api().count(|c| matches!(c, Call::Upgrade(_))), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_clicks_keep_turbo_window() {
        let mut game = MockGame::new(0, 5000, catalog((1, u64::MAX)));
        game.daily = DailyBoosts {
            turbo: 1,
            full_energy: 0,
        };
        let mut farm = click_loop(game, SourceMode::Ok, settings());

        assert!(matches!(
            farm.step().await.unwrap(),
            Step::Claimed {
                boost: FreeBoost::Turbo,
                success: true
            }
        ));

        farm.api().fail_clicks.store(true, Ordering::SeqCst);
        assert_eq!(farm.step().await.unwrap(), Step::ClicksFailed);
        assert!(farm.session().turbo_active);

        farm.api().fail_clicks.store(false, Ordering::SeqCst);
        assert_eq!(farm.step().await.unwrap(), Step::TurboBatch);
        assert!(!farm.session().turbo_active);

        let turbo_flags: Vec<bool> = farm
            .api()
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Clicks { turbo, .. } => Some(turbo),
                _ => None,
            })
            .collect();
        assert_eq!(turbo_flags, vec![false, true, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_wait_delays_next_login() {
        let game = MockGame::new(0, 5000, catalog((1, u64::MAX)));
        let mut farm = click_loop(game, SourceMode::FloodWait(120), settings());

        let started = tokio::time::Instant::now();
        assert_eq!(farm.step().await.unwrap(), Step::Recovered);
        assert!(started.elapsed() >= Duration::from_secs(120));

        let game = MockGame::new(0, 5000, catalog((1, u64::MAX)));
        let mut farm = click_loop(game, SourceMode::Offline, settings());
        let started = tokio::time::Instant::now();
        farm.step().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_catalog_failure_recovers() {
        let mut game = MockGame::new(0, 5000, catalog((1, 0)));
        game.fail_catalog = true;
        let mut farm = click_loop(game, SourceMode::Ok, settings());

        assert_eq!(farm.step().await.unwrap(), Step::Recovered);
        assert_eq!(farm.api().count(|c| matches!(c, Call::Upgrade(_))), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_init_data_used_once_and_profile_not_refetched() {
        let game = MockGame::new(0, 5000, catalog((1, u64::MAX)));
        let mut farm = click_loop(game, SourceMode::Ok, settings())
            .with_init_data("seed".to_owned());

        for _ in 0..3 {
            assert_eq!(farm.step().await.unwrap(), Step::Idle);
        }

        assert_eq!(farm.api().calls()[0], Call::Authenticate("seed".to_owned()));
        assert_eq!(farm.api().count(|c| matches!(c, Call::Authenticate(_))), 1);
        assert_eq!(farm.api().count(|c| *c == Call::Profile), 1);
        assert_eq!(farm.session().auth_token.as_deref(), Some("token-for-seed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_renewed_after_lifetime() {
        let game = MockGame::new(0, 5000, catalog((1, u64::MAX)));
        let settings = FarmSettings {
            token_lifetime_secs: 30,
            sleep_between_clicks: SampleRange::new(20, 20),
            ..settings()
        };
        let mut farm = click_loop(game, SourceMode::Ok, settings);

        for _ in 0..3 {
            farm.step().await.unwrap();
        }

        let logins: Vec<_> = farm
            .api()
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Authenticate(_)))
            .collect();
        assert_eq!(
            logins,
            vec![
                Call::Authenticate("init-1".to_owned()),
                Call::Authenticate("init-2".to_owned())
            ]
        );
        assert_eq!(farm.api().count(|c| *c == Call::Profile), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_rows_written() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(
            AccountStore::open(dir.path().join("accounts.json"), dir.path().join("status.jsonl"))
                .unwrap(),
        );
        let game = MockGame::new(1000, 5000, catalog((3, 900)));
        let mut farm = click_loop(game, SourceMode::Ok, settings()).with_store(Arc::clone(&store));

        farm.step().await.unwrap();

        let rows = store.status_rows().await.unwrap();
        let statuses: Vec<_> = rows.iter().map(|r| r.status.as_str()).collect();
        assert_eq!(statuses, vec!["clicks", "upgrade:energy_per_tap"]);
        assert!(rows.iter().all(|r| r.account == "test"));
        assert!((10..=20).contains(&rows[0].amount));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("click power"), "Click power");
        assert_eq!(capitalize(""), "");
    }
}
