//! Per-account session cache.

use std::time::Duration;

use tokio::time::Instant;

use crate::game::{ClickResult, ProfileSnapshot};

/// Everything one loop remembers between iterations.
#[derive(Debug, Clone)]
pub struct AccountSession {
    /// Last access token returned by the login endpoint.
    pub auth_token: Option<String>,

    /// When `auth_token` was issued.
    token_issued_at: Option<Instant>,

    /// Score as last observed.
    pub balance: u64,

    /// Score per click, never below 1.
    pub click_multiplier: u64,

    /// Whether the next batch is submitted as a turbo batch.
    pub turbo_active: bool,
}

impl Default for AccountSession {
    fn default() -> Self {
        Self {
            auth_token: None,
            token_issued_at: None,
            balance: 0,
            click_multiplier: 1,
            turbo_active: false,
        }
    }
}

impl AccountSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there is no token or it is older than `lifetime`.
    #[must_use]
    pub fn needs_login(&self, lifetime: Duration) -> bool {
        match (&self.auth_token, self.token_issued_at) {
            (Some(_), Some(issued)) => issued.elapsed() >= lifetime,
            _ => true,
        }
    }

    pub fn set_token(&mut self, token: String) {
        self.auth_token = Some(token);
        self.token_issued_at = Some(Instant::now());
    }

    pub fn invalidate_token(&mut self) {
        self.auth_token = None;
        self.token_issued_at = None;
    }

    /// Copies balance and multiplier from a profile fetch.
    pub fn apply_profile(&mut self, profile: &ProfileSnapshot) {
        self.balance = profile.score;
        self.click_multiplier = profile.click_multiplier.max(1);
    }

    /// Records a click result and returns the balance change.
    #[allow(clippy::cast_possible_wrap)]
    pub fn apply_clicks(&mut self, result: &ClickResult) -> i64 {
        let delta = result.new_score as i64 - self.balance as i64;
        self.balance = result.new_score;
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(score: u64, multiplier: u64) -> ProfileSnapshot {
        ProfileSnapshot {
            score,
            click_multiplier: multiplier,
            earned_today: 0,
            earned_this_week: 0,
            rank: None,
        }
    }

    #[test]
    fn test_default_session() {
        let session = AccountSession::new();
        assert!(session.auth_token.is_none());
        assert_eq!(session.click_multiplier, 1);
        assert!(!session.turbo_active);
        assert!(session.needs_login(Duration::from_secs(3600)));
    }

    #[test]
    fn test_apply_profile_is_idempotent() {
        let mut session = AccountSession::new();
        let snapshot = profile(1234, 4);

        session.apply_profile(&snapshot);
        let (balance, multiplier) = (session.balance, session.click_multiplier);
        session.apply_profile(&snapshot);

        assert_eq!(session.balance, balance);
        assert_eq!(session.click_multiplier, multiplier);
        assert_eq!(balance, 1234);
    }

    #[test]
    fn test_multiplier_never_below_one() {
        let mut session = AccountSession::new();
        session.apply_profile(&profile(10, 0));
        assert_eq!(session.click_multiplier, 1);
    }

    #[test]
    fn test_apply_clicks_delta() {
        let mut session = AccountSession::new();
        session.apply_profile(&profile(100, 1));

        let gained = ClickResult {
            energy_remaining: 50,
            new_score: 160,
            total_earned_score: 500,
        };
        assert_eq!(session.apply_clicks(&gained), 60);
        assert_eq!(session.balance, 160);

        // A purchase elsewhere can leave the score lower than we remember.
        let spent = ClickResult {
            new_score: 40,
            ..gained
        };
        assert_eq!(session.apply_clicks(&spent), -120);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_expires() {
        let mut session = AccountSession::new();
        session.set_token("token".to_owned());
        assert!(!session.needs_login(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(session.needs_login(Duration::from_secs(60)));

        session.set_token("fresh".to_owned());
        session.invalidate_token();
        assert!(session.needs_login(Duration::from_secs(60)));
    }
}
