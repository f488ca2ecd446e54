//! Runs every discovered account concurrently.

use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use tracing::{error, info};

use super::AccountDriver;

/// Extension of Telegram session files.
pub const SESSION_EXTENSION: &str = "session";

/// Outcome counts of a launch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchSummary {
    pub finished: usize,
    pub invalid_sessions: usize,
    pub failed: usize,
}

/// Lists `(account name, path)` for every session file in `dir`, sorted by
/// name.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn discover_sessions(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut sessions = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(SESSION_EXTENSION)
        {
            continue;
        }
        if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
            sessions.push((name.to_owned(), path.clone()));
        }
    }

    sessions.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(sessions)
}

/// Path of the session file for `account`.
#[must_use]
pub fn session_path(dir: &Path, account: &str) -> PathBuf {
    dir.join(format!("{account}.{SESSION_EXTENSION}"))
}

/// Spawns one task per driver and waits for all of them.
pub async fn run_all(drivers: Vec<AccountDriver>) -> LaunchSummary {
    let mut tasks = JoinSet::new();
    for driver in drivers {
        tasks.spawn(async move {
            let account = driver.account().to_owned();
            let result = driver.run().await;
            (account, result)
        });
    }

    let mut summary = LaunchSummary::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((account, Ok(()))) => {
                info!("{} | Finished", account);
                summary.finished += 1;
            }
            Ok((account, Err(e))) if e.is_invalid_session() => {
                error!("{} | Invalid Session: {}", account, e);
                summary.invalid_sessions += 1;
            }
            Ok((account, Err(e))) => {
                error!("{} | {}", account, e);
                summary.failed += 1;
            }
            Err(e) => {
                error!("Account task ended abnormally: {}", e);
                summary.failed += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_discover_sessions() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bob.session"), b"").unwrap();
        std::fs::write(dir.path().join("alice.session"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("nested.session")).unwrap();

        let sessions = discover_sessions(dir.path()).unwrap();
        let names: Vec<_> = sessions.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(sessions[0].1, dir.path().join("alice.session"));
    }

    #[test]
    fn test_session_path() {
        assert_eq!(
            session_path(Path::new("sessions"), "carol"),
            PathBuf::from("sessions/carol.session")
        );
    }

    #[tokio::test]
    async fn test_run_all_without_drivers() {
        assert_eq!(run_all(Vec::new()).await, LaunchSummary::default());
    }
}
