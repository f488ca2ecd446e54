//! Account driver module.
//!
//! Wires one Telegram session to one game client and runs its click loop;
//! the launcher runs every discovered account side by side.

mod account;
mod launcher;

pub use account::{ANDROID_USER_AGENTS, AccountDriver, DriverError};
pub use launcher::{LaunchSummary, SESSION_EXTENSION, discover_sessions, run_all, session_path};
