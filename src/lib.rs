//! Slapper Bot Library
//!
//! Farms a Telegram mini-app clicker game with one loop per account.
//!
//! This crate provides the core functionality for:
//! - Opening the game's web app from a Telegram session (`MTProto`)
//! - Talking to the game API: clicks, daily boosts, upgrades
//! - Deciding, after every click batch, which action to take next
//! - Running many accounts side by side with per-account proxies

pub mod config;
pub mod driver;
pub mod farm;
pub mod game;
pub mod store;
pub mod telegram;
