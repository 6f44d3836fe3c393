//! Homyak - Telegram hamster card collection bot with a coin economy
//!
//! Timed card draws with rarity tiers, a coin casino, a shop paid in coins
//! or Telegram Stars, promo codes, Premium and a channel-subscription bonus.
//! All persistent state goes through the transactional [`ledger::Ledger`]
//! on top of RocksDB; the chat platform sits behind [`bot::Transport`].

pub mod admin;
pub mod audit;
pub mod bonus;
pub mod bot;
pub mod cards;
pub mod casino;
pub mod config;
pub mod cooldown;
pub mod errors;
pub mod ledger;
pub mod premium;
pub mod profile;
pub mod promo;
pub mod random;
pub mod rewards;
pub mod shop;
pub mod storage;
pub mod telemetry;

#[cfg(feature = "telegram")]
pub mod telegram;

pub use config::{ConfigLoader, HomyakConfig};
pub use errors::{HomyakError, HomyakResult};
pub use ledger::{ChatId, Ledger, UserId};
pub use rewards::{points_for, Rarity};
