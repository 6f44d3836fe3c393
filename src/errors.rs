//! Error types for the Homyak bot
//!
//! One root error with a sub-enum per concern. User-facing failures
//! (bad bets, sold out items, spent promo codes) are ordinary variants so
//! handlers can match on them and answer the user instead of bubbling up.

use thiserror::Error;

/// Root error type for all Homyak operations
#[derive(Debug, Error)]
pub enum HomyakError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Card error: {0}")]
    Cards(#[from] CardError),

    #[error("Casino error: {0}")]
    Casino(#[from] CasinoError),

    #[error("Shop error: {0}")]
    Shop(#[from] ShopError),

    #[error("Promo error: {0}")]
    Promo(#[from] PromoError),

    #[error("Access denied: {0}")]
    Access(#[from] AccessError),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    #[error("Missing required field: {0}")]
    MissingRequired(String),
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue { field: String, value: String, reason: String },
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
}

/// Storage system errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),
    #[error("Read failed: {0}")]
    ReadFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("Unknown premium plan: {0}")]
    UnknownPlan(String),
    #[error("No {0} booster available")]
    NoBooster(String),
    #[error("Booster cannot be used right now")]
    BoosterNotApplicable,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CardError {
    #[error("Next card available in {remaining_secs}s")]
    CooldownActive { remaining_secs: i64 },
    #[error("Card catalog is empty")]
    EmptyCatalog,
    #[error("Unknown card: {0}")]
    UnknownCard(String),
    #[error("Card already exists: {0}")]
    DuplicateCard(String),
    #[error("Invalid rarity tier: {0}")]
    InvalidRarity(u8),
}

/// Casino flow errors. Most are answered to the user and never logged as failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CasinoError {
    #[error("Bet is not a number")]
    BetNotANumber,
    #[error("Bet {bet} outside [{min}, {max}]")]
    BetOutOfRange { bet: u64, min: u64, max: u64 },
    #[error("Insufficient balance: {balance}")]
    InsufficientBalance { balance: u64 },
    #[error("Too many invalid bet attempts")]
    TooManyAttempts,
    #[error("No active round")]
    NoActiveRound,
    #[error("Choice does not match the current game")]
    ChoiceMismatch,
    #[error("Unsupported bomb count: {0}")]
    InvalidBombCount(u8),
    #[error("Cell ({row}, {col}) is outside the board")]
    CellOutOfBounds { row: u8, col: u8 },
    #[error("Cell already revealed")]
    CellAlreadyRevealed,
    #[error("Round already finished")]
    RoundFinished,
    #[error("Draw {value} outside the {game} outcome space")]
    InvalidDraw { game: String, value: u8 },
    #[error("Casino is available only in group chats")]
    PrivateChat,
    #[error("Menu opened too recently")]
    Debounced,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShopError {
    #[error("Shop item {0} not found")]
    ItemNotFound(u64),
    #[error("Bundle {0} not found")]
    BundleNotFound(u64),
    #[error("Card already purchased")]
    AlreadyOwned,
    #[error("Out of stock")]
    OutOfStock,
    #[error("Not enough coins: price {price}, balance {balance}")]
    InsufficientFunds { price: u64, balance: u64 },
    #[error("Unknown coin pack: {0}")]
    UnknownPack(u64),
    #[error("Item for {0} already listed")]
    DuplicateListing(String),
    #[error("Payment must be refunded: {0}")]
    RefundRequired(String),
    #[error("Malformed payment payload: {0}")]
    BadPayload(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromoError {
    #[error("Invalid promo code format: {0}")]
    InvalidCode(String),
    #[error("Promo code already exists: {0}")]
    AlreadyExists(String),
    #[error("Promo code not found")]
    NotFound,
    #[error("Promo code exhausted")]
    Exhausted,
    #[error("Promo code already used")]
    AlreadyUsed,
    #[error("Invalid reward: {0}")]
    InvalidReward(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("User {0} is not an admin")]
    NotAdmin(i64),
    #[error("These buttons belong to someone else")]
    NotOwner,
    #[error("These buttons are no longer active")]
    StaleButtons,
}

impl From<rocksdb::Error> for HomyakError {
    fn from(e: rocksdb::Error) -> Self {
        HomyakError::Storage(StorageError::WriteFailed(e.to_string()))
    }
}

impl From<serde_json::Error> for HomyakError {
    fn from(e: serde_json::Error) -> Self {
        HomyakError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

impl HomyakError {
    /// True for failures caused by the user rather than by the system.
    /// Internal errors get reported to the operator chat; these don't.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            HomyakError::Configuration(_) | HomyakError::Storage(_) | HomyakError::Transport(_)
        )
    }
}

pub type HomyakResult<T> = Result<T, HomyakError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err: HomyakError = ConfigurationError::ValidationFailed("token".to_string()).into();
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_bet_range_details() {
        let err = CasinoError::BetOutOfRange { bet: 90, min: 1, max: 70 };
        assert_eq!(err.to_string(), "Bet 90 outside [1, 70]");
    }

    #[test]
    fn test_error_source() {
        let err: HomyakError = StorageError::ReadFailed("disk".to_string()).into();
        assert!(err.source().is_some());
        assert!(!err.is_user_facing());
    }

    #[test]
    fn test_user_facing_classification() {
        let err: HomyakError = PromoError::Exhausted.into();
        assert!(err.is_user_facing());
        let err: HomyakError = ShopError::OutOfStock.into();
        assert!(err.is_user_facing());
    }
}
