//! Configuration management with validation and defaults
//!
//! Values come from an optional TOML file, then `HOMYAK_*` environment
//! variables, then validation.

use crate::errors::{ConfigurationError, HomyakResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HomyakConfig {
    pub bot: BotConfig,
    pub storage: StorageConfig,
    pub casino: CasinoConfig,
    pub economy: EconomyConfig,
}

/// Telegram side: credentials, operator chat, the bonus channel
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub token: String,
    /// Operator chat receiving casino logs, payments and internal errors
    pub admin_chat_id: i64,
    /// Users that are always admins, on top of the stored registry
    pub owner_ids: Vec<i64>,
    pub bonus_channel_id: i64,
    pub bonus_channel_link: String,
    /// Forum topic in the operator chat for casino round logs
    pub casino_log_thread_id: Option<i32>,
    /// Forum topic for purchases, promo use and bonus changes
    pub events_thread_id: Option<i32>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            admin_chat_id: 0,
            owner_ids: vec![],
            bonus_channel_id: 0,
            bonus_channel_link: String::new(),
            casino_log_thread_id: None,
            events_thread_id: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_directory: String,
    /// Whether to wipe the database on startup (testing only!)
    pub clear_on_start: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: "./data/homyak".to_string(),
            clear_on_start: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CasinoConfig {
    pub menu_debounce_secs: u64,
    /// Buttons stop answering after this much inactivity
    pub ownership_ttl_secs: u64,
    /// Unfinished rounds are dropped after this much inactivity
    pub session_ttl_secs: u64,
    pub max_bet_attempts: u32,
    pub sweep_interval_secs: u64,
}

impl Default for CasinoConfig {
    fn default() -> Self {
        Self {
            menu_debounce_secs: 10,
            ownership_ttl_secs: 30 * 60,
            session_ttl_secs: 15 * 60,
            max_bet_attempts: 3,
            sweep_interval_secs: 60,
        }
    }
}

/// Card draw odds
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Relative weights for tiers 1..=5
    pub rarity_weights: [u32; 5],
    /// Weight multiplier (percent) applied to non-common tiers by a luck booster
    pub luck_boost_percent: u32,
    /// Weight multiplier (percent) applied to non-common tiers for premium users
    pub premium_boost_percent: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            rarity_weights: [600, 250, 100, 40, 10],
            luck_boost_percent: 135,
            premium_boost_percent: 105,
        }
    }
}

impl HomyakConfig {
    /// In-memory friendly settings for tests and local runs
    pub fn testing() -> Self {
        Self {
            bot: BotConfig {
                admin_chat_id: -100,
                owner_ids: vec![1],
                bonus_channel_id: -200,
                bonus_channel_link: "@homyak_test".to_string(),
                ..Default::default()
            },
            storage: StorageConfig {
                clear_on_start: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn menu_debounce(&self) -> Duration {
        Duration::from_secs(self.casino.menu_debounce_secs)
    }

    pub fn ownership_ttl(&self) -> Duration {
        Duration::from_secs(self.casino.ownership_ttl_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.casino.session_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.casino.sweep_interval_secs)
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> HomyakResult<HomyakConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => HomyakConfig::default(),
        };

        apply_overrides(&mut config, |name| std::env::var(name).ok())?;
        validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> HomyakResult<HomyakConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, value: String, reason: &str) -> HomyakResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        }
        .into()
    })
}

/// Apply `HOMYAK_*` overrides read through `lookup`
pub fn apply_overrides<F>(config: &mut HomyakConfig, lookup: F) -> HomyakResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup("HOMYAK_BOT_TOKEN") {
        config.bot.token = token;
    }
    if let Some(chat) = lookup("HOMYAK_ADMIN_CHAT_ID") {
        config.bot.admin_chat_id = parse_field("HOMYAK_ADMIN_CHAT_ID", chat, "Invalid chat id")?;
    }
    if let Some(channel) = lookup("HOMYAK_BONUS_CHANNEL_ID") {
        config.bot.bonus_channel_id =
            parse_field("HOMYAK_BONUS_CHANNEL_ID", channel, "Invalid channel id")?;
    }
    if let Some(owners) = lookup("HOMYAK_OWNER_IDS") {
        config.bot.owner_ids = owners
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_field("HOMYAK_OWNER_IDS", s.to_string(), "Invalid user id"))
            .collect::<HomyakResult<Vec<i64>>>()?;
    }
    if let Some(dir) = lookup("HOMYAK_DATA_DIR") {
        config.storage.data_directory = dir;
    }
    if let Some(secs) = lookup("HOMYAK_MENU_DEBOUNCE_SECS") {
        config.casino.menu_debounce_secs =
            parse_field("HOMYAK_MENU_DEBOUNCE_SECS", secs, "Invalid number of seconds")?;
    }

    Ok(())
}

/// Validate configuration values
pub fn validate(config: &HomyakConfig) -> HomyakResult<()> {
    if config.storage.data_directory.trim().is_empty() {
        return Err(ConfigurationError::MissingRequired("storage.data_directory".to_string()).into());
    }

    if config.casino.max_bet_attempts == 0 {
        return Err(ConfigurationError::InvalidValue {
            field: "casino.max_bet_attempts".to_string(),
            value: "0".to_string(),
            reason: "At least one attempt is required".to_string(),
        }
        .into());
    }

    if config.casino.sweep_interval_secs == 0 {
        return Err(ConfigurationError::InvalidValue {
            field: "casino.sweep_interval_secs".to_string(),
            value: "0".to_string(),
            reason: "Sweep interval cannot be zero".to_string(),
        }
        .into());
    }

    if config.economy.rarity_weights.iter().all(|w| *w == 0) {
        return Err(ConfigurationError::ValidationFailed(
            "economy.rarity_weights must contain a non-zero weight".to_string(),
        )
        .into());
    }

    Ok(())
}

/// Token check done by the live bot only; offline tools run without one
pub fn require_token(config: &HomyakConfig) -> HomyakResult<&str> {
    if config.bot.token.trim().is_empty() {
        return Err(ConfigurationError::MissingRequired("bot.token".to_string()).into());
    }
    Ok(&config.bot.token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&HomyakConfig::default()).is_ok());
        assert!(validate(&HomyakConfig::testing()).is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: HomyakConfig = toml::from_str(
            r#"
            [bot]
            admin_chat_id = -42
            [casino]
            menu_debounce_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.bot.admin_chat_id, -42);
        assert_eq!(config.casino.menu_debounce_secs, 3);
        assert_eq!(config.casino.max_bet_attempts, 3);
        assert_eq!(config.storage.data_directory, "./data/homyak");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HOMYAK_BOT_TOKEN", "123:abc"),
            ("HOMYAK_ADMIN_CHAT_ID", "-1001"),
            ("HOMYAK_OWNER_IDS", "7, 8"),
        ]
        .into_iter()
        .collect();
        let mut config = HomyakConfig::default();
        apply_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.bot.token, "123:abc");
        assert_eq!(config.bot.admin_chat_id, -1001);
        assert_eq!(config.bot.owner_ids, vec![7, 8]);
        assert_eq!(require_token(&config).unwrap(), "123:abc");
    }

    #[test]
    fn test_invalid_env_value_is_rejected() {
        let mut config = HomyakConfig::default();
        let err = apply_overrides(&mut config, |k| {
            (k == "HOMYAK_ADMIN_CHAT_ID").then(|| "not-a-number".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("HOMYAK_ADMIN_CHAT_ID"));
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = HomyakConfig::default();
        config.casino.max_bet_attempts = 0;
        assert!(validate(&config).is_err());

        let mut config = HomyakConfig::default();
        config.economy.rarity_weights = [0; 5];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_token() {
        assert!(require_token(&HomyakConfig::default()).is_err());
    }
}
