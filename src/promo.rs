//! Promo codes: creation and one-shot redemption.

use crate::cards::{card_title, grant_scored, rarity_of};
use crate::cooldown;
use crate::errors::{HomyakResult, PromoError};
use crate::ledger::{keys, Ledger, LedgerTxn, ScoreBoost, UserId};
use crate::rewards::Rarity;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

static CODE_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9а-яА-Я_]+$").expect("promo code pattern is a valid literal"));

/// Letters (Latin or Cyrillic), digits and underscore
pub fn is_valid_code(code: &str) -> bool {
    CODE_FORMAT.is_match(code)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromoReward {
    Points { points: u64 },
    Card { filename: String },
    CooldownReset,
    /// Extra points on every drawn card for `minutes`
    ScoreMultiplier { extra_points: u64, minutes: u32 },
    Coins { coins: u64 },
}

impl PromoReward {
    /// Build from the admin form: type 1..=5, value text and optional duration
    pub fn from_parts(kind: u8, value: &str, minutes: Option<u32>) -> HomyakResult<Self> {
        let value = value.trim();
        let number = || -> HomyakResult<u64> {
            value
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| PromoError::InvalidReward(format!("'{}' is not a positive number", value)).into())
        };
        match kind {
            1 => Ok(PromoReward::Points { points: number()? }),
            2 if !value.is_empty() => Ok(PromoReward::Card { filename: value.to_string() }),
            3 => Ok(PromoReward::CooldownReset),
            4 => {
                let minutes = minutes
                    .filter(|m| *m > 0)
                    .ok_or_else(|| PromoError::InvalidReward("duration required".to_string()))?;
                Ok(PromoReward::ScoreMultiplier { extra_points: number()?, minutes })
            }
            5 => Ok(PromoReward::Coins { coins: number()? }),
            _ => Err(PromoError::InvalidReward(format!("type {} value '{}'", kind, value)).into()),
        }
    }
}

impl fmt::Display for PromoReward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromoReward::Points { points } => write!(f, "{} очков", points),
            PromoReward::Card { filename } => write!(f, "карточка {}", card_title(filename)),
            PromoReward::CooldownReset => f.write_str("сброс КД"),
            PromoReward::ScoreMultiplier { extra_points, minutes } => {
                write!(f, "+{} очков за хомяка на {} мин", extra_points, minutes)
            }
            PromoReward::Coins { coins } => write!(f, "{} монет", coins),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromoCode {
    pub code: String,
    pub creator: UserId,
    pub reward: PromoReward,
    pub max_uses: u32,
    pub used_count: u32,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.saturating_sub(self.used_count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardGranted {
    Points { points: u64, total: u64 },
    Card { filename: String, rarity: Rarity, points: u64, total: u64 },
    CooldownReset,
    ScoreBoost { extra_points: u64, expires_at: DateTime<Utc> },
    Coins { coins: u64, balance: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    pub promo: PromoCode,
    pub granted: RewardGranted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PromoUse {
    at: DateTime<Utc>,
}

fn grant(txn: &mut LedgerTxn<'_>, user: UserId, reward: &PromoReward, now: DateTime<Utc>) -> HomyakResult<RewardGranted> {
    Ok(match reward {
        PromoReward::Points { points } => {
            let total = txn.add_score(user, *points, None)?;
            RewardGranted::Points { points: *points, total }
        }
        PromoReward::Card { filename } => {
            let rarity = rarity_of(txn, filename)?;
            let points = grant_scored(txn, user, filename, now)?;
            RewardGranted::Card { filename: filename.clone(), rarity, points, total: txn.score(user)?.total }
        }
        PromoReward::CooldownReset => {
            cooldown::reset(txn, user)?;
            RewardGranted::CooldownReset
        }
        PromoReward::ScoreMultiplier { extra_points, minutes } => {
            let expires_at = now + Duration::minutes(*minutes as i64);
            txn.put(&keys::score_boost(user), &ScoreBoost { extra_points: *extra_points, expires_at })?;
            RewardGranted::ScoreBoost { extra_points: *extra_points, expires_at }
        }
        PromoReward::Coins { coins } => {
            let balance = txn.credit(user, *coins)?;
            RewardGranted::Coins { coins: *coins, balance }
        }
    })
}

#[derive(Clone)]
pub struct PromoService {
    ledger: Arc<Ledger>,
}

impl PromoService {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    pub async fn create(
        &self,
        code: &str,
        creator: UserId,
        reward: PromoReward,
        max_uses: u32,
        now: DateTime<Utc>,
    ) -> HomyakResult<PromoCode> {
        let code = code.trim();
        if !is_valid_code(code) {
            return Err(PromoError::InvalidCode(code.to_string()).into());
        }
        if max_uses == 0 {
            return Err(PromoError::InvalidReward("max uses must be positive".to_string()).into());
        }
        let promo = self
            .ledger
            .transaction(|txn| {
                if let PromoReward::Card { filename } = &reward {
                    if !txn.exists(&keys::rarity(filename))? {
                        return Err(PromoError::InvalidReward(format!("unknown card {}", filename)).into());
                    }
                }
                let key = keys::promo(code);
                if txn.exists(&key)? {
                    return Err(PromoError::AlreadyExists(code.to_string()).into());
                }
                let promo = PromoCode {
                    code: code.to_string(),
                    creator,
                    reward,
                    max_uses,
                    used_count: 0,
                    created_at: now,
                };
                txn.put(&key, &promo)?;
                Ok(promo)
            })
            .await?;
        tracing::info!(code = %promo.code, creator, max_uses, "Promo code created");
        Ok(promo)
    }

    pub fn get(&self, code: &str) -> HomyakResult<Option<PromoCode>> {
        self.ledger.read(|txn| txn.get(&keys::promo(code.trim())))
    }

    pub fn list(&self) -> HomyakResult<Vec<PromoCode>> {
        self.ledger.read(|txn| {
            Ok(txn
                .scan::<PromoCode>(keys::PROMO_PREFIX)?
                .into_iter()
                .map(|(_, p)| p)
                .collect())
        })
    }

    pub async fn delete(&self, code: &str) -> HomyakResult<()> {
        self.ledger
            .transaction(|txn| {
                let key = keys::promo(code.trim());
                if !txn.exists(&key)? {
                    return Err(PromoError::NotFound.into());
                }
                txn.delete(&key);
                Ok(())
            })
            .await
    }

    /// Check, count the use and grant the reward in one transaction
    pub async fn redeem(&self, user: UserId, code: &str, now: DateTime<Utc>) -> HomyakResult<Redemption> {
        let code = code.trim();
        let redemption = self
            .ledger
            .transaction(|txn| {
                let key = keys::promo(code);
                let Some(mut promo) = txn.get::<PromoCode>(&key)? else {
                    return Err(PromoError::NotFound.into());
                };
                if promo.used_count >= promo.max_uses {
                    return Err(PromoError::Exhausted.into());
                }
                let use_key = keys::promo_use(code, user);
                if txn.exists(&use_key)? {
                    return Err(PromoError::AlreadyUsed.into());
                }
                promo.used_count += 1;
                txn.put(&key, &promo)?;
                txn.put(&use_key, &PromoUse { at: now })?;
                let granted = grant(txn, user, &promo.reward, now)?;
                Ok(Redemption { promo, granted })
            })
            .await?;
        tracing::info!(
            user_id = user,
            code = %redemption.promo.code,
            remaining = redemption.promo.remaining_uses(),
            "Promo code redeemed"
        );
        Ok(redemption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HomyakError;

    #[test]
    fn test_code_format() {
        assert!(is_valid_code("NEW_year2025"));
        assert!(is_valid_code("Хомяк_1"));
        assert!(!is_valid_code("new year"));
        assert!(!is_valid_code("promo!"));
        assert!(!is_valid_code(""));
    }

    #[test]
    fn test_reward_from_parts() {
        assert_eq!(PromoReward::from_parts(1, "500", None).unwrap(), PromoReward::Points { points: 500 });
        assert_eq!(PromoReward::from_parts(3, "", None).unwrap(), PromoReward::CooldownReset);
        assert!(PromoReward::from_parts(4, "100", None).is_err());
        assert!(PromoReward::from_parts(5, "-3", None).is_err());
        assert!(PromoReward::from_parts(9, "1", None).is_err());
    }

    #[tokio::test]
    async fn test_single_use_code() {
        let ledger = Arc::new(Ledger::in_memory());
        let promos = PromoService::new(ledger.clone());
        let now = Utc::now();
        promos.create("GIFT", 1, PromoReward::Coins { coins: 40 }, 1, now).await.unwrap();

        let first = promos.redeem(10, "gift", now).await.unwrap();
        assert_eq!(first.granted, RewardGranted::Coins { coins: 40, balance: 40 });

        // Exhaustion is reported before the per-user check
        let again = promos.redeem(10, "GIFT", now).await.unwrap_err();
        assert!(matches!(again, HomyakError::Promo(PromoError::Exhausted)));
        let other = promos.redeem(11, "GIFT", now).await.unwrap_err();
        assert!(matches!(other, HomyakError::Promo(PromoError::Exhausted)));
        assert_eq!(ledger.get_balance(11).unwrap(), 0);
        assert_eq!(promos.get("gift").unwrap().unwrap().used_count, 1);
    }

    #[tokio::test]
    async fn test_same_user_cannot_redeem_twice() {
        let promos = PromoService::new(Arc::new(Ledger::in_memory()));
        let now = Utc::now();
        promos.create("pts", 1, PromoReward::Points { points: 100 }, 5, now).await.unwrap();
        promos.redeem(2, "pts", now).await.unwrap();
        let err = promos.redeem(2, "pts", now).await.unwrap_err();
        assert!(matches!(err, HomyakError::Promo(PromoError::AlreadyUsed)));
        assert!(matches!(promos.redeem(2, "nope", now).await, Err(HomyakError::Promo(PromoError::NotFound))));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let promos = PromoService::new(Arc::new(Ledger::in_memory()));
        let now = Utc::now();
        assert!(promos.create("bad code", 1, PromoReward::CooldownReset, 1, now).await.is_err());
        promos.create("Once", 1, PromoReward::CooldownReset, 1, now).await.unwrap();
        let dup = promos.create("ONCE", 1, PromoReward::CooldownReset, 1, now).await.unwrap_err();
        assert!(matches!(dup, HomyakError::Promo(PromoError::AlreadyExists(_))));
        let card = PromoReward::Card { filename: "ghost.png".into() };
        assert!(promos.create("ghost", 1, card, 1, now).await.is_err());
    }

    #[tokio::test]
    async fn test_score_boost_reward() {
        let ledger = Arc::new(Ledger::in_memory());
        let promos = PromoService::new(ledger.clone());
        let now = Utc::now();
        let reward = PromoReward::ScoreMultiplier { extra_points: 300, minutes: 90 };
        promos.create("boost", 1, reward, 3, now).await.unwrap();
        promos.redeem(4, "boost", now).await.unwrap();

        let boost = ledger.read(|txn| txn.score_boost(4, now)).unwrap().unwrap();
        assert_eq!(boost.extra_points, 300);
        assert_eq!(boost.expires_at, now + Duration::minutes(90));
        assert!(ledger.read(|txn| txn.score_boost(4, now + Duration::minutes(91))).unwrap().is_none());
    }
}
