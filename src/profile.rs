//! Read-only views: user profile, inventory and leaderboards.

use crate::cooldown;
use crate::errors::HomyakResult;
use crate::ledger::{keys, BoosterKind, Ledger, OwnedCard, PremiumRecord, ScoreRecord, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user: UserId,
    pub balance: u64,
    pub score: u64,
    pub last_card: Option<String>,
    pub cards_owned: usize,
    pub catalog_size: usize,
    pub premium: PremiumRecord,
    pub premium_active: bool,
    pub bonus_active: bool,
    pub luck_boosters: u32,
    pub time_boosters: u32,
    pub luck_armed: bool,
    pub favorite: Option<String>,
    pub cooldown_secs: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaderboardKind {
    Score,
    Coins,
    Cards,
}

impl LeaderboardKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "points" | "score" => Some(LeaderboardKind::Score),
            "coins" => Some(LeaderboardKind::Coins),
            "cards" => Some(LeaderboardKind::Cards),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardKind::Score => "points",
            LeaderboardKind::Coins => "coins",
            LeaderboardKind::Cards => "cards",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub user: UserId,
    pub value: u64,
}

#[derive(Clone)]
pub struct ProfileService {
    ledger: Arc<Ledger>,
}

impl ProfileService {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    pub fn profile(&self, user: UserId, now: DateTime<Utc>) -> HomyakResult<Profile> {
        self.ledger.read(|txn| {
            let score = txn.score(user)?;
            let premium = txn.premium(user)?;
            let catalog_size = txn.scan::<serde_json::Value>(keys::RARITY_PREFIX)?.len();
            Ok(Profile {
                user,
                balance: txn.balance(user)?,
                score: score.total,
                last_card: score.last_card,
                cards_owned: txn.user_cards(user)?.len(),
                catalog_size,
                premium_active: premium.is_active(now),
                premium,
                bonus_active: txn.bonus(user)?.active,
                luck_boosters: txn.booster_count(user, BoosterKind::Luck, now)?,
                time_boosters: txn.booster_count(user, BoosterKind::Time, now)?,
                luck_armed: txn.luck_armed(user)?,
                favorite: txn.get(&keys::favorite(user))?,
                cooldown_secs: cooldown::peek_remaining(txn, user, now)?,
            })
        })
    }

    /// Every user with a non-zero value, best first. Ties go to the lower id.
    pub fn leaderboard(&self, kind: LeaderboardKind) -> HomyakResult<Vec<LeaderboardEntry>> {
        let mut entries: Vec<LeaderboardEntry> = self.ledger.read(|txn| {
            Ok(match kind {
                LeaderboardKind::Score => txn
                    .scan::<ScoreRecord>(keys::SCORE_PREFIX)?
                    .into_iter()
                    .filter_map(|(key, record)| {
                        let user = keys::user_from_key(&key, keys::SCORE_PREFIX)?;
                        Some(LeaderboardEntry { user, value: record.total })
                    })
                    .collect(),
                LeaderboardKind::Coins => txn
                    .scan::<u64>(keys::MONEY_PREFIX)?
                    .into_iter()
                    .filter_map(|(key, coins)| {
                        let user = keys::user_from_key(&key, keys::MONEY_PREFIX)?;
                        Some(LeaderboardEntry { user, value: coins })
                    })
                    .collect(),
                LeaderboardKind::Cards => {
                    let mut counts: HashMap<UserId, u64> = HashMap::new();
                    for (key, _) in txn.scan::<OwnedCard>(keys::CARD_PREFIX)? {
                        if let Some(user) = keys::user_from_key(&key, keys::CARD_PREFIX) {
                            *counts.entry(user).or_default() += 1;
                        }
                    }
                    counts
                        .into_iter()
                        .map(|(user, value)| LeaderboardEntry { user, value })
                        .collect()
                }
            })
        })?;
        entries.retain(|e| e.value > 0);
        entries.sort_by(|a, b| b.value.cmp(&a.value).then(a.user.cmp(&b.user)));
        Ok(entries)
    }

    /// Remember how to show a user on leaderboards; written only on change
    pub async fn remember_name(&self, user: UserId, name: &str) -> HomyakResult<()> {
        let key = keys::display_name(user);
        if self.ledger.read(|txn| txn.get::<String>(&key))?.as_deref() == Some(name) {
            return Ok(());
        }
        self.ledger.transaction(|txn| txn.put(&key, &name.to_string())).await
    }

    pub fn display_name(&self, user: UserId) -> HomyakResult<String> {
        Ok(self
            .ledger
            .read(|txn| txn.get::<String>(&keys::display_name(user)))?
            .unwrap_or_else(|| format!("ID {}", user)))
    }

    pub fn top(&self, kind: LeaderboardKind, limit: usize) -> HomyakResult<Vec<LeaderboardEntry>> {
        let mut entries = self.leaderboard(kind)?;
        entries.truncate(limit);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooldown::Cooldowns;
    use crate::rewards::Rarity;

    #[tokio::test]
    async fn test_profile_reads_everything_without_side_effects() {
        let ledger = Arc::new(Ledger::in_memory());
        let now = Utc::now();
        ledger
            .transaction(|txn| {
                txn.put(&keys::rarity("a.png"), &crate::cards::CatalogEntry { filename: "a.png".into(), rarity: Rarity::COMMON })?;
                txn.grant_card(1, "a.png", now)?;
                txn.add_score(1, 1000, Some("a"))?;
                txn.credit(1, 25)?;
                txn.add_elixir(1, BoosterKind::Time, 1, None, now)?;
                Ok(())
            })
            .await
            .unwrap();
        Cooldowns::new(ledger.clone()).commit_draw(1, now).await.unwrap();

        let service = ProfileService::new(ledger.clone());
        let profile = service.profile(1, now).unwrap();
        assert_eq!(profile.balance, 25);
        assert_eq!(profile.cards_owned, 1);
        assert_eq!(profile.catalog_size, 1);
        assert_eq!(profile.time_boosters, 1);
        assert_eq!(profile.cooldown_secs, 6 * 3600);
        // peeking again still sees the booster
        assert_eq!(service.profile(1, now).unwrap().time_boosters, 1);
    }

    #[tokio::test]
    async fn test_leaderboards() {
        let ledger = Arc::new(Ledger::in_memory());
        let now = Utc::now();
        ledger
            .transaction(|txn| {
                txn.add_score(1, 500, None)?;
                txn.add_score(2, 900, None)?;
                txn.add_score(3, 500, None)?;
                txn.credit(3, 70)?;
                txn.grant_card(2, "a.png", now)?;
                txn.grant_card(2, "b.png", now)?;
                txn.grant_card(1, "a.png", now)?;
                Ok(())
            })
            .await
            .unwrap();
        let service = ProfileService::new(ledger);

        let users: Vec<UserId> = service.leaderboard(LeaderboardKind::Score).unwrap().iter().map(|e| e.user).collect();
        assert_eq!(users, vec![2, 1, 3]);
        assert_eq!(service.top(LeaderboardKind::Coins, 10).unwrap(), vec![LeaderboardEntry { user: 3, value: 70 }]);
        assert_eq!(service.top(LeaderboardKind::Cards, 1).unwrap(), vec![LeaderboardEntry { user: 2, value: 2 }]);
    }

    #[tokio::test]
    async fn test_display_names() {
        let service = ProfileService::new(Arc::new(Ledger::in_memory()));
        assert_eq!(service.display_name(4).unwrap(), "ID 4");
        service.remember_name(4, "@pilot").await.unwrap();
        service.remember_name(4, "@pilot").await.unwrap();
        assert_eq!(service.display_name(4).unwrap(), "@pilot");
    }
}
