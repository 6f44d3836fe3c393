//! Card catalog (filename to rarity), user collections, favourites and the
//! timed card draw.

use crate::config::EconomyConfig;
use crate::cooldown;
use crate::errors::{CardError, HomyakResult, LedgerError};
use crate::ledger::{keys, BoosterKind, Ledger, LedgerTxn, OwnedCard, UserId};
use crate::random::DrawSource;
use crate::rewards::{points_for, Rarity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub filename: String,
    pub rarity: Rarity,
}

/// Display title: the filename without its extension
pub fn card_title(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(filename)
}

pub fn rarity_of(txn: &LedgerTxn<'_>, filename: &str) -> HomyakResult<Rarity> {
    Ok(txn
        .get::<CatalogEntry>(&keys::rarity(filename))?
        .map(|e| e.rarity)
        .unwrap_or_default())
}

/// Points `user` would get for one card of `rarity` right now
pub fn points_now(txn: &LedgerTxn<'_>, user: UserId, rarity: Rarity, now: DateTime<Utc>) -> HomyakResult<u64> {
    let premium = txn.is_premium_active(user, now)?;
    let bonus = txn.bonus(user)?;
    Ok(points_for(rarity, premium, bonus.active, bonus.premium_snapshot))
}

/// Grant one card and score it. Returns the points added.
pub fn grant_scored(txn: &mut LedgerTxn<'_>, user: UserId, filename: &str, now: DateTime<Utc>) -> HomyakResult<u64> {
    let rarity = rarity_of(txn, filename)?;
    let points = points_now(txn, user, rarity, now)?;
    txn.grant_card(user, filename, now)?;
    txn.add_score(user, points, Some(card_title(filename)))?;
    Ok(points)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawOutcome {
    pub filename: String,
    pub rarity: Rarity,
    pub points: u64,
    pub total_score: u64,
    pub time_booster_used: bool,
    pub luck_used: bool,
    pub duplicate: bool,
}

/// Tier weights for one draw, in tier order
pub fn draw_weights(economy: &EconomyConfig, luck: bool, premium: bool) -> [u64; 5] {
    let mut weights = [0u64; 5];
    for (i, w) in economy.rarity_weights.iter().enumerate() {
        let mut weight = *w as u64 * 10_000;
        if i > 0 {
            if luck {
                weight = weight * economy.luck_boost_percent as u64 / 100;
            }
            if premium {
                weight = weight * economy.premium_boost_percent as u64 / 100;
            }
        }
        weights[i] = weight;
    }
    weights
}

#[derive(Clone)]
pub struct CardService {
    ledger: Arc<Ledger>,
    economy: EconomyConfig,
}

impl CardService {
    pub fn new(ledger: Arc<Ledger>, economy: EconomyConfig) -> Self {
        Self { ledger, economy }
    }

    pub fn catalog(&self) -> HomyakResult<Vec<CatalogEntry>> {
        self.ledger.read(|txn| {
            Ok(txn
                .scan::<CatalogEntry>(keys::RARITY_PREFIX)?
                .into_iter()
                .map(|(_, e)| e)
                .collect())
        })
    }

    pub fn rarity_of(&self, filename: &str) -> HomyakResult<Rarity> {
        self.ledger.read(|txn| rarity_of(txn, filename))
    }

    pub async fn add_card(&self, filename: &str, rarity: Rarity) -> HomyakResult<()> {
        self.ledger
            .transaction(|txn| {
                let key = keys::rarity(filename);
                if txn.exists(&key)? {
                    return Err(CardError::DuplicateCard(filename.to_string()).into());
                }
                txn.put(&key, &CatalogEntry { filename: filename.to_string(), rarity })
            })
            .await?;
        tracing::info!(filename, rarity = rarity.tier(), "Card added to catalog");
        Ok(())
    }

    pub async fn set_rarity(&self, filename: &str, rarity: Rarity) -> HomyakResult<()> {
        self.ledger
            .transaction(|txn| {
                txn.put(&keys::rarity(filename), &CatalogEntry { filename: filename.to_string(), rarity })
            })
            .await
    }

    /// Card counts per tier
    pub fn rarity_stats(&self) -> HomyakResult<BTreeMap<u8, usize>> {
        let mut stats: BTreeMap<u8, usize> = Rarity::ALL.iter().map(|r| (r.tier(), 0)).collect();
        for entry in self.catalog()? {
            *stats.entry(entry.rarity.tier()).or_default() += 1;
        }
        Ok(stats)
    }

    /// Case-insensitive title search over the catalog
    pub fn find(&self, query: &str) -> HomyakResult<Vec<CatalogEntry>> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .catalog()?
            .into_iter()
            .filter(|e| card_title(&e.filename).to_lowercase().contains(&needle))
            .collect())
    }

    /// Rename a card everywhere: catalog, collections, favourites
    pub async fn rename(&self, old: &str, new: &str) -> HomyakResult<usize> {
        let moved = self
            .ledger
            .transaction(|txn| {
                let Some(mut entry) = txn.get::<CatalogEntry>(&keys::rarity(old))? else {
                    return Err(CardError::UnknownCard(old.to_string()).into());
                };
                if txn.exists(&keys::rarity(new))? {
                    return Err(CardError::DuplicateCard(new.to_string()).into());
                }
                txn.delete(&keys::rarity(old));
                entry.filename = new.to_string();
                txn.put(&keys::rarity(new), &entry)?;

                let mut moved = 0;
                for (key, mut card) in txn.scan::<OwnedCard>(keys::CARD_PREFIX)? {
                    if card.filename != old {
                        continue;
                    }
                    if let Some(user) = keys::user_from_key(&key, keys::CARD_PREFIX) {
                        txn.delete(&key);
                        card.filename = new.to_string();
                        txn.put(&keys::card(user, new), &card)?;
                        if txn.get::<String>(&keys::favorite(user))?.as_deref() == Some(old) {
                            txn.put(&keys::favorite(user), &new.to_string())?;
                        }
                        moved += 1;
                    }
                }
                Ok(moved)
            })
            .await?;
        tracing::info!(old, new, owners = moved, "Card renamed");
        Ok(moved)
    }

    /// Remove a card from the catalog and every collection
    pub async fn delete(&self, filename: &str) -> HomyakResult<usize> {
        let removed = self
            .ledger
            .transaction(|txn| {
                if !txn.exists(&keys::rarity(filename))? {
                    return Err(CardError::UnknownCard(filename.to_string()).into());
                }
                txn.delete(&keys::rarity(filename));
                let mut removed = 0;
                for (key, card) in txn.scan::<OwnedCard>(keys::CARD_PREFIX)? {
                    if card.filename != filename {
                        continue;
                    }
                    txn.delete(&key);
                    if let Some(user) = keys::user_from_key(&key, keys::CARD_PREFIX) {
                        if txn.get::<String>(&keys::favorite(user))?.as_deref() == Some(filename) {
                            txn.delete(&keys::favorite(user));
                        }
                    }
                    removed += 1;
                }
                Ok(removed)
            })
            .await?;
        tracing::info!(filename, owners = removed, "Card deleted");
        Ok(removed)
    }

    pub fn user_cards(&self, user: UserId) -> HomyakResult<Vec<(OwnedCard, Rarity)>> {
        self.ledger.read(|txn| {
            txn.user_cards(user)?
                .into_iter()
                .map(|card| {
                    let rarity = rarity_of(txn, &card.filename)?;
                    Ok((card, rarity))
                })
                .collect()
        })
    }

    pub async fn set_favorite(&self, user: UserId, filename: &str) -> HomyakResult<()> {
        self.ledger
            .transaction(|txn| {
                if txn.owned_card(user, filename)?.is_none() {
                    return Err(CardError::UnknownCard(filename.to_string()).into());
                }
                txn.put(&keys::favorite(user), &filename.to_string())
            })
            .await
    }

    pub fn favorite(&self, user: UserId) -> HomyakResult<Option<String>> {
        self.ledger.read(|txn| txn.get(&keys::favorite(user)))
    }

    /// Arm a luck booster for the next draw
    pub async fn activate_luck(&self, user: UserId, now: DateTime<Utc>) -> HomyakResult<()> {
        self.ledger
            .transaction(|txn| {
                if txn.luck_armed(user)? {
                    return Err(LedgerError::BoosterNotApplicable.into());
                }
                if !txn.consume_booster_fifo(user, BoosterKind::Luck, now)? {
                    return Err(LedgerError::NoBooster("luck".to_string()).into());
                }
                txn.set_luck_armed(user, true)
            })
            .await
    }

    /// Manually spend a time booster: one hour off a running cooldown
    pub async fn activate_time(&self, user: UserId, now: DateTime<Utc>) -> HomyakResult<()> {
        self.ledger
            .transaction(|txn| {
                let record = txn.cooldown(user)?;
                let premium = txn.is_premium_active(user, now)?;
                let bonus = txn.bonus(user)?.active;
                let remaining =
                    cooldown::remaining_secs(&record, cooldown::base_wait(premium, bonus), now);
                if remaining <= 0 {
                    return Err(LedgerError::BoosterNotApplicable.into());
                }
                if !txn.consume_booster_fifo(user, BoosterKind::Time, now)? {
                    return Err(LedgerError::NoBooster("time".to_string()).into());
                }
                cooldown::reduce(txn, user, cooldown::TIME_BOOSTER_HOURS * 3600)
            })
            .await
    }

    /// Timed draw: cooldown, weighted tier roll, grant and score in one transaction
    pub async fn draw(&self, user: UserId, now: DateTime<Utc>, rng: &dyn DrawSource) -> HomyakResult<DrawOutcome> {
        let economy = &self.economy;
        let outcome = self
            .ledger
            .transaction(|txn| {
                let catalog: Vec<CatalogEntry> = txn
                    .scan::<CatalogEntry>(keys::RARITY_PREFIX)?
                    .into_iter()
                    .map(|(_, e)| e)
                    .collect();
                if catalog.is_empty() {
                    return Err(CardError::EmptyCatalog.into());
                }

                let commit = cooldown::commit_draw(txn, user, now)?;
                let luck = txn.luck_armed(user)?;
                let premium = txn.is_premium_active(user, now)?;

                let mut weights = draw_weights(economy, luck, premium);
                for (i, w) in weights.iter_mut().enumerate() {
                    if !catalog.iter().any(|e| e.rarity.tier() as usize == i + 1) {
                        *w = 0;
                    }
                }
                let rarity = Rarity::ALL[rng.pick_weighted(&weights).min(4)];
                let pool: Vec<&CatalogEntry> = catalog.iter().filter(|e| e.rarity == rarity).collect();
                let pool = if pool.is_empty() { catalog.iter().collect() } else { pool };
                let card = pool[rng.pick_index(pool.len()).min(pool.len() - 1)];

                let duplicate = txn.owned_card(user, &card.filename)?.is_some();
                let mut points = points_now(txn, user, card.rarity, now)?;
                if let Some(boost) = txn.score_boost(user, now)? {
                    points += boost.extra_points;
                }
                txn.grant_card(user, &card.filename, now)?;
                let total_score = txn.add_score(user, points, Some(card_title(&card.filename)))?;
                if luck {
                    txn.set_luck_armed(user, false)?;
                }

                Ok(DrawOutcome {
                    filename: card.filename.clone(),
                    rarity: card.rarity,
                    points,
                    total_score,
                    time_booster_used: commit.booster_used,
                    luck_used: luck,
                    duplicate,
                })
            })
            .await?;

        tracing::info!(
            user_id = user,
            card = %outcome.filename,
            rarity = outcome.rarity.tier(),
            points = outcome.points,
            "Card drawn"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{BonusStatus, PremiumRecord, ScoreBoost};
    use crate::random::ScriptedDraws;
    use chrono::Duration;

    async fn service() -> (Arc<Ledger>, CardService) {
        let ledger = Arc::new(Ledger::in_memory());
        let cards = CardService::new(ledger.clone(), EconomyConfig::default());
        cards.add_card("Sleepy Homyak.png", Rarity::COMMON).await.unwrap();
        cards.add_card("Golden Homyak.jpg", Rarity::new(4).unwrap()).await.unwrap();
        (ledger, cards)
    }

    #[test]
    fn test_card_title() {
        assert_eq!(card_title("Golden Homyak.jpg"), "Golden Homyak");
        assert_eq!(card_title("plain"), "plain");
        assert_eq!(card_title(".hidden"), ".hidden");
    }

    #[test]
    fn test_draw_weights() {
        let economy = EconomyConfig::default();
        let plain = draw_weights(&economy, false, false);
        let lucky = draw_weights(&economy, true, false);
        assert_eq!(plain[0], lucky[0]);
        assert!(lucky[4] > plain[4]);
        assert_eq!(lucky[1], plain[1] * 135 / 100);
    }

    #[tokio::test]
    async fn test_draw_scores_and_starts_cooldown() {
        let (ledger, cards) = service().await;
        let now = Utc::now();
        let rng = ScriptedDraws::new();
        rng.push_pick(3);

        let outcome = cards.draw(7, now, &rng).await.unwrap();
        assert_eq!(outcome.filename, "Golden Homyak.jpg");
        assert_eq!(outcome.points, 5000);
        assert!(!outcome.duplicate);

        let score = ledger.get_score(7).unwrap();
        assert_eq!(score.total, 5000);
        assert_eq!(score.last_card.as_deref(), Some("Golden Homyak"));

        let err = cards.draw(7, now + Duration::hours(1), &rng).await.unwrap_err();
        assert!(matches!(err, crate::errors::HomyakError::Cards(CardError::CooldownActive { .. })));
    }

    #[tokio::test]
    async fn test_draw_reaches_every_card_in_a_large_tier() {
        let ledger = Arc::new(Ledger::in_memory());
        let cards = CardService::new(ledger.clone(), EconomyConfig::default());
        for i in 0..300 {
            cards.add_card(&format!("homyak{:03}.png", i), Rarity::COMMON).await.unwrap();
        }
        let rng = ScriptedDraws::new();
        rng.push_pick(0);
        rng.push_index(299);

        let outcome = cards.draw(7, Utc::now(), &rng).await.unwrap();
        assert_eq!(outcome.filename, "homyak299.png");
        assert_eq!(cards.catalog().unwrap()[299].filename, "homyak299.png");
    }

    #[tokio::test]
    async fn test_draw_applies_premium_bonus_and_boost() {
        let (ledger, cards) = service().await;
        let now = Utc::now();
        ledger
            .transaction(|txn| {
                txn.put_premium(8, &PremiumRecord { lifetime: true, expires_at: None })?;
                txn.put_bonus(8, &BonusStatus { active: true, premium_snapshot: false })?;
                txn.put(&keys::score_boost(8), &ScoreBoost { extra_points: 300, expires_at: now + Duration::hours(1) })
            })
            .await
            .unwrap();
        let rng = ScriptedDraws::new();
        rng.push_pick(0);

        let outcome = cards.draw(8, now, &rng).await.unwrap();
        assert_eq!(outcome.points, 1000 + 1000 + 700 + 300);
    }

    #[tokio::test]
    async fn test_luck_is_armed_then_spent_on_draw() {
        let (ledger, cards) = service().await;
        let now = Utc::now();
        ledger
            .transaction(|txn| txn.add_elixir(9, BoosterKind::Luck, 1, None, now).map(|_| ()))
            .await
            .unwrap();

        cards.activate_luck(9, now).await.unwrap();
        assert!(cards.activate_luck(9, now).await.is_err());

        let rng = ScriptedDraws::new();
        let outcome = cards.draw(9, now, &rng).await.unwrap();
        assert!(outcome.luck_used);
        assert!(!ledger.read(|txn| txn.luck_armed(9)).unwrap());
    }

    #[tokio::test]
    async fn test_activate_time_requires_running_cooldown() {
        let (ledger, cards) = service().await;
        let now = Utc::now();
        ledger
            .transaction(|txn| txn.add_elixir(3, BoosterKind::Time, 1, None, now).map(|_| ()))
            .await
            .unwrap();
        assert!(cards.activate_time(3, now).await.is_err());

        cards.draw(3, now, &ScriptedDraws::new()).await.unwrap();
        cards.activate_time(3, now).await.unwrap();
        let remaining = ledger.read(|txn| cooldown::peek_remaining(txn, 3, now)).unwrap();
        assert_eq!(remaining, 6 * 3600);
    }

    #[tokio::test]
    async fn test_rename_and_delete_follow_owners() {
        let (_ledger, cards) = service().await;
        let now = Utc::now();
        cards.draw(1, now, &ScriptedDraws::new()).await.unwrap();
        cards.set_favorite(1, "Sleepy Homyak.png").await.unwrap();

        assert_eq!(cards.rename("Sleepy Homyak.png", "Dozy Homyak.png").await.unwrap(), 1);
        assert_eq!(cards.favorite(1).unwrap().as_deref(), Some("Dozy Homyak.png"));
        assert_eq!(cards.user_cards(1).unwrap()[0].0.filename, "Dozy Homyak.png");
        assert_eq!(cards.find("dozy").unwrap().len(), 1);

        assert_eq!(cards.delete("Dozy Homyak.png").await.unwrap(), 1);
        assert!(cards.user_cards(1).unwrap().is_empty());
        assert_eq!(cards.favorite(1).unwrap(), None);

        let stats = cards.rarity_stats().unwrap();
        assert_eq!(stats[&1], 0);
        assert_eq!(stats[&4], 1);
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let ledger = Arc::new(Ledger::in_memory());
        let cards = CardService::new(ledger, EconomyConfig::default());
        let err = cards.draw(1, Utc::now(), &ScriptedDraws::new()).await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
