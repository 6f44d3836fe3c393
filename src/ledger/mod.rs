//! Persistent per-user records.
//!
//! Every mutation runs inside [`Ledger::transaction`]: writes are buffered in
//! a [`LedgerTxn`] overlay and land in the store as one atomic batch. A single
//! writer lock serialises transactions, so read-modify-write on a balance can
//! never lose an update to a concurrent double tap.

pub mod keys;
pub mod records;

pub use records::{
    BonusStatus, BoosterKind, ChatId, CooldownRecord, Elixir, OwnedCard, PremiumRecord,
    ScoreBoost, ScoreRecord, UserId,
};

use crate::errors::{HomyakResult, LedgerError, StorageError};
use crate::storage::{KvStore, MemoryStore, WriteOp};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Ledger {
    store: Arc<dyn KvStore>,
    writer: Mutex<()>,
}

impl Ledger {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Run `f` against a fresh overlay and commit its writes atomically.
    /// Nothing is written if `f` returns an error.
    pub async fn transaction<T, F>(&self, f: F) -> HomyakResult<T>
    where
        F: FnOnce(&mut LedgerTxn<'_>) -> HomyakResult<T>,
    {
        let _guard = self.writer.lock().await;
        let mut txn = LedgerTxn::new(self.store.as_ref());
        let out = f(&mut txn)?;
        let writes = txn.commit()?;
        if writes > 0 {
            tracing::trace!(writes, "Ledger transaction committed");
        }
        Ok(out)
    }

    /// Read committed state. Writes made by `f` are discarded.
    pub fn read<T, F>(&self, f: F) -> HomyakResult<T>
    where
        F: FnOnce(&mut LedgerTxn<'_>) -> HomyakResult<T>,
    {
        let mut txn = LedgerTxn::new(self.store.as_ref());
        f(&mut txn)
    }

    pub fn get_balance(&self, user: UserId) -> HomyakResult<u64> {
        self.read(|txn| txn.balance(user))
    }

    /// Apply a signed delta, clamping the result at zero
    pub async fn add_balance(&self, user: UserId, delta: i64) -> HomyakResult<u64> {
        self.transaction(|txn| txn.add_balance(user, delta)).await
    }

    /// Fails with `InsufficientFunds` instead of clamping
    pub async fn debit(&self, user: UserId, amount: u64) -> HomyakResult<u64> {
        self.transaction(|txn| txn.debit(user, amount)).await
    }

    pub fn get_score(&self, user: UserId) -> HomyakResult<ScoreRecord> {
        self.read(|txn| txn.score(user))
    }

    pub async fn add_score(&self, user: UserId, points: u64, label: Option<&str>) -> HomyakResult<u64> {
        self.transaction(|txn| txn.add_score(user, points, label)).await
    }

    pub async fn consume_booster_fifo(
        &self,
        user: UserId,
        kind: BoosterKind,
        now: DateTime<Utc>,
    ) -> HomyakResult<bool> {
        self.transaction(|txn| txn.consume_booster_fifo(user, kind, now)).await
    }

    pub fn is_premium_active(&self, user: UserId, now: DateTime<Utc>) -> HomyakResult<bool> {
        self.read(|txn| txn.is_premium_active(user, now))
    }

    pub fn get_bonus(&self, user: UserId) -> HomyakResult<BonusStatus> {
        self.read(|txn| txn.bonus(user))
    }
}

/// Buffered view over the store. Reads see this transaction's own writes.
pub struct LedgerTxn<'a> {
    store: &'a dyn KvStore,
    overlay: BTreeMap<String, Option<Vec<u8>>>,
}

impl<'a> LedgerTxn<'a> {
    fn new(store: &'a dyn KvStore) -> Self {
        Self {
            store,
            overlay: BTreeMap::new(),
        }
    }

    fn commit(self) -> HomyakResult<usize> {
        let ops: Vec<WriteOp> = self
            .overlay
            .into_iter()
            .map(|(key, value)| match value {
                Some(bytes) => WriteOp::Put(key.into_bytes(), bytes),
                None => WriteOp::Delete(key.into_bytes()),
            })
            .collect();
        let count = ops.len();
        if count > 0 {
            self.store.write_batch(ops)?;
        }
        Ok(count)
    }

    // --- raw access ---

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> HomyakResult<Option<T>> {
        let bytes = match self.overlay.get(key) {
            Some(buffered) => buffered.clone(),
            None => self.store.get(key.as_bytes())?,
        };
        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                StorageError::CorruptedData(format!("Failed to decode {}: {}", key, e)).into()
            }),
            None => Ok(None),
        }
    }

    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> HomyakResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| {
            StorageError::WriteFailed(format!("Failed to encode {}: {}", key, e))
        })?;
        self.overlay.insert(key.to_string(), Some(bytes));
        Ok(())
    }

    pub fn delete(&mut self, key: &str) {
        self.overlay.insert(key.to_string(), None);
    }

    pub fn exists(&self, key: &str) -> HomyakResult<bool> {
        match self.overlay.get(key) {
            Some(buffered) => Ok(buffered.is_some()),
            None => Ok(self.store.get(key.as_bytes())?.is_some()),
        }
    }

    /// Committed rows merged with this transaction's writes, in key order
    pub fn scan<T: DeserializeOwned>(&self, prefix: &str) -> HomyakResult<Vec<(String, T)>> {
        let mut merged: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for (key, value) in self.store.scan_prefix(prefix.as_bytes())? {
            let key = String::from_utf8(key)
                .map_err(|e| StorageError::CorruptedData(format!("Non-UTF8 key: {}", e)))?;
            merged.insert(key, value);
        }
        for (key, value) in self.overlay.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            match value {
                Some(bytes) => merged.insert(key.clone(), bytes.clone()),
                None => merged.remove(key),
            };
        }

        merged
            .into_iter()
            .map(|(key, bytes)| {
                let value = serde_json::from_slice(&bytes).map_err(|e| {
                    StorageError::CorruptedData(format!("Failed to decode {}: {}", key, e))
                })?;
                Ok((key, value))
            })
            .collect()
    }

    /// Monotonic id generator
    pub fn next_id(&mut self, name: &str) -> HomyakResult<u64> {
        let key = keys::sequence(name);
        let next = self.get::<u64>(&key)?.unwrap_or(0) + 1;
        self.put(&key, &next)?;
        Ok(next)
    }

    // --- coins ---

    pub fn balance(&self, user: UserId) -> HomyakResult<u64> {
        Ok(self.get(&keys::money(user))?.unwrap_or(0))
    }

    pub fn set_balance(&mut self, user: UserId, coins: u64) -> HomyakResult<()> {
        self.put(&keys::money(user), &coins)
    }

    pub fn add_balance(&mut self, user: UserId, delta: i64) -> HomyakResult<u64> {
        let current = self.balance(user)? as i64;
        let updated = current.saturating_add(delta).max(0) as u64;
        self.set_balance(user, updated)?;
        Ok(updated)
    }

    pub fn credit(&mut self, user: UserId, amount: u64) -> HomyakResult<u64> {
        let updated = self.balance(user)?.saturating_add(amount);
        self.set_balance(user, updated)?;
        Ok(updated)
    }

    /// Strict debit, never clamps
    pub fn debit(&mut self, user: UserId, amount: u64) -> HomyakResult<u64> {
        let available = self.balance(user)?;
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                needed: amount,
                available,
            }
            .into());
        }
        self.set_balance(user, available - amount)?;
        Ok(available - amount)
    }

    // --- score ---

    pub fn score(&self, user: UserId) -> HomyakResult<ScoreRecord> {
        Ok(self.get(&keys::score(user))?.unwrap_or_default())
    }

    pub fn add_score(&mut self, user: UserId, points: u64, label: Option<&str>) -> HomyakResult<u64> {
        let mut record = self.score(user)?;
        record.total = record.total.saturating_add(points);
        if let Some(label) = label {
            record.last_card = Some(label.to_string());
        }
        self.put(&keys::score(user), &record)?;
        Ok(record.total)
    }

    // --- cooldown ---

    pub fn cooldown(&self, user: UserId) -> HomyakResult<CooldownRecord> {
        Ok(self.get(&keys::cooldown(user))?.unwrap_or_default())
    }

    pub fn put_cooldown(&mut self, user: UserId, record: &CooldownRecord) -> HomyakResult<()> {
        self.put(&keys::cooldown(user), record)
    }

    // --- elixirs ---

    pub fn add_elixir(
        &mut self,
        user: UserId,
        kind: BoosterKind,
        uses: u32,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> HomyakResult<Elixir> {
        let elixir = Elixir {
            id: self.next_id("elixir")?,
            owner: user,
            kind,
            uses: uses.max(1),
            created_at: now,
            expires_at,
        };
        self.put(&keys::elixir(user, kind, elixir.id), &elixir)?;
        Ok(elixir)
    }

    /// Live elixirs, oldest first. Expired ones are deleted on the way.
    pub fn elixirs(&mut self, user: UserId, now: DateTime<Utc>) -> HomyakResult<Vec<Elixir>> {
        let mut live = Vec::new();
        for (key, elixir) in self.scan::<Elixir>(&keys::elixir_user_prefix(user))? {
            if elixir.is_expired(now) {
                self.delete(&key);
            } else {
                live.push(elixir);
            }
        }
        live.sort_by_key(|e| e.id);
        Ok(live)
    }

    pub fn booster_count(&mut self, user: UserId, kind: BoosterKind, now: DateTime<Utc>) -> HomyakResult<u32> {
        Ok(self
            .elixirs(user, now)?
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.uses)
            .sum())
    }

    pub fn has_booster(&mut self, user: UserId, kind: BoosterKind, now: DateTime<Utc>) -> HomyakResult<bool> {
        Ok(self.booster_count(user, kind, now)? > 0)
    }

    /// Take one use from the oldest live elixir of `kind`
    pub fn consume_booster_fifo(
        &mut self,
        user: UserId,
        kind: BoosterKind,
        now: DateTime<Utc>,
    ) -> HomyakResult<bool> {
        let oldest = self
            .scan::<Elixir>(&keys::elixir_kind_prefix(user, kind))?
            .into_iter()
            .find(|(_, e)| !e.is_expired(now));

        let Some((key, mut elixir)) = oldest else {
            return Ok(false);
        };

        if elixir.uses <= 1 {
            self.delete(&key);
        } else {
            elixir.uses -= 1;
            self.put(&key, &elixir)?;
        }
        tracing::debug!(user_id = user, kind = %kind, elixir_id = elixir.id, "Booster consumed");
        Ok(true)
    }

    pub fn luck_armed(&self, user: UserId) -> HomyakResult<bool> {
        self.exists(&keys::luck_armed(user))
    }

    pub fn set_luck_armed(&mut self, user: UserId, armed: bool) -> HomyakResult<()> {
        if armed {
            self.put(&keys::luck_armed(user), &true)
        } else {
            self.delete(&keys::luck_armed(user));
            Ok(())
        }
    }

    // --- premium / bonus ---

    pub fn premium(&self, user: UserId) -> HomyakResult<PremiumRecord> {
        Ok(self.get(&keys::premium(user))?.unwrap_or_default())
    }

    pub fn put_premium(&mut self, user: UserId, record: &PremiumRecord) -> HomyakResult<()> {
        self.put(&keys::premium(user), record)
    }

    pub fn is_premium_active(&self, user: UserId, now: DateTime<Utc>) -> HomyakResult<bool> {
        Ok(self.premium(user)?.is_active(now))
    }

    pub fn bonus(&self, user: UserId) -> HomyakResult<BonusStatus> {
        Ok(self.get(&keys::bonus(user))?.unwrap_or_default())
    }

    pub fn put_bonus(&mut self, user: UserId, status: &BonusStatus) -> HomyakResult<()> {
        self.put(&keys::bonus(user), status)
    }

    pub fn score_boost(&self, user: UserId, now: DateTime<Utc>) -> HomyakResult<Option<ScoreBoost>> {
        Ok(self
            .get::<ScoreBoost>(&keys::score_boost(user))?
            .filter(|boost| boost.expires_at > now))
    }

    // --- cards ---

    pub fn owned_card(&self, user: UserId, filename: &str) -> HomyakResult<Option<OwnedCard>> {
        self.get(&keys::card(user, filename))
    }

    /// Add a copy of `filename` to the user's collection
    pub fn grant_card(&mut self, user: UserId, filename: &str, now: DateTime<Utc>) -> HomyakResult<OwnedCard> {
        let card = match self.owned_card(user, filename)? {
            Some(mut card) => {
                card.copies += 1;
                card
            }
            None => OwnedCard {
                filename: filename.to_string(),
                obtained_at: now,
                copies: 1,
            },
        };
        self.put(&keys::card(user, filename), &card)?;
        Ok(card)
    }

    pub fn user_cards(&self, user: UserId) -> HomyakResult<Vec<OwnedCard>> {
        Ok(self
            .scan::<OwnedCard>(&keys::card_user_prefix(user))?
            .into_iter()
            .map(|(_, card)| card)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HomyakError;
    use chrono::Duration;

    #[tokio::test]
    async fn test_add_balance_clamps_at_zero() {
        let ledger = Ledger::in_memory();
        assert_eq!(ledger.add_balance(1, 30).await.unwrap(), 30);
        assert_eq!(ledger.add_balance(1, -100).await.unwrap(), 0);
        assert_eq!(ledger.get_balance(1).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_debit_refuses_overdraft() {
        let ledger = Ledger::in_memory();
        ledger.add_balance(1, 30).await.unwrap();
        assert_eq!(ledger.debit(1, 20).await.unwrap(), 10);
        assert!(ledger.debit(1, 11).await.is_err());
        assert_eq!(ledger.get_balance(1).unwrap(), 10);
    }

    #[tokio::test]
    async fn test_failed_transaction_writes_nothing() {
        let ledger = Ledger::in_memory();
        ledger.add_balance(1, 10).await.unwrap();

        let result = ledger
            .transaction(|txn| {
                txn.credit(1, 5)?;
                txn.debit(1, 100)
            })
            .await;

        assert!(matches!(
            result,
            Err(HomyakError::Ledger(LedgerError::InsufficientFunds { needed: 100, available: 15 }))
        ));
        assert_eq!(ledger.get_balance(1).unwrap(), 10);
    }

    #[tokio::test]
    async fn test_concurrent_credits_are_not_lost() {
        let ledger = Arc::new(Ledger::in_memory());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move { ledger.add_balance(9, 2).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(ledger.get_balance(9).unwrap(), 100);
    }

    #[tokio::test]
    async fn test_score_tracks_last_card() {
        let ledger = Ledger::in_memory();
        ledger.add_score(3, 1000, Some("Homyak Pilot")).await.unwrap();
        ledger.add_score(3, 500, None).await.unwrap();
        let score = ledger.get_score(3).unwrap();
        assert_eq!(score.total, 1500);
        assert_eq!(score.last_card.as_deref(), Some("Homyak Pilot"));
    }

    #[tokio::test]
    async fn test_booster_fifo_and_expiry() {
        let ledger = Ledger::in_memory();
        let now = Utc::now();
        ledger
            .transaction(|txn| {
                txn.add_elixir(2, BoosterKind::Time, 1, Some(now - Duration::hours(1)), now)?;
                txn.add_elixir(2, BoosterKind::Time, 2, None, now)?;
                txn.add_elixir(2, BoosterKind::Luck, 1, None, now)?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(ledger.consume_booster_fifo(2, BoosterKind::Time, now).await.unwrap());
        let remaining = ledger
            .transaction(|txn| txn.booster_count(2, BoosterKind::Time, now))
            .await
            .unwrap();
        assert_eq!(remaining, 1);

        assert!(ledger.consume_booster_fifo(2, BoosterKind::Time, now).await.unwrap());
        assert!(!ledger.consume_booster_fifo(2, BoosterKind::Time, now).await.unwrap());
        assert!(ledger.consume_booster_fifo(2, BoosterKind::Luck, now).await.unwrap());

        let left = ledger.transaction(|txn| txn.elixirs(2, now)).await.unwrap();
        assert!(left.is_empty());
    }

    #[tokio::test]
    async fn test_scan_sees_uncommitted_writes() {
        let ledger = Ledger::in_memory();
        let now = Utc::now();
        ledger
            .transaction(|txn| {
                txn.grant_card(4, "a.png", now)?;
                txn.grant_card(4, "b.png", now)?;
                txn.grant_card(4, "a.png", now)?;
                let cards = txn.user_cards(4)?;
                assert_eq!(cards.len(), 2);
                assert_eq!(cards[0].copies, 2);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(ledger.read(|txn| txn.user_cards(4)).unwrap().len(), 2);
    }

    #[test]
    fn test_premium_activity() {
        let now = Utc::now();
        let lapsed = PremiumRecord { lifetime: false, expires_at: Some(now - Duration::days(1)) };
        let running = PremiumRecord { lifetime: false, expires_at: Some(now + Duration::days(1)) };
        let lifetime = PremiumRecord { lifetime: true, expires_at: None };
        assert!(!lapsed.is_active(now));
        assert!(running.is_active(now));
        assert!(lifetime.is_active(now));
        assert!(!PremiumRecord::default().is_active(now));
    }
}
