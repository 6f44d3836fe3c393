//! Card draw cooldown.
//!
//! Base wait depends on premium and bonus; a held "time" booster takes one
//! hour off. Reading the remaining wait ([`peek_remaining`]) never touches
//! boosters. Only [`commit_draw`] spends one, and only when that is what
//! lets the draw happen.

use crate::errors::{CardError, HomyakResult};
use crate::ledger::{keys, BoosterKind, CooldownRecord, Ledger, LedgerTxn, UserId};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub const TIME_BOOSTER_HOURS: i64 = 1;

pub fn base_wait(is_premium: bool, bonus_active: bool) -> Duration {
    let hours = match (is_premium, bonus_active) {
        (true, true) => 4,
        (true, false) => 5,
        (false, true) => 6,
        (false, false) => 7,
    };
    Duration::hours(hours)
}

/// Wait after applying an optional time booster, floored at zero
pub fn effective_wait(is_premium: bool, bonus_active: bool, time_booster: bool) -> Duration {
    let wait = base_wait(is_premium, bonus_active);
    if time_booster {
        (wait - Duration::hours(TIME_BOOSTER_HOURS)).max(Duration::zero())
    } else {
        wait
    }
}

/// Seconds left before the next draw
pub fn remaining_secs(record: &CooldownRecord, wait: Duration, now: DateTime<Utc>) -> i64 {
    if record.infinite {
        return 0;
    }
    match record.last_draw {
        Some(last) => (last + wait - now).num_seconds().max(0),
        None => 0,
    }
}

/// Result of a successful draw commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCommit {
    pub booster_used: bool,
}

fn waits(txn: &LedgerTxn<'_>, user: UserId, now: DateTime<Utc>) -> HomyakResult<(bool, bool)> {
    Ok((txn.is_premium_active(user, now)?, txn.bonus(user)?.active))
}

pub fn peek_remaining(txn: &mut LedgerTxn<'_>, user: UserId, now: DateTime<Utc>) -> HomyakResult<i64> {
    let record = txn.cooldown(user)?;
    let (premium, bonus) = waits(txn, user, now)?;
    let booster = txn.has_booster(user, BoosterKind::Time, now)?;
    Ok(remaining_secs(&record, effective_wait(premium, bonus, booster), now))
}

/// Check the cooldown and stamp `now` as the last draw
pub fn commit_draw(txn: &mut LedgerTxn<'_>, user: UserId, now: DateTime<Utc>) -> HomyakResult<DrawCommit> {
    let mut record = txn.cooldown(user)?;
    let (premium, bonus) = waits(txn, user, now)?;

    let mut booster_used = false;
    if remaining_secs(&record, base_wait(premium, bonus), now) > 0 {
        let booster = txn.has_booster(user, BoosterKind::Time, now)?;
        let remaining = remaining_secs(&record, effective_wait(premium, bonus, booster), now);
        if remaining > 0 {
            return Err(CardError::CooldownActive { remaining_secs: remaining }.into());
        }
        booster_used = txn.consume_booster_fifo(user, BoosterKind::Time, now)?;
    }

    record.last_draw = Some(now);
    txn.put_cooldown(user, &record)?;
    Ok(DrawCommit { booster_used })
}

/// Shift the last draw back, shortening the current wait
pub fn reduce(txn: &mut LedgerTxn<'_>, user: UserId, secs: i64) -> HomyakResult<()> {
    let mut record = txn.cooldown(user)?;
    if let Some(last) = record.last_draw {
        record.last_draw = Some(last - Duration::seconds(secs));
        txn.put_cooldown(user, &record)?;
    }
    Ok(())
}

pub fn reset(txn: &mut LedgerTxn<'_>, user: UserId) -> HomyakResult<()> {
    let mut record = txn.cooldown(user)?;
    record.last_draw = None;
    txn.put_cooldown(user, &record)
}

/// Async facade over the ledger for callers outside a transaction
#[derive(Clone)]
pub struct Cooldowns {
    ledger: Arc<Ledger>,
}

impl Cooldowns {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    pub fn peek_remaining(&self, user: UserId, now: DateTime<Utc>) -> HomyakResult<i64> {
        self.ledger.read(|txn| peek_remaining(txn, user, now))
    }

    pub async fn commit_draw(&self, user: UserId, now: DateTime<Utc>) -> HomyakResult<DrawCommit> {
        self.ledger.transaction(|txn| commit_draw(txn, user, now)).await
    }

    pub async fn reset(&self, user: UserId) -> HomyakResult<()> {
        self.ledger.transaction(|txn| reset(txn, user)).await
    }

    pub async fn reduce(&self, user: UserId, secs: i64) -> HomyakResult<()> {
        self.ledger.transaction(|txn| reduce(txn, user, secs)).await
    }

    pub async fn set_infinite(&self, user: UserId, infinite: bool) -> HomyakResult<()> {
        self.ledger
            .transaction(|txn| {
                let mut record = txn.cooldown(user)?;
                record.infinite = infinite;
                txn.put_cooldown(user, &record)
            })
            .await
    }

    /// Clear every user's last draw. Returns how many records changed.
    pub async fn reset_all(&self) -> HomyakResult<usize> {
        let cleared = self
            .ledger
            .transaction(|txn| {
                let rows = txn.scan::<CooldownRecord>(keys::COOLDOWN_PREFIX)?;
                let mut cleared = 0;
                for (key, mut record) in rows {
                    if record.last_draw.is_some() {
                        record.last_draw = None;
                        txn.put(&key, &record)?;
                        cleared += 1;
                    }
                }
                Ok(cleared)
            })
            .await?;
        tracing::info!(cleared, "All cooldowns reset");
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{BonusStatus, PremiumRecord};

    fn drawn_at(at: DateTime<Utc>) -> CooldownRecord {
        CooldownRecord { last_draw: Some(at), infinite: false }
    }

    #[test]
    fn test_base_waits() {
        assert_eq!(base_wait(false, false), Duration::hours(7));
        assert_eq!(base_wait(false, true), Duration::hours(6));
        assert_eq!(base_wait(true, false), Duration::hours(5));
        assert_eq!(base_wait(true, true), Duration::hours(4));
        assert_eq!(effective_wait(true, true, true), Duration::hours(3));
    }

    #[test]
    fn test_remaining() {
        let now = Utc::now();
        let wait = Duration::hours(7);
        assert_eq!(remaining_secs(&CooldownRecord::default(), wait, now), 0);
        assert_eq!(remaining_secs(&drawn_at(now - Duration::hours(2)), wait, now), 5 * 3600);
        assert_eq!(remaining_secs(&drawn_at(now - Duration::hours(8)), wait, now), 0);
        let infinite = CooldownRecord { last_draw: Some(now), infinite: true };
        assert_eq!(remaining_secs(&infinite, wait, now), 0);
    }

    #[tokio::test]
    async fn test_peek_does_not_consume_booster() {
        let ledger = Arc::new(Ledger::in_memory());
        let cooldowns = Cooldowns::new(ledger.clone());
        let now = Utc::now();
        ledger
            .transaction(|txn| {
                txn.put_cooldown(1, &drawn_at(now - Duration::hours(3)))?;
                txn.add_elixir(1, BoosterKind::Time, 1, None, now)?;
                Ok(())
            })
            .await
            .unwrap();

        for _ in 0..3 {
            assert_eq!(cooldowns.peek_remaining(1, now).unwrap(), 3 * 3600);
        }
        let held = ledger.read(|txn| txn.booster_count(1, BoosterKind::Time, now)).unwrap();
        assert_eq!(held, 1);
    }

    #[tokio::test]
    async fn test_commit_draw_spends_booster_only_when_it_unlocks() {
        let ledger = Arc::new(Ledger::in_memory());
        let cooldowns = Cooldowns::new(ledger.clone());
        let now = Utc::now();
        ledger
            .transaction(|txn| {
                txn.put_cooldown(1, &drawn_at(now - Duration::hours(3)))?;
                txn.add_elixir(1, BoosterKind::Time, 1, None, now)?;
                Ok(())
            })
            .await
            .unwrap();

        // 4h left, booster would leave 3h: refused, booster kept
        let err = cooldowns.commit_draw(1, now).await.unwrap_err();
        assert!(err.to_string().contains("10800"));
        assert_eq!(ledger.read(|txn| txn.booster_count(1, BoosterKind::Time, now)).unwrap(), 1);

        // 30 minutes left: booster spent, draw allowed
        let later = now + Duration::minutes(210);
        let commit = cooldowns.commit_draw(1, later).await.unwrap();
        assert!(commit.booster_used);
        assert_eq!(ledger.read(|txn| txn.booster_count(1, BoosterKind::Time, later)).unwrap(), 0);

        // fresh wait starts from the draw
        assert_eq!(cooldowns.peek_remaining(1, later).unwrap(), 7 * 3600);
    }

    #[tokio::test]
    async fn test_commit_draw_without_wait_keeps_booster() {
        let ledger = Arc::new(Ledger::in_memory());
        let cooldowns = Cooldowns::new(ledger.clone());
        let now = Utc::now();
        ledger
            .transaction(|txn| txn.add_elixir(1, BoosterKind::Time, 1, None, now).map(|_| ()))
            .await
            .unwrap();

        let commit = cooldowns.commit_draw(1, now).await.unwrap();
        assert!(!commit.booster_used);
        assert_eq!(ledger.read(|txn| txn.booster_count(1, BoosterKind::Time, now)).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_premium_and_bonus_shorten_wait() {
        let ledger = Arc::new(Ledger::in_memory());
        let cooldowns = Cooldowns::new(ledger.clone());
        let now = Utc::now();
        ledger
            .transaction(|txn| {
                txn.put_premium(5, &PremiumRecord { lifetime: true, expires_at: None })?;
                txn.put_bonus(5, &BonusStatus { active: true, premium_snapshot: true })?;
                txn.put_cooldown(5, &drawn_at(now))
            })
            .await
            .unwrap();
        assert_eq!(cooldowns.peek_remaining(5, now).unwrap(), 4 * 3600);
    }

    #[tokio::test]
    async fn test_reset_reduce_infinite() {
        let ledger = Arc::new(Ledger::in_memory());
        let cooldowns = Cooldowns::new(ledger.clone());
        let now = Utc::now();
        cooldowns.commit_draw(1, now).await.unwrap();
        cooldowns.commit_draw(2, now).await.unwrap();

        cooldowns.reduce(1, 3600).await.unwrap();
        assert_eq!(cooldowns.peek_remaining(1, now).unwrap(), 6 * 3600);

        cooldowns.set_infinite(2, true).await.unwrap();
        assert_eq!(cooldowns.peek_remaining(2, now).unwrap(), 0);
        cooldowns.commit_draw(2, now).await.unwrap();

        assert_eq!(cooldowns.reset_all().await.unwrap(), 2);
        assert_eq!(cooldowns.peek_remaining(1, now).unwrap(), 0);
    }
}
