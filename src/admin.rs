//! Admin registry and maintenance operations that don't belong to a single
//! feature service.

use crate::errors::{AccessError, HomyakResult};
use crate::ledger::{keys, Ledger, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AdminRecord {
    added_by: UserId,
    added_at: DateTime<Utc>,
}

/// What `reset_user` removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub cards: usize,
    pub score: u64,
}

#[derive(Clone)]
pub struct AdminService {
    ledger: Arc<Ledger>,
    owners: Vec<UserId>,
}

impl AdminService {
    pub fn new(ledger: Arc<Ledger>, owners: Vec<UserId>) -> Self {
        Self { ledger, owners }
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owners.contains(&user)
    }

    pub fn is_admin(&self, user: UserId) -> HomyakResult<bool> {
        if self.is_owner(user) {
            return Ok(true);
        }
        self.ledger.read(|txn| txn.exists(&keys::admin(user)))
    }

    pub fn require_admin(&self, user: UserId) -> HomyakResult<()> {
        if self.is_admin(user)? {
            Ok(())
        } else {
            Err(AccessError::NotAdmin(user).into())
        }
    }

    /// Only owners may change the registry
    pub async fn add_admin(&self, by: UserId, user: UserId, now: DateTime<Utc>) -> HomyakResult<()> {
        if !self.is_owner(by) {
            return Err(AccessError::NotAdmin(by).into());
        }
        self.ledger
            .transaction(|txn| txn.put(&keys::admin(user), &AdminRecord { added_by: by, added_at: now }))
            .await?;
        tracing::info!(user_id = user, by, "Admin added");
        Ok(())
    }

    pub async fn remove_admin(&self, by: UserId, user: UserId) -> HomyakResult<()> {
        if !self.is_owner(by) {
            return Err(AccessError::NotAdmin(by).into());
        }
        self.ledger
            .transaction(|txn| {
                txn.delete(&keys::admin(user));
                Ok(())
            })
            .await?;
        tracing::info!(user_id = user, by, "Admin removed");
        Ok(())
    }

    /// Registered admins, owners first
    pub fn admins(&self) -> HomyakResult<Vec<UserId>> {
        let mut all = self.owners.clone();
        let registered = self.ledger.read(|txn| txn.scan::<serde_json::Value>(keys::ADMIN_PREFIX))?;
        for (key, _) in registered {
            if let Some(user) = keys::user_from_key(&key, keys::ADMIN_PREFIX) {
                if !all.contains(&user) {
                    all.push(user);
                }
            }
        }
        Ok(all)
    }

    /// Wipe score, cards, favourite, cooldown, premium and bonus. Coins stay.
    pub async fn reset_user(&self, user: UserId) -> HomyakResult<ResetSummary> {
        let summary = self
            .ledger
            .transaction(|txn| {
                let score = txn.score(user)?.total;
                txn.delete(&keys::score(user));
                let cards = txn.scan::<serde_json::Value>(&keys::card_user_prefix(user))?;
                for (key, _) in &cards {
                    txn.delete(key);
                }
                txn.delete(&keys::favorite(user));
                txn.delete(&keys::cooldown(user));
                txn.delete(&keys::premium(user));
                txn.delete(&keys::bonus(user));
                txn.delete(&keys::score_boost(user));
                Ok(ResetSummary { cards: cards.len(), score })
            })
            .await?;
        tracing::warn!(user_id = user, cards = summary.cards, score = summary.score, "User stats reset");
        Ok(summary)
    }

    /// Signed adjustment, clamped at zero
    pub async fn grant_coins(&self, user: UserId, delta: i64) -> HomyakResult<u64> {
        let balance = self.ledger.add_balance(user, delta).await?;
        tracing::info!(user_id = user, delta, balance, "Coins adjusted by admin");
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HomyakError;

    #[tokio::test]
    async fn test_registry() {
        let admin = AdminService::new(Arc::new(Ledger::in_memory()), vec![1]);
        let now = Utc::now();
        assert!(admin.is_admin(1).unwrap());
        assert!(!admin.is_admin(2).unwrap());
        assert!(matches!(admin.require_admin(2), Err(HomyakError::Access(AccessError::NotAdmin(2)))));

        admin.add_admin(1, 2, now).await.unwrap();
        assert!(admin.is_admin(2).unwrap());
        assert!(admin.add_admin(2, 3, now).await.is_err());
        assert_eq!(admin.admins().unwrap(), vec![1, 2]);

        admin.remove_admin(1, 2).await.unwrap();
        assert!(!admin.is_admin(2).unwrap());
    }

    #[tokio::test]
    async fn test_reset_user_keeps_coins() {
        let ledger = Arc::new(Ledger::in_memory());
        let now = Utc::now();
        ledger
            .transaction(|txn| {
                txn.credit(5, 90)?;
                txn.add_score(5, 3000, Some("x"))?;
                txn.grant_card(5, "x.png", now)?;
                txn.grant_card(5, "y.png", now)?;
                txn.grant_card(6, "x.png", now)?;
                Ok(())
            })
            .await
            .unwrap();
        let admin = AdminService::new(ledger.clone(), vec![]);
        let summary = admin.reset_user(5).await.unwrap();
        assert_eq!(summary, ResetSummary { cards: 2, score: 3000 });
        assert_eq!(ledger.get_balance(5).unwrap(), 90);
        assert_eq!(ledger.get_score(5).unwrap().total, 0);
        assert_eq!(ledger.read(|txn| txn.user_cards(6)).unwrap().len(), 1);

        assert_eq!(admin.grant_coins(5, -100).await.unwrap(), 0);
    }
}
