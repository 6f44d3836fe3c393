//! Channel subscription bonus. Membership itself is checked by the transport;
//! this module only records the state.

use crate::errors::HomyakResult;
use crate::ledger::{BonusStatus, Ledger, UserId};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusChange {
    Activated { premium_snapshot: bool },
    AlreadyActive,
    Removed,
    NotActive,
}

#[derive(Clone)]
pub struct BonusService {
    ledger: Arc<Ledger>,
}

impl BonusService {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    pub fn status(&self, user: UserId) -> HomyakResult<BonusStatus> {
        self.ledger.get_bonus(user)
    }

    /// Switch the bonus on for a confirmed channel member, remembering
    /// whether premium was active at this moment
    pub async fn activate(&self, user: UserId, now: DateTime<Utc>) -> HomyakResult<BonusChange> {
        let change = self
            .ledger
            .transaction(|txn| {
                if txn.bonus(user)?.active {
                    return Ok(BonusChange::AlreadyActive);
                }
                let premium_snapshot = txn.is_premium_active(user, now)?;
                txn.put_bonus(user, &BonusStatus { active: true, premium_snapshot })?;
                Ok(BonusChange::Activated { premium_snapshot })
            })
            .await?;
        if let BonusChange::Activated { premium_snapshot } = change {
            tracing::info!(user_id = user, premium_snapshot, "Bonus activated");
        }
        Ok(change)
    }

    /// The user left the channel
    pub async fn remove(&self, user: UserId) -> HomyakResult<BonusChange> {
        let change = self
            .ledger
            .transaction(|txn| {
                if !txn.bonus(user)?.active {
                    return Ok(BonusChange::NotActive);
                }
                txn.put_bonus(user, &BonusStatus::default())?;
                Ok(BonusChange::Removed)
            })
            .await?;
        if change == BonusChange::Removed {
            tracing::info!(user_id = user, "Bonus removed");
        }
        Ok(change)
    }
}
