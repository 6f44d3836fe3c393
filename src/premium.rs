//! Premium subscription plans and activation.

use crate::errors::{HomyakResult, LedgerError};
use crate::ledger::{Ledger, LedgerTxn, PremiumRecord, UserId};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PremiumPlan {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    Lifetime,
}

impl PremiumPlan {
    pub const ALL: [PremiumPlan; 5] = [
        PremiumPlan::OneMonth,
        PremiumPlan::ThreeMonths,
        PremiumPlan::SixMonths,
        PremiumPlan::OneYear,
        PremiumPlan::Lifetime,
    ];

    pub fn parse(s: &str) -> HomyakResult<Self> {
        match s {
            "1_month" => Ok(PremiumPlan::OneMonth),
            "3_months" => Ok(PremiumPlan::ThreeMonths),
            "6_months" => Ok(PremiumPlan::SixMonths),
            "1_year" => Ok(PremiumPlan::OneYear),
            "lifetime" => Ok(PremiumPlan::Lifetime),
            other => Err(LedgerError::UnknownPlan(other.to_string()).into()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PremiumPlan::OneMonth => "1_month",
            PremiumPlan::ThreeMonths => "3_months",
            PremiumPlan::SixMonths => "6_months",
            PremiumPlan::OneYear => "1_year",
            PremiumPlan::Lifetime => "lifetime",
        }
    }

    /// `None` for lifetime
    pub fn days(&self) -> Option<i64> {
        match self {
            PremiumPlan::OneMonth => Some(30),
            PremiumPlan::ThreeMonths => Some(90),
            PremiumPlan::SixMonths => Some(180),
            PremiumPlan::OneYear => Some(365),
            PremiumPlan::Lifetime => None,
        }
    }

    pub fn stars(&self) -> u32 {
        match self {
            PremiumPlan::OneMonth => 8,
            PremiumPlan::ThreeMonths => 30,
            PremiumPlan::SixMonths => 50,
            PremiumPlan::OneYear => 90,
            PremiumPlan::Lifetime => 200,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PremiumPlan::OneMonth => "1 месяц",
            PremiumPlan::ThreeMonths => "3 месяца",
            PremiumPlan::SixMonths => "6 месяцев",
            PremiumPlan::OneYear => "1 год",
            PremiumPlan::Lifetime => "навсегда",
        }
    }
}

impl fmt::Display for PremiumPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extend premium by `days` counted from the later of now and the current expiry
pub fn extend(txn: &mut LedgerTxn<'_>, user: UserId, days: i64, now: DateTime<Utc>) -> HomyakResult<PremiumRecord> {
    let mut record = txn.premium(user)?;
    if !record.lifetime {
        let from = record.expires_at.filter(|at| *at > now).unwrap_or(now);
        record.expires_at = Some(from + Duration::days(days));
    }
    txn.put_premium(user, &record)?;
    Ok(record)
}

pub fn activate_plan(
    txn: &mut LedgerTxn<'_>,
    user: UserId,
    plan: PremiumPlan,
    now: DateTime<Utc>,
) -> HomyakResult<PremiumRecord> {
    match plan.days() {
        Some(days) => extend(txn, user, days, now),
        None => {
            let record = PremiumRecord { lifetime: true, expires_at: None };
            txn.put_premium(user, &record)?;
            Ok(record)
        }
    }
}

#[derive(Clone)]
pub struct PremiumService {
    ledger: Arc<Ledger>,
}

impl PremiumService {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    pub fn status(&self, user: UserId) -> HomyakResult<PremiumRecord> {
        self.ledger.read(|txn| txn.premium(user))
    }

    pub fn is_active(&self, user: UserId, now: DateTime<Utc>) -> HomyakResult<bool> {
        self.ledger.is_premium_active(user, now)
    }

    pub async fn activate(&self, user: UserId, plan: PremiumPlan, now: DateTime<Utc>) -> HomyakResult<PremiumRecord> {
        let record = self
            .ledger
            .transaction(|txn| activate_plan(txn, user, plan, now))
            .await?;
        tracing::info!(user_id = user, plan = %plan, "Premium activated");
        Ok(record)
    }

    /// Admin grant by day count
    pub async fn grant_days(&self, user: UserId, days: i64, now: DateTime<Utc>) -> HomyakResult<PremiumRecord> {
        self.ledger.transaction(|txn| extend(txn, user, days, now)).await
    }

    pub async fn remove(&self, user: UserId) -> HomyakResult<()> {
        self.ledger
            .transaction(|txn| txn.put_premium(user, &PremiumRecord::default()))
            .await?;
        tracing::info!(user_id = user, "Premium removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_catalogue() {
        for plan in PremiumPlan::ALL {
            assert_eq!(PremiumPlan::parse(plan.as_str()).unwrap(), plan);
        }
        assert_eq!(PremiumPlan::OneYear.stars(), 90);
        assert!(PremiumPlan::parse("2_weeks").is_err());
    }

    #[tokio::test]
    async fn test_extension_stacks() {
        let service = PremiumService::new(Arc::new(Ledger::in_memory()));
        let now = Utc::now();
        service.activate(1, PremiumPlan::OneMonth, now).await.unwrap();
        let record = service.activate(1, PremiumPlan::ThreeMonths, now).await.unwrap();
        assert_eq!(record.expires_at, Some(now + Duration::days(120)));
        assert!(service.is_active(1, now + Duration::days(119)).unwrap());
        assert!(!service.is_active(1, now + Duration::days(121)).unwrap());
    }

    #[tokio::test]
    async fn test_lapsed_premium_restarts_from_now() {
        let service = PremiumService::new(Arc::new(Ledger::in_memory()));
        let then = Utc::now() - Duration::days(100);
        service.activate(2, PremiumPlan::OneMonth, then).await.unwrap();
        let now = Utc::now();
        let record = service.grant_days(2, 10, now).await.unwrap();
        assert_eq!(record.expires_at, Some(now + Duration::days(10)));
    }

    #[tokio::test]
    async fn test_lifetime_and_remove() {
        let service = PremiumService::new(Arc::new(Ledger::in_memory()));
        let now = Utc::now();
        service.activate(3, PremiumPlan::Lifetime, now).await.unwrap();
        service.activate(3, PremiumPlan::OneMonth, now).await.unwrap();
        assert!(service.status(3).unwrap().lifetime);
        service.remove(3).await.unwrap();
        assert!(!service.is_active(3, now).unwrap());
    }
}
