use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type UserId = i64;
pub type ChatId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BoosterKind {
    /// Better odds on the next card draw
    Luck,
    /// One hour off the card cooldown
    Time,
}

impl BoosterKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "luck" => Some(BoosterKind::Luck),
            "time" => Some(BoosterKind::Time),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoosterKind::Luck => "luck",
            BoosterKind::Time => "time",
        }
    }
}

impl fmt::Display for BoosterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreRecord {
    pub total: u64,
    pub last_card: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CooldownRecord {
    pub last_draw: Option<DateTime<Utc>>,
    /// Admin toggle: draws never wait
    #[serde(default)]
    pub infinite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Elixir {
    pub id: u64,
    pub owner: UserId,
    pub kind: BoosterKind,
    pub uses: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Elixir {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PremiumRecord {
    pub lifetime: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PremiumRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.lifetime || self.expires_at.map_or(false, |at| at > now)
    }
}

/// Channel bonus. `premium_snapshot` is whether premium was active when the
/// bonus was switched on; it keeps the larger bonus even after premium ends.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BonusStatus {
    pub active: bool,
    pub premium_snapshot: bool,
}

/// Extra points per drawn card, granted by a promo code for a limited time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreBoost {
    pub extra_points: u64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnedCard {
    pub filename: String,
    pub obtained_at: DateTime<Utc>,
    pub copies: u32,
}
