//! Points awarded per card. Every call site (draws, shop, bundles, promo
//! cards, price previews) goes through [`points_for`].

use serde::{Deserialize, Serialize};
use std::fmt;

pub const PREMIUM_BONUS_POINTS: u64 = 1000;
pub const BONUS_POINTS: u64 = 500;
pub const BONUS_POINTS_WITH_PREMIUM: u64 = 700;

/// Card rarity tier, 1 (common) to 5 (secret)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rarity(u8);

impl Rarity {
    pub const COMMON: Rarity = Rarity(1);
    pub const ALL: [Rarity; 5] = [Rarity(1), Rarity(2), Rarity(3), Rarity(4), Rarity(5)];

    pub fn new(tier: u8) -> Option<Self> {
        (1..=5).contains(&tier).then_some(Rarity(tier))
    }

    pub fn tier(self) -> u8 {
        self.0
    }

    pub fn base_points(self) -> u64 {
        match self.0 {
            1 => 1000,
            2 => 2000,
            3 => 3000,
            4 => 5000,
            _ => 10000,
        }
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            1 => "Common",
            2 => "Rare",
            3 => "Mythic",
            4 => "Legendary",
            _ => "Secret",
        }
    }
}

impl Default for Rarity {
    fn default() -> Self {
        Rarity::COMMON
    }
}

impl TryFrom<u8> for Rarity {
    type Error = String;

    fn try_from(tier: u8) -> Result<Self, Self::Error> {
        Rarity::new(tier).ok_or_else(|| format!("rarity tier {} outside 1..=5", tier))
    }
}

impl From<Rarity> for u8 {
    fn from(r: Rarity) -> u8 {
        r.0
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Points for one card.
///
/// The bonus adds 700 instead of 500 when premium is active now *or* was
/// active when the bonus was switched on.
pub fn points_for(rarity: Rarity, is_premium: bool, bonus_active: bool, bonus_premium_snapshot: bool) -> u64 {
    let mut points = rarity.base_points();
    if is_premium {
        points += PREMIUM_BONUS_POINTS;
    }
    if bonus_active {
        points += if bonus_premium_snapshot || is_premium {
            BONUS_POINTS_WITH_PREMIUM
        } else {
            BONUS_POINTS
        };
    }
    points
}
