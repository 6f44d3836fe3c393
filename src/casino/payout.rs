//! Multipliers are kept in hundredths so payouts are exact integer math.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Multiplier(u64);

impl Multiplier {
    pub const ZERO: Multiplier = Multiplier(0);
    pub const REFUND: Multiplier = Multiplier(100);
    pub const DOUBLE: Multiplier = Multiplier(200);
    pub const REDUCED: Multiplier = Multiplier(175);
    pub const JACKPOT: Multiplier = Multiplier(300);

    pub const fn from_hundredths(h: u64) -> Self {
        Multiplier(h)
    }

    pub fn hundredths(self) -> u64 {
        self.0
    }

    /// Gross credit for `stake`, rounded down
    pub fn apply(self, stake: u64) -> u64 {
        stake.saturating_mul(self.0) / 100
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}x", self.0 / 100, self.0 % 100)
    }
}

/// Bets above this pay the reduced multiplier
pub const HIGH_BET_THRESHOLD: u64 = 50;

/// 2.0x up to 50 coins, 1.75x above
pub fn win_multiplier(bet: u64) -> Multiplier {
    if bet > HIGH_BET_THRESHOLD {
        Multiplier::REDUCED
    } else {
        Multiplier::DOUBLE
    }
}
