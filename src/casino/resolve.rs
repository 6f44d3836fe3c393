//! Pure round resolution: game + bet + choice + draw in, outcome out.

use super::payout::{win_multiplier, Multiplier};
use super::types::{Choice, DartsZone, DiceChoice, GameKind, RoundOutcome, RpsHand, ShotChoice};
use crate::errors::{CasinoError, HomyakResult};
use serde::{Deserialize, Serialize};

pub const SLOTS_JACKPOT: u8 = 64;
pub const SLOTS_BAR: u8 = 1;
/// Slot machine values showing three identical symbols (other than 777)
pub const SLOTS_TRIPLES: [u8; 6] = [1, 22, 27, 38, 43, 52];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundResolution {
    pub outcome: RoundOutcome,
    /// Gross credit after the stake was taken; 0 on a loss
    pub payout: u64,
    pub multiplier: Multiplier,
}

impl RoundResolution {
    fn win(bet: u64, multiplier: Multiplier) -> Self {
        Self {
            outcome: RoundOutcome::Win,
            payout: multiplier.apply(bet),
            multiplier,
        }
    }

    fn loss() -> Self {
        Self {
            outcome: RoundOutcome::Loss,
            payout: 0,
            multiplier: Multiplier::ZERO,
        }
    }

    fn push(bet: u64) -> Self {
        Self {
            outcome: RoundOutcome::Push,
            payout: bet,
            multiplier: Multiplier::REFUND,
        }
    }

    /// Balance change over the whole round
    pub fn net(&self, bet: u64) -> i64 {
        self.payout as i64 - bet as i64
    }

    pub fn won(&self) -> bool {
        self.outcome == RoundOutcome::Win
    }
}

fn binary(bet: u64, won: bool) -> RoundResolution {
    if won {
        RoundResolution::win(bet, win_multiplier(bet))
    } else {
        RoundResolution::loss()
    }
}

/// Decide a single-step round.
///
/// `draw` is the raw dice value Telegram (or the RNG) produced; for RPS it is
/// the bot's hand as 1 rock, 2 scissors, 3 paper.
pub fn resolve_round(game: GameKind, bet: u64, choice: Choice, draw: u8) -> HomyakResult<RoundResolution> {
    if choice.game() != game {
        return Err(CasinoError::ChoiceMismatch.into());
    }
    if draw == 0 || draw > game.draw_max() {
        return Err(CasinoError::InvalidDraw { game: game.to_string(), value: draw }.into());
    }

    let resolution = match choice {
        Choice::Dice(pick) => {
            let won = match pick {
                DiceChoice::High => draw > 3,
                DiceChoice::Low => draw <= 3,
                DiceChoice::Even => draw % 2 == 0,
                DiceChoice::Odd => draw % 2 == 1,
            };
            binary(bet, won)
        }
        Choice::Basketball(pick) => {
            let hit = draw == 4 || draw == 5;
            binary(bet, (pick == ShotChoice::Score) == hit)
        }
        Choice::Football(pick) => {
            let goal = draw >= 3;
            binary(bet, (pick == ShotChoice::Score) == goal)
        }
        Choice::Rps(player) => {
            let bot = RpsHand::from_draw(draw)
                .ok_or_else(|| CasinoError::InvalidDraw { game: game.to_string(), value: draw })?;
            if player == bot {
                RoundResolution::push(bet)
            } else {
                binary(bet, player.beats(bot))
            }
        }
        Choice::Darts(pick) => {
            let zone = DartsZone::from_draw(draw)
                .ok_or_else(|| CasinoError::InvalidDraw { game: game.to_string(), value: draw })?;
            binary(bet, pick == zone)
        }
        Choice::Slots => {
            if draw == SLOTS_JACKPOT {
                RoundResolution::win(bet, Multiplier::JACKPOT)
            } else if SLOTS_TRIPLES.contains(&draw) {
                RoundResolution::win(bet, win_multiplier(bet))
            } else {
                RoundResolution::loss()
            }
        }
    };

    Ok(resolution)
}
