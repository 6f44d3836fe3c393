use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported casino games
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Dice,
    Basketball,
    Football,
    Rps,
    Slots,
    Darts,
    Mines,
}

/// Inclusive bet bounds for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetLimits {
    pub min: u64,
    pub max: u64,
}

impl GameKind {
    pub const ALL: [GameKind; 7] = [
        GameKind::Dice,
        GameKind::Basketball,
        GameKind::Football,
        GameKind::Rps,
        GameKind::Slots,
        GameKind::Darts,
        GameKind::Mines,
    ];

    pub fn bet_limits(&self) -> BetLimits {
        match self {
            GameKind::Mines => BetLimits { min: 3, max: 20 },
            _ => BetLimits { min: 1, max: 70 },
        }
    }

    /// Highest value of the animated dice Telegram rolls for this game
    pub fn draw_max(&self) -> u8 {
        match self {
            GameKind::Dice | GameKind::Darts => 6,
            GameKind::Basketball | GameKind::Football => 5,
            GameKind::Slots => 64,
            GameKind::Rps => 3,
            GameKind::Mines => 25,
        }
    }

    /// Emoji for Telegram's dice animation; RPS and mines draw locally
    pub fn dice_emoji(&self) -> Option<&'static str> {
        match self {
            GameKind::Dice => Some("🎲"),
            GameKind::Basketball => Some("🏀"),
            GameKind::Football => Some("⚽"),
            GameKind::Slots => Some("🎰"),
            GameKind::Darts => Some("🎯"),
            GameKind::Rps | GameKind::Mines => None,
        }
    }

    /// Whether a bet goes straight to the draw with no choice step
    pub fn skips_choice(&self) -> bool {
        matches!(self, GameKind::Slots)
    }

    pub fn title(&self) -> &'static str {
        match self {
            GameKind::Dice => "🎲 Кубик",
            GameKind::Basketball => "🏀 Баскетбол",
            GameKind::Football => "⚽ Футбол",
            GameKind::Rps => "✊ Камень-Ножницы-Бумага",
            GameKind::Slots => "🎰 Слоты",
            GameKind::Darts => "🎯 Дартс",
            GameKind::Mines => "💣 Мины",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        GameKind::ALL.into_iter().find(|g| g.to_string() == s)
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameKind::Dice => "dice",
            GameKind::Basketball => "basketball",
            GameKind::Football => "football",
            GameKind::Rps => "rps",
            GameKind::Slots => "slots",
            GameKind::Darts => "darts",
            GameKind::Mines => "mines",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiceChoice {
    High,
    Low,
    Even,
    Odd,
}

/// Basketball hit/miss, football goal/miss
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShotChoice {
    Score,
    Miss,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RpsHand {
    Rock,
    Scissors,
    Paper,
}

impl RpsHand {
    /// Bot hand for a draw in 1..=3
    pub fn from_draw(value: u8) -> Option<Self> {
        match value {
            1 => Some(RpsHand::Rock),
            2 => Some(RpsHand::Scissors),
            3 => Some(RpsHand::Paper),
            _ => None,
        }
    }

    pub fn beats(self, other: RpsHand) -> bool {
        matches!(
            (self, other),
            (RpsHand::Rock, RpsHand::Scissors)
                | (RpsHand::Scissors, RpsHand::Paper)
                | (RpsHand::Paper, RpsHand::Rock)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DartsZone {
    Miss,
    White,
    Red,
    Bullseye,
}

impl DartsZone {
    pub fn from_draw(value: u8) -> Option<Self> {
        match value {
            1 => Some(DartsZone::Miss),
            2 | 4 => Some(DartsZone::Red),
            3 | 5 => Some(DartsZone::White),
            6 => Some(DartsZone::Bullseye),
            _ => None,
        }
    }
}

/// What the player picked for a single-step round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "game", content = "pick", rename_all = "lowercase")]
pub enum Choice {
    Dice(DiceChoice),
    Basketball(ShotChoice),
    Football(ShotChoice),
    Rps(RpsHand),
    Darts(DartsZone),
    Slots,
}

impl Choice {
    pub fn game(&self) -> GameKind {
        match self {
            Choice::Dice(_) => GameKind::Dice,
            Choice::Basketball(_) => GameKind::Basketball,
            Choice::Football(_) => GameKind::Football,
            Choice::Rps(_) => GameKind::Rps,
            Choice::Darts(_) => GameKind::Darts,
            Choice::Slots => GameKind::Slots,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundOutcome {
    Win,
    Loss,
    /// Stake returned, e.g. an RPS tie
    Push,
}
