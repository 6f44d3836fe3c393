//! Coin casino: six single-step dice games plus mines.

pub mod engine;
pub mod mines;
pub mod payout;
pub mod resolve;
pub mod session;
pub mod types;

pub use engine::{BetAccepted, CasinoEngine, CasinoRound, MinesClosed, MinesStep, PendingRound, SettledRound};
pub use mines::{Cell, MinesBoard, RevealOutcome, BOMB_OPTIONS};
pub use payout::Multiplier;
pub use resolve::{resolve_round, RoundResolution};
pub use session::{MenuDebounce, MessageId, OwnershipRegistry, RoundState, SessionStore};
pub use types::{Choice, DartsZone, DiceChoice, GameKind, RoundOutcome, RpsHand, ShotChoice};
