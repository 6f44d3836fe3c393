//! Casino round lifecycle on top of the ledger.
//!
//! Single-step games: bet is validated, the choice is taken (consuming the
//! session so a double tap cannot play twice), the caller obtains a draw,
//! then [`CasinoEngine::settle`] debits the stake, credits the payout and
//! writes the history record in one ledger transaction.
//!
//! Mines spans several interactions: the stake is debited and an open
//! history record written when the board is created; cash-out, a bomb or
//! abandonment close that same record.

use super::mines::{Cell, MinesBoard, RevealOutcome};
use super::payout::Multiplier;
use super::resolve::{resolve_round, RoundResolution};
use super::session::{MenuDebounce, OwnershipRegistry, RoundState, SessionStore};
use super::types::{Choice, GameKind, RoundOutcome};
use crate::config::CasinoConfig;
use crate::errors::{CasinoError, HomyakError, HomyakResult, LedgerError};
use crate::ledger::{keys, ChatId, Ledger, LedgerTxn, UserId};
use crate::random::DrawSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Persisted history entry, one per round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CasinoRound {
    pub round_id: String,
    pub user: UserId,
    pub chat: ChatId,
    pub game: GameKind,
    pub stake: u64,
    pub choice: Option<Choice>,
    pub draw: Option<u8>,
    pub payout: u64,
    pub multiplier: Multiplier,
    /// `None` while a mines round is still open
    pub outcome: Option<RoundOutcome>,
    pub balance_before: u64,
    pub balance_after: u64,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl CasinoRound {
    pub fn net(&self) -> i64 {
        self.payout as i64 - self.stake as i64
    }

    pub fn is_open(&self) -> bool {
        self.outcome.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetAccepted {
    pub game: GameKind,
    pub bet: u64,
    pub balance: u64,
}

/// A round whose choice is locked in and which waits for its draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRound {
    pub chat: ChatId,
    pub user: UserId,
    pub game: GameKind,
    pub bet: u64,
    pub choice: Choice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledRound {
    pub round: CasinoRound,
    pub resolution: RoundResolution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinesStep {
    Safe { opened: usize, cashout: u64, board: MinesBoard },
    Exploded { round: CasinoRound, board: MinesBoard },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinesClosed {
    pub round: CasinoRound,
    pub board: MinesBoard,
}

enum Revealed {
    Safe { opened: usize, cashout: u64, board: MinesBoard },
    Mine { round_id: String, board: MinesBoard },
}

pub struct CasinoEngine {
    ledger: Arc<Ledger>,
    rng: Arc<dyn DrawSource>,
    sessions: SessionStore,
    ownership: OwnershipRegistry,
    debounce: MenuDebounce,
    max_bet_attempts: u32,
}

/// Parse a bet as typed in chat
pub fn parse_bet(text: &str) -> Option<u64> {
    text.trim().parse::<u64>().ok()
}

fn new_round_id() -> String {
    Uuid::new_v4().to_string()
}

impl CasinoEngine {
    pub fn new(ledger: Arc<Ledger>, rng: Arc<dyn DrawSource>, config: &CasinoConfig) -> Self {
        Self {
            ledger,
            rng,
            sessions: SessionStore::new(Duration::from_secs(config.session_ttl_secs)),
            ownership: OwnershipRegistry::new(Duration::from_secs(config.ownership_ttl_secs)),
            debounce: MenuDebounce::new(Duration::from_secs(config.menu_debounce_secs)),
            max_bet_attempts: config.max_bet_attempts,
        }
    }

    pub fn ownership(&self) -> &OwnershipRegistry {
        &self.ownership
    }

    pub fn rng(&self) -> &dyn DrawSource {
        self.rng.as_ref()
    }

    pub fn state(&self, chat: ChatId, user: UserId) -> Option<RoundState> {
        self.sessions.get(chat, user)
    }

    /// Open a game menu and wait for a bet
    pub fn open_game(&self, chat: ChatId, user: UserId, game: GameKind, is_group: bool) -> HomyakResult<u64> {
        if !is_group {
            return Err(CasinoError::PrivateChat.into());
        }
        if !self.debounce.try_open(user, game) {
            return Err(CasinoError::Debounced.into());
        }
        self.sessions.set(chat, user, RoundState::AwaitingBet { game, attempts: 0 });
        self.ledger.get_balance(user)
    }

    /// Validate a typed bet against the game limits and the balance
    pub fn submit_bet(&self, chat: ChatId, user: UserId, text: &str) -> HomyakResult<BetAccepted> {
        let Some(RoundState::AwaitingBet { game, attempts }) = self.sessions.get(chat, user) else {
            return Err(CasinoError::NoActiveRound.into());
        };

        let Some(bet) = parse_bet(text) else {
            let attempts = attempts + 1;
            if attempts >= self.max_bet_attempts {
                self.sessions.clear(chat, user);
                return Err(CasinoError::TooManyAttempts.into());
            }
            self.sessions.set(chat, user, RoundState::AwaitingBet { game, attempts });
            return Err(CasinoError::BetNotANumber.into());
        };

        let limits = game.bet_limits();
        if bet < limits.min || bet > limits.max {
            return Err(CasinoError::BetOutOfRange { bet, min: limits.min, max: limits.max }.into());
        }
        let balance = self.ledger.get_balance(user)?;
        if bet > balance {
            return Err(CasinoError::InsufficientBalance { balance }.into());
        }

        let next = match game {
            GameKind::Mines => RoundState::AwaitingBombs { bet },
            _ => RoundState::AwaitingChoice { game, bet },
        };
        self.sessions.set(chat, user, next);
        tracing::debug!(user_id = user, game = %game, bet, "Bet accepted");
        Ok(BetAccepted { game, bet, balance })
    }

    /// Lock in the player's choice. The session is consumed here, so of two
    /// simultaneous taps only one gets a round.
    pub fn take_choice(&self, chat: ChatId, user: UserId, choice: Choice) -> HomyakResult<PendingRound> {
        let taken = self.sessions.take_if(chat, user, |state| {
            matches!(state, RoundState::AwaitingChoice { game, .. } if *game == choice.game())
        });
        let Some(RoundState::AwaitingChoice { game, bet }) = taken else {
            return Err(match self.sessions.get(chat, user) {
                Some(RoundState::AwaitingChoice { .. }) => CasinoError::ChoiceMismatch.into(),
                _ => CasinoError::NoActiveRound.into(),
            });
        };
        let balance = self.ledger.get_balance(user)?;
        if bet > balance {
            return Err(CasinoError::InsufficientBalance { balance }.into());
        }
        Ok(PendingRound { chat, user, game, bet, choice })
    }

    /// Draw locally for games Telegram doesn't animate
    pub fn local_draw(&self, game: GameKind) -> u8 {
        self.rng.roll(game.draw_max())
    }

    /// Resolve and settle a pending round atomically
    pub async fn settle(&self, pending: PendingRound, draw: u8) -> HomyakResult<SettledRound> {
        let resolution = resolve_round(pending.game, pending.bet, pending.choice, draw)?;
        let round_id = new_round_id();
        let now = Utc::now();

        let round = self
            .ledger
            .transaction(|txn| {
                let balance_before = txn.balance(pending.user)?;
                txn.debit(pending.user, pending.bet).map_err(insufficient_as_casino)?;
                let balance_after = txn.credit(pending.user, resolution.payout)?;
                let round = CasinoRound {
                    round_id: round_id.clone(),
                    user: pending.user,
                    chat: pending.chat,
                    game: pending.game,
                    stake: pending.bet,
                    choice: Some(pending.choice),
                    draw: Some(draw),
                    payout: resolution.payout,
                    multiplier: resolution.multiplier,
                    outcome: Some(resolution.outcome),
                    balance_before,
                    balance_after,
                    detail: None,
                    created_at: now,
                    settled_at: Some(now),
                };
                txn.put(&keys::casino_round(pending.user, &round_id), &round)?;
                Ok(round)
            })
            .await?;

        tracing::info!(
            user_id = round.user,
            game = %round.game,
            round_id = %round.round_id,
            bet = round.stake,
            draw,
            payout = round.payout,
            "Casino round settled"
        );
        Ok(SettledRound { round, resolution })
    }

    /// Pick the bomb count: debit the stake, open the history record, deal the board
    pub async fn start_mines(&self, chat: ChatId, user: UserId, bombs: u8) -> HomyakResult<MinesBoard> {
        let Some(RoundState::AwaitingBombs { bet }) =
            self.sessions.take_if(chat, user, |state| matches!(state, RoundState::AwaitingBombs { .. }))
        else {
            return Err(CasinoError::NoActiveRound.into());
        };
        match self.open_mines(chat, user, bet, bombs).await {
            Ok(board) => Ok(board),
            Err(e) => {
                self.sessions.restore(chat, user, RoundState::AwaitingBombs { bet });
                Err(e)
            }
        }
    }

    async fn open_mines(&self, chat: ChatId, user: UserId, bet: u64, bombs: u8) -> HomyakResult<MinesBoard> {
        let board = MinesBoard::generate(bombs, bet, self.rng.as_ref())?;
        let round_id = new_round_id();
        let commitment = board.commitment(&round_id);
        let now = Utc::now();

        self.ledger
            .transaction(|txn| {
                let balance_before = txn.balance(user)?;
                let balance_after = txn.debit(user, bet).map_err(insufficient_as_casino)?;
                let round = CasinoRound {
                    round_id: round_id.clone(),
                    user,
                    chat,
                    game: GameKind::Mines,
                    stake: bet,
                    choice: None,
                    draw: None,
                    payout: 0,
                    multiplier: Multiplier::ZERO,
                    outcome: None,
                    balance_before,
                    balance_after,
                    detail: Some(format!("{} bombs, layout {}", bombs, commitment)),
                    created_at: now,
                    settled_at: None,
                };
                txn.put(&keys::casino_round(user, &round_id), &round)
            })
            .await?;

        tracing::info!(user_id = user, round_id = %round_id, bet, bombs, commitment = %commitment, "Mines round opened");
        self.sessions
            .set(chat, user, RoundState::PlayingMines { round_id, board: board.clone() });
        Ok(board)
    }

    pub async fn reveal(&self, chat: ChatId, user: UserId, cell: Cell) -> HomyakResult<MinesStep> {
        // The board changes under the session's entry lock so concurrent
        // reveals apply one after the other
        let step = self
            .sessions
            .modify(chat, user, |state| -> (HomyakResult<Revealed>, bool) {
                let RoundState::PlayingMines { round_id, board } = state else {
                    return (Err(CasinoError::NoActiveRound.into()), false);
                };
                match board.reveal(cell) {
                    Ok(RevealOutcome::Safe { opened, cashout }) => {
                        (Ok(Revealed::Safe { opened, cashout, board: board.clone() }), false)
                    }
                    Ok(RevealOutcome::Mine) => {
                        (Ok(Revealed::Mine { round_id: round_id.clone(), board: board.clone() }), true)
                    }
                    Err(e) => (Err(e), false),
                }
            })
            .unwrap_or_else(|| Err(CasinoError::NoActiveRound.into()))?;

        match step {
            Revealed::Safe { opened, cashout, board } => Ok(MinesStep::Safe { opened, cashout, board }),
            Revealed::Mine { round_id, board } => {
                let round = self.close_mines(user, &round_id, &board, 0).await?;
                Ok(MinesStep::Exploded { round, board })
            }
        }
    }

    /// Take the current winnings; nothing revealed forfeits the stake
    pub async fn cashout(&self, chat: ChatId, user: UserId) -> HomyakResult<MinesClosed> {
        let Some(RoundState::PlayingMines { round_id, board }) = self.sessions.clear(chat, user) else {
            return Err(CasinoError::NoActiveRound.into());
        };
        let payout = board.current_cashout();
        let round = self.close_mines(user, &round_id, &board, payout).await?;
        Ok(MinesClosed { round, board })
    }

    /// Leave whatever round is in progress. An open mines round is forfeited.
    pub async fn abandon(&self, chat: ChatId, user: UserId) -> HomyakResult<Option<MinesClosed>> {
        match self.sessions.clear(chat, user) {
            Some(RoundState::PlayingMines { round_id, board }) => {
                let round = self.close_mines(user, &round_id, &board, 0).await?;
                Ok(Some(MinesClosed { round, board }))
            }
            _ => Ok(None),
        }
    }

    async fn close_mines(&self, user: UserId, round_id: &str, board: &MinesBoard, payout: u64) -> HomyakResult<CasinoRound> {
        let now = Utc::now();
        let outcome = if payout > 0 { RoundOutcome::Win } else { RoundOutcome::Loss };
        let round = self
            .ledger
            .transaction(|txn| {
                let key = keys::casino_round(user, round_id);
                let Some(mut round) = txn.get::<CasinoRound>(&key)? else {
                    return Err(CasinoError::NoActiveRound.into());
                };
                if !round.is_open() {
                    return Err(CasinoError::RoundFinished.into());
                }
                round.balance_after = if payout > 0 { txn.credit(user, payout)? } else { txn.balance(user)? };
                round.payout = payout;
                round.multiplier = board.current_multiplier();
                if board.exploded() {
                    round.multiplier = Multiplier::ZERO;
                }
                round.outcome = Some(outcome);
                round.settled_at = Some(now);
                round.detail = Some(format!(
                    "{} bombs, opened {}{}",
                    board.bombs(),
                    board.opened(),
                    if board.exploded() { ", hit a bomb" } else { "" }
                ));
                txn.put(&key, &round)?;
                Ok(round)
            })
            .await?;
        tracing::info!(user_id = user, round_id, payout, opened = board.opened(), "Mines round closed");
        Ok(round)
    }

    /// Close mines rounds left open by a restart. The board is gone, so
    /// the stake stays forfeited.
    pub async fn reconcile_open_rounds(&self) -> HomyakResult<usize> {
        let now = Utc::now();
        let closed = self
            .ledger
            .transaction(|txn| close_open_rounds(txn, now))
            .await?;
        if closed > 0 {
            tracing::warn!(closed, "Closed casino rounds left open");
        }
        Ok(closed)
    }

    /// Evict idle sessions, bindings and debounce stamps
    pub async fn sweep(&self) -> HomyakResult<usize> {
        let now = Instant::now();
        let mut evicted = 0;
        for (_, user, state) in self.sessions.sweep_at(now) {
            evicted += 1;
            if let RoundState::PlayingMines { round_id, board } = state {
                match self.close_mines(user, &round_id, &board, 0).await {
                    Ok(_) | Err(HomyakError::Casino(CasinoError::RoundFinished)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        evicted += self.ownership.sweep_at(now);
        self.debounce.sweep_at(now);
        if evicted > 0 {
            tracing::debug!(evicted, "Casino sweep");
        }
        Ok(evicted)
    }

    /// Newest first
    pub fn history(&self, user: UserId, limit: usize) -> HomyakResult<Vec<CasinoRound>> {
        let mut rounds: Vec<CasinoRound> = self.ledger.read(|txn| {
            Ok(txn
                .scan::<CasinoRound>(&keys::casino_user_prefix(user))?
                .into_iter()
                .map(|(_, r)| r)
                .collect())
        })?;
        rounds.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rounds.truncate(limit);
        Ok(rounds)
    }
}

fn close_open_rounds(txn: &mut LedgerTxn<'_>, now: DateTime<Utc>) -> HomyakResult<usize> {
    let mut closed = 0;
    for (key, mut round) in txn.scan::<CasinoRound>(keys::CASINO_ROUND_PREFIX)? {
        if !round.is_open() {
            continue;
        }
        round.outcome = Some(RoundOutcome::Loss);
        round.settled_at = Some(now);
        round.detail = Some(format!("{} (abandoned)", round.detail.unwrap_or_default()));
        txn.put(&key, &round)?;
        closed += 1;
    }
    Ok(closed)
}

fn insufficient_as_casino(e: HomyakError) -> HomyakError {
    match e {
        HomyakError::Ledger(LedgerError::InsufficientFunds { available, .. }) => {
            CasinoError::InsufficientBalance { balance: available }.into()
        }
        other => other,
    }
}
