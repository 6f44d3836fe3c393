//! Ephemeral casino state: per-conversation round state, message ownership
//! and the menu debounce. All three are in-memory maps with timestamps and
//! get swept after an inactivity window.

use super::mines::MinesBoard;
use super::types::GameKind;
use crate::errors::AccessError;
use crate::ledger::{ChatId, UserId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

pub type MessageId = i32;

/// Where a conversation is inside a round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundState {
    AwaitingBet { game: GameKind, attempts: u32 },
    AwaitingChoice { game: GameKind, bet: u64 },
    AwaitingBombs { bet: u64 },
    PlayingMines { round_id: String, board: MinesBoard },
}

impl RoundState {
    pub fn game(&self) -> GameKind {
        match self {
            RoundState::AwaitingBet { game, .. } | RoundState::AwaitingChoice { game, .. } => *game,
            RoundState::AwaitingBombs { .. } | RoundState::PlayingMines { .. } => GameKind::Mines,
        }
    }
}

struct Session {
    state: RoundState,
    touched: Instant,
}

/// Round state keyed by (chat, user)
pub struct SessionStore {
    sessions: DashMap<(ChatId, UserId), Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { sessions: DashMap::new(), ttl }
    }

    /// Expired sessions read as absent but stay until the sweep, which
    /// closes their open mines rounds
    pub fn get(&self, chat: ChatId, user: UserId) -> Option<RoundState> {
        let entry = self.sessions.get(&(chat, user))?;
        if entry.touched.elapsed() > self.ttl {
            return None;
        }
        Some(entry.state.clone())
    }

    pub fn set(&self, chat: ChatId, user: UserId, state: RoundState) {
        self.sessions.insert((chat, user), Session { state, touched: Instant::now() });
    }

    /// Remove and return the state if `pred` accepts it. Of two racing
    /// callers at most one gets it.
    pub fn take_if<F>(&self, chat: ChatId, user: UserId, pred: F) -> Option<RoundState>
    where
        F: FnOnce(&RoundState) -> bool,
    {
        let ttl = self.ttl;
        self.sessions
            .remove_if(&(chat, user), |_, session| session.touched.elapsed() <= ttl && pred(&session.state))
            .map(|(_, session)| session.state)
    }

    /// Put a taken state back unless something newer took its place
    pub fn restore(&self, chat: ChatId, user: UserId, state: RoundState) {
        if let Entry::Vacant(slot) = self.sessions.entry((chat, user)) {
            slot.insert(Session { state, touched: Instant::now() });
        }
    }

    /// Run `f` on the live state while holding its entry lock. `f` returns
    /// its result and whether the session ends with this step.
    pub fn modify<R, F>(&self, chat: ChatId, user: UserId, f: F) -> Option<R>
    where
        F: FnOnce(&mut RoundState) -> (R, bool),
    {
        let Entry::Occupied(mut slot) = self.sessions.entry((chat, user)) else {
            return None;
        };
        if slot.get().touched.elapsed() > self.ttl {
            return None;
        }
        let session = slot.get_mut();
        session.touched = Instant::now();
        let (result, finished) = f(&mut session.state);
        if finished {
            slot.remove();
        }
        Some(result)
    }

    pub fn clear(&self, chat: ChatId, user: UserId) -> Option<RoundState> {
        self.sessions.remove(&(chat, user)).map(|(_, s)| s.state)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle longer than the ttl as of `now`; returns the
    /// dropped states so open mines rounds can be closed in the ledger
    pub fn sweep_at(&self, now: Instant) -> Vec<(ChatId, UserId, RoundState)> {
        let expired: Vec<(ChatId, UserId)> = self
            .sessions
            .iter()
            .filter(|e| now.saturating_duration_since(e.touched) > self.ttl)
            .map(|e| *e.key())
            .collect();
        expired
            .into_iter()
            .filter_map(|key| self.sessions.remove(&key).map(|(k, s)| (k.0, k.1, s.state)))
            .collect()
    }
}

struct Binding {
    owner: UserId,
    touched: Instant,
}

/// Which user each interactive casino message belongs to
pub struct OwnershipRegistry {
    bindings: DashMap<(ChatId, MessageId), Binding>,
    ttl: Duration,
}

impl OwnershipRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self { bindings: DashMap::new(), ttl }
    }

    pub fn bind(&self, chat: ChatId, message: MessageId, owner: UserId) {
        self.bindings.insert((chat, message), Binding { owner, touched: Instant::now() });
    }

    pub fn release(&self, chat: ChatId, message: MessageId) {
        self.bindings.remove(&(chat, message));
    }

    /// Ok when `user` owns the message; refreshes the binding
    pub fn check(&self, chat: ChatId, message: MessageId, user: UserId) -> Result<(), AccessError> {
        let Some(mut binding) = self.bindings.get_mut(&(chat, message)) else {
            return Err(AccessError::StaleButtons);
        };
        if binding.touched.elapsed() > self.ttl {
            drop(binding);
            self.bindings.remove(&(chat, message));
            return Err(AccessError::StaleButtons);
        }
        if binding.owner != user {
            return Err(AccessError::NotOwner);
        }
        binding.touched = Instant::now();
        Ok(())
    }

    pub fn owner(&self, chat: ChatId, message: MessageId) -> Option<UserId> {
        self.bindings.get(&(chat, message)).map(|b| b.owner)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.bindings.len();
        self.bindings
            .retain(|_, b| now.saturating_duration_since(b.touched) <= self.ttl);
        before - self.bindings.len()
    }
}

/// Per (user, game) throttle on opening a game menu
pub struct MenuDebounce {
    last_open: DashMap<(UserId, GameKind), Instant>,
    window: Duration,
}

impl MenuDebounce {
    pub fn new(window: Duration) -> Self {
        Self { last_open: DashMap::new(), window }
    }

    /// True (and recorded) if the menu may open now
    pub fn try_open(&self, user: UserId, game: GameKind) -> bool {
        self.try_open_at(user, game, Instant::now())
    }

    pub fn try_open_at(&self, user: UserId, game: GameKind, now: Instant) -> bool {
        match self.last_open.entry((user, game)) {
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
            Entry::Occupied(mut slot) => {
                if now.saturating_duration_since(*slot.get()) < self.window {
                    return false;
                }
                slot.insert(now);
                true
            }
        }
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.last_open.len();
        self.last_open
            .retain(|_, at| now.saturating_duration_since(*at) < self.window);
        before - self.last_open.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_ownership_guard() {
        let registry = OwnershipRegistry::new(Duration::from_secs(60));
        registry.bind(-10, 5, 7);
        assert_eq!(registry.check(-10, 5, 7), Ok(()));
        assert_eq!(registry.check(-10, 5, 8), Err(AccessError::NotOwner));
        assert_eq!(registry.check(-10, 6, 7), Err(AccessError::StaleButtons));
        registry.release(-10, 5);
        assert_eq!(registry.check(-10, 5, 7), Err(AccessError::StaleButtons));
    }

    #[test]
    fn test_ownership_eviction() {
        let registry = OwnershipRegistry::new(Duration::from_secs(60));
        registry.bind(-10, 1, 7);
        registry.bind(-10, 2, 7);
        assert_eq!(registry.sweep_at(Instant::now()), 0);
        assert_eq!(registry.sweep_at(Instant::now() + Duration::from_secs(61)), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_debounce_window() {
        let debounce = MenuDebounce::new(Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(debounce.try_open_at(1, GameKind::Dice, t0));
        assert!(!debounce.try_open_at(1, GameKind::Dice, t0 + Duration::from_secs(5)));
        assert!(debounce.try_open_at(1, GameKind::Slots, t0 + Duration::from_secs(5)));
        assert!(debounce.try_open_at(2, GameKind::Dice, t0 + Duration::from_secs(5)));
        assert!(debounce.try_open_at(1, GameKind::Dice, t0 + Duration::from_secs(10)));
    }

    #[test]
    fn test_sessions_are_per_user_and_expire() {
        let store = SessionStore::new(Duration::from_secs(30));
        store.set(-1, 1, RoundState::AwaitingBet { game: GameKind::Dice, attempts: 0 });
        store.set(-1, 2, RoundState::AwaitingChoice { game: GameKind::Rps, bet: 5 });
        assert_eq!(store.get(-1, 1).map(|s| s.game()), Some(GameKind::Dice));
        assert_eq!(store.get(-1, 2).map(|s| s.game()), Some(GameKind::Rps));
        assert!(store.get(-2, 1).is_none());

        let dropped = store.sweep_at(Instant::now() + Duration::from_secs(31));
        assert_eq!(dropped.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_take_if_and_restore() {
        let store = SessionStore::new(Duration::from_secs(30));
        store.set(-1, 1, RoundState::AwaitingBombs { bet: 5 });
        assert!(store.take_if(-1, 1, |s| matches!(s, RoundState::AwaitingChoice { .. })).is_none());
        assert_eq!(store.take_if(-1, 1, |_| true), Some(RoundState::AwaitingBombs { bet: 5 }));
        assert!(store.take_if(-1, 1, |_| true).is_none());

        store.restore(-1, 1, RoundState::AwaitingBombs { bet: 5 });
        assert_eq!(store.get(-1, 1), Some(RoundState::AwaitingBombs { bet: 5 }));
        // A newer state wins over a late restore
        store.set(-1, 2, RoundState::AwaitingBet { game: GameKind::Dice, attempts: 0 });
        store.restore(-1, 2, RoundState::AwaitingBombs { bet: 5 });
        assert_eq!(store.get(-1, 2).map(|s| s.game()), Some(GameKind::Dice));
    }

    #[test]
    fn test_take_if_hands_out_a_state_once() {
        for _ in 0..200 {
            let store = Arc::new(SessionStore::new(Duration::from_secs(30)));
            store.set(-1, 1, RoundState::AwaitingChoice { game: GameKind::Dice, bet: 10 });
            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let (store, barrier) = (store.clone(), barrier.clone());
                    thread::spawn(move || {
                        barrier.wait();
                        store.take_if(-1, 1, |s| matches!(s, RoundState::AwaitingChoice { .. })).is_some()
                    })
                })
                .collect();
            let taken = handles.into_iter().map(|h| h.join().unwrap()).filter(|t| *t).count();
            assert_eq!(taken, 1);
        }
    }

    #[test]
    fn test_modify_updates_in_place_and_can_finish() {
        let store = SessionStore::new(Duration::from_secs(30));
        assert!(store.modify(-1, 1, |_| ((), false)).is_none());
        store.set(-1, 1, RoundState::AwaitingBet { game: GameKind::Rps, attempts: 0 });
        let attempts = store.modify(-1, 1, |state| {
            if let RoundState::AwaitingBet { attempts, .. } = state {
                *attempts += 1;
            }
            (state.game(), false)
        });
        assert_eq!(attempts, Some(GameKind::Rps));
        assert_eq!(store.get(-1, 1), Some(RoundState::AwaitingBet { game: GameKind::Rps, attempts: 1 }));
        store.modify(-1, 1, |_| ((), true));
        assert!(store.get(-1, 1).is_none());
    }
}
