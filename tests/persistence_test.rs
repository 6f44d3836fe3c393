//! Ledger state survives a restart on RocksDB

use homyak::cards::CardService;
use homyak::casino::{CasinoEngine, GameKind, RoundOutcome};
use homyak::config::{CasinoConfig, EconomyConfig};
use homyak::ledger::Ledger;
use homyak::random::ScriptedDraws;
use homyak::rewards::Rarity;
use homyak::storage::RocksStore;
use std::path::Path;
use std::sync::Arc;

const GROUP: i64 = -100500;

fn open(path: &Path) -> Arc<Ledger> {
    Arc::new(Ledger::new(Arc::new(RocksStore::open(path).unwrap())))
}

#[tokio::test]
async fn test_state_and_open_rounds_across_restarts() {
    let dir = tempfile::tempdir().unwrap();

    {
        let ledger = open(dir.path());
        let cards = CardService::new(ledger.clone(), EconomyConfig::default());
        cards.add_card("sleepy.png", Rarity::COMMON).await.unwrap();
        ledger.add_balance(7, 100).await.unwrap();
        let draws = ScriptedDraws::new();
        cards.draw(7, chrono::Utc::now(), &draws).await.unwrap();

        let casino = CasinoEngine::new(ledger.clone(), Arc::new(ScriptedDraws::new()), &CasinoConfig::default());
        casino.open_game(GROUP, 7, GameKind::Mines, true).unwrap();
        casino.submit_bet(GROUP, 7, "20").unwrap();
        casino.start_mines(GROUP, 7, 3).await.unwrap();

        assert_eq!(ledger.get_balance(7).unwrap(), 80);
        assert!(casino.history(7, 1).unwrap()[0].is_open());
    }

    let ledger = open(dir.path());
    let casino = CasinoEngine::new(ledger.clone(), Arc::new(ScriptedDraws::new()), &CasinoConfig::default());

    // Nothing in memory survived, the open record did
    assert!(casino.state(GROUP, 7).is_none());
    assert_eq!(casino.reconcile_open_rounds().await.unwrap(), 1);
    assert_eq!(casino.reconcile_open_rounds().await.unwrap(), 0);

    let round = casino.history(7, 1).unwrap().remove(0);
    assert_eq!(round.outcome, Some(RoundOutcome::Loss));
    assert_eq!(round.payout, 0);

    assert_eq!(ledger.get_balance(7).unwrap(), 80);
    assert!(ledger.get_score(7).unwrap().total > 0);
    let cards = CardService::new(ledger.clone(), EconomyConfig::default());
    assert_eq!(cards.user_cards(7).unwrap().len(), 1);
}
