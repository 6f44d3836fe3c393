//! Casino rounds driven end to end through the router

mod common;

use common::{Harness, GROUP};
use homyak::bot::texts;
use homyak::casino::{GameKind, RoundOutcome};

#[tokio::test]
async fn test_dice_win_with_reduced_multiplier() {
    let h = Harness::new();
    h.state().ledger.add_balance(7, 100).await.unwrap();

    h.say(GROUP, 7, "/casino").await;
    let menu = h.last_message_id();
    assert!(h.last_text().contains("Казино"));

    h.tap(GROUP, 7, menu, "cas:game:dice").await;
    assert!(h.last_text().contains("Введите ставку"));

    h.say(GROUP, 7, "60").await;
    let choices = h.last_message_id();

    h.transport.push_dice(5);
    h.tap(GROUP, 7, choices, "cas:pick:dice:high").await;

    // 100 - 60 + 60 * 1.75
    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 145);
    assert!(h.last_text().contains("Победа"));

    let history = h.state().casino.history(7, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].game, GameKind::Dice);
    assert_eq!(history[0].payout, 105);
    assert_eq!(history[0].outcome, Some(RoundOutcome::Win));
    assert_eq!((history[0].balance_before, history[0].balance_after), (100, 145));

    assert!(h.transport.operator_messages().iter().any(|m| m.contains("🎰")));
    // A second tap on the same choice has nothing left to play
    h.tap(GROUP, 7, choices, "cas:pick:dice:high").await;
    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 145);
}

#[tokio::test]
async fn test_bet_above_balance_is_refused() {
    let h = Harness::new();
    h.state().ledger.add_balance(7, 30).await.unwrap();

    h.say(GROUP, 7, "/casino").await;
    let menu = h.last_message_id();
    h.tap(GROUP, 7, menu, "cas:game:football").await;
    h.say(GROUP, 7, "60").await;

    assert!(h.last_text().contains("Недостаточно монет"));
    assert!(h.last_text().contains("30"));
    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 30);
    assert!(h.state().casino.history(7, 10).unwrap().is_empty());
}

#[tokio::test]
async fn test_three_bad_bets_cancel_the_round() {
    let h = Harness::new();
    h.state().ledger.add_balance(7, 30).await.unwrap();
    h.say(GROUP, 7, "/casino").await;
    let menu = h.last_message_id();
    h.tap(GROUP, 7, menu, "cas:game:darts").await;

    h.say(GROUP, 7, "много").await;
    assert!(h.last_text().contains("Введите число"));
    h.say(GROUP, 7, "ещё").await;
    h.say(GROUP, 7, "всё").await;
    assert!(h.last_text().contains("Действие отменено"));

    // Back to plain chat: a number is no longer read as a bet
    let sent = h.transport.sent().len();
    h.say(GROUP, 7, "10").await;
    assert_eq!(h.transport.sent().len(), sent);
}

#[tokio::test]
async fn test_buttons_belong_to_their_player() {
    let h = Harness::new();
    h.state().ledger.add_balance(7, 50).await.unwrap();
    h.say(GROUP, 7, "/casino").await;
    let menu = h.last_message_id();
    let edits = h.transport.edits().len();

    h.tap(GROUP, 8, menu, "cas:game:dice").await;

    let answer = h.transport.last_answer().unwrap();
    assert!(answer.alert);
    assert_eq!(answer.text, texts::NOT_YOURS);
    assert_eq!(h.transport.edits().len(), edits);
    assert!(h.state().casino.state(GROUP, 8).is_none());
}

#[tokio::test]
async fn test_unbound_message_is_stale() {
    let h = Harness::new();
    h.tap(GROUP, 7, 4242, "cas:game:slots").await;
    let answer = h.transport.last_answer().unwrap();
    assert_eq!(answer.text, texts::STALE_BUTTONS);
}

#[tokio::test]
async fn test_casino_refuses_private_chats() {
    let h = Harness::new();
    h.say(7, 7, "/casino").await;
    assert!(h.last_text().contains("только в группах"));
}

#[tokio::test]
async fn test_menu_debounce() {
    let h = Harness::new();
    h.state().ledger.add_balance(7, 50).await.unwrap();
    h.say(GROUP, 7, "/casino").await;
    let menu = h.last_message_id();
    h.tap(GROUP, 7, menu, "cas:game:rps").await;
    h.tap(GROUP, 7, menu, "cas:back").await;
    h.tap(GROUP, 7, menu, "cas:game:rps").await;

    let answer = h.transport.last_answer().unwrap();
    assert!(!answer.alert);
    assert!(answer.text.contains("Подождите"));
}

#[tokio::test]
async fn test_rps_draw_is_local_and_tie_returns_stake() {
    let h = Harness::new();
    h.state().ledger.add_balance(7, 40).await.unwrap();
    h.say(GROUP, 7, "/casino").await;
    let menu = h.last_message_id();
    h.tap(GROUP, 7, menu, "cas:game:rps").await;
    h.say(GROUP, 7, "20").await;
    let choices = h.last_message_id();

    // 1 is rock for the bot
    h.draws.push_roll(1);
    h.tap(GROUP, 7, choices, "cas:pick:rps:rock").await;

    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 40);
    assert!(h.last_text().contains("Ничья"));
    assert!(h.last_text().contains("✊"));
}

#[tokio::test]
async fn test_mines_cashout_and_explosion() {
    let h = Harness::without_debounce();
    h.state().ledger.add_balance(7, 50).await.unwrap();

    h.say(GROUP, 7, "/casino").await;
    let menu = h.last_message_id();
    h.tap(GROUP, 7, menu, "cas:game:mines").await;
    h.say(GROUP, 7, "10").await;
    let prompt = h.last_message_id();

    // Mines in the first two cells of the top row
    h.draws.push_sample(vec![0, 1]);
    h.tap(GROUP, 7, prompt, "cas:bombs:2").await;
    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 40);

    h.tap(GROUP, 7, prompt, "cas:cell:4:4").await;
    h.tap(GROUP, 7, prompt, "cas:cell:4:4").await;
    assert!(h.transport.last_answer().unwrap().text.contains("уже открыта"));
    h.tap(GROUP, 7, prompt, "cas:cell:4:3").await;
    h.tap(GROUP, 7, prompt, "cas:cashout").await;

    // Two safe cells with two bombs pay 1.11x
    let won = h.state().casino.history(7, 1).unwrap().remove(0);
    assert_eq!(won.outcome, Some(RoundOutcome::Win));
    assert_eq!(won.payout, 11);
    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 51);
    assert!(h.last_text().contains("Вы забрали"));

    let balance = h.state().ledger.get_balance(7).unwrap();
    h.tap(GROUP, 7, prompt, "cas:game:mines").await;
    h.say(GROUP, 7, "5").await;
    let prompt = h.last_message_id();
    h.draws.push_sample(vec![0, 1]);
    h.tap(GROUP, 7, prompt, "cas:bombs:2").await;
    h.tap(GROUP, 7, prompt, "cas:cell:0:1").await;

    assert_eq!(h.state().ledger.get_balance(7).unwrap(), balance - 5);
    assert!(h.last_text().contains("Бум"));
    let lost = h.state().casino.history(7, 10).unwrap();
    assert_eq!(lost.len(), 2);
    assert!(lost.iter().all(|r| !r.is_open()));
}

#[tokio::test]
async fn test_new_menu_forfeits_open_mines_round() {
    let h = Harness::new();
    h.state().ledger.add_balance(7, 30).await.unwrap();
    h.say(GROUP, 7, "/casino").await;
    let menu = h.last_message_id();
    h.tap(GROUP, 7, menu, "cas:game:mines").await;
    h.say(GROUP, 7, "10").await;
    let prompt = h.last_message_id();
    h.tap(GROUP, 7, prompt, "cas:bombs:3").await;

    h.say(GROUP, 7, "/casino").await;

    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 20);
    let rounds = h.state().casino.history(7, 10).unwrap();
    assert_eq!(rounds.len(), 1);
    assert_eq!(rounds[0].outcome, Some(RoundOutcome::Loss));
}

#[tokio::test]
async fn test_unknown_callback_is_acknowledged() {
    let h = Harness::new();
    h.tap(GROUP, 7, 1, "something:else").await;
    let answer = h.transport.last_answer().unwrap();
    assert!(answer.text.is_empty());
    assert!(!answer.alert);
}
