use super::callback::{CallbackData, PayWith};
use super::transport::{Button, Keyboard};
use crate::casino::mines::{Cell, BOARD_SIDE};
use crate::casino::{Choice, DartsZone, DiceChoice, GameKind, MinesBoard, RpsHand, ShotChoice, BOMB_OPTIONS};
use crate::ledger::BoosterKind;
use crate::premium::PremiumPlan;
use crate::profile::LeaderboardKind;
use crate::shop::{booster_price_coins, booster_price_stars, Bundle, ShopItem, COIN_PACKS};

fn cb(text: impl Into<String>, data: CallbackData) -> Button {
    Button::callback(text, data)
}

fn back(to: CallbackData) -> Button {
    cb("‹ Назад", to)
}

pub fn casino_menu() -> Keyboard {
    let games: Vec<Button> = GameKind::ALL
        .iter()
        .map(|g| cb(g.title(), CallbackData::OpenGame(*g)))
        .collect();
    let mut keyboard = Keyboard::new();
    for pair in games.chunks(2) {
        keyboard = keyboard.row(pair.to_vec());
    }
    keyboard
}

pub fn bet_prompt() -> Keyboard {
    Keyboard::new().button(back(CallbackData::CasinoBack))
}

pub fn choices(game: GameKind) -> Keyboard {
    let pick = |text: &str, choice: Choice| cb(text, CallbackData::Pick(choice));
    let rows: Vec<Vec<Button>> = match game {
        GameKind::Dice => vec![
            vec![pick("⬆️ Больше 3", Choice::Dice(DiceChoice::High)), pick("⬇️ Меньше 4", Choice::Dice(DiceChoice::Low))],
            vec![pick("Чётное", Choice::Dice(DiceChoice::Even)), pick("Нечётное", Choice::Dice(DiceChoice::Odd))],
        ],
        GameKind::Basketball => vec![vec![
            pick("🏀 Попадание", Choice::Basketball(ShotChoice::Score)),
            pick("❌ Промах", Choice::Basketball(ShotChoice::Miss)),
        ]],
        GameKind::Football => vec![vec![
            pick("⚽ Гол", Choice::Football(ShotChoice::Score)),
            pick("❌ Мимо", Choice::Football(ShotChoice::Miss)),
        ]],
        GameKind::Rps => vec![vec![
            pick("✊", Choice::Rps(RpsHand::Rock)),
            pick("✌️", Choice::Rps(RpsHand::Scissors)),
            pick("✋", Choice::Rps(RpsHand::Paper)),
        ]],
        GameKind::Darts => vec![
            vec![pick("⚪ Белое", Choice::Darts(DartsZone::White)), pick("🔴 Красное", Choice::Darts(DartsZone::Red))],
            vec![pick("🎯 Центр", Choice::Darts(DartsZone::Bullseye)), pick("❌ Мимо", Choice::Darts(DartsZone::Miss))],
        ],
        GameKind::Slots => vec![vec![pick("🎰 Крутить", Choice::Slots)]],
        GameKind::Mines => vec![],
    };
    Keyboard { rows }.button(back(CallbackData::CasinoBack))
}

pub fn bomb_counts() -> Keyboard {
    let buttons = BOMB_OPTIONS
        .iter()
        .map(|n| cb(format!("💣 {}", n), CallbackData::Bombs(*n)))
        .collect();
    Keyboard::new().row(buttons).button(back(CallbackData::CasinoBack))
}

/// Live board: revealed cells are inert, hidden ones reveal on tap
pub fn mines_board(board: &MinesBoard) -> Keyboard {
    let mut keyboard = Keyboard::new();
    for row in 0..BOARD_SIDE {
        let buttons = (0..BOARD_SIDE)
            .map(|col| {
                let revealed = board.is_revealed(Cell { row, col });
                let face = if revealed { "💎" } else { "🟦" };
                cb(face, CallbackData::Reveal { row, col })
            })
            .collect();
        keyboard = keyboard.row(buttons);
    }
    let cashout = board.current_cashout();
    if cashout > 0 {
        keyboard = keyboard.button(cb(format!("💰 Забрать {}", cashout), CallbackData::Cashout));
    }
    keyboard.button(back(CallbackData::CasinoBack))
}

pub fn play_again(game: GameKind) -> Keyboard {
    Keyboard::new()
        .button(cb("🔁 Ещё раз", CallbackData::OpenGame(game)))
        .button(cb("🎰 Все игры", CallbackData::CasinoMenu))
}

pub fn shop_main() -> Keyboard {
    Keyboard::new()
        .button(cb("🐹 Хомяки", CallbackData::ShopCards))
        .button(cb("📦 Наборы", CallbackData::ShopBundles))
        .button(cb("🧪 Бустеры", CallbackData::ShopBoosters))
        .button(cb("💰 Пополнить монеты", CallbackData::ShopTopUp))
        .button(cb("👑 Premium", CallbackData::PremiumMenu))
}

pub fn shop_items(items: &[ShopItem]) -> Keyboard {
    let mut keyboard = Keyboard::new();
    for item in items {
        keyboard = keyboard.button(cb(
            format!("{} • {} монет / {} ⭐ • {}", item.name, item.price_coins, item.price_stars, item.stock),
            CallbackData::ShopItem(item.id),
        ));
    }
    keyboard.button(back(CallbackData::ShopMain))
}

pub fn shop_item(item: &ShopItem) -> Keyboard {
    Keyboard::new()
        .row(vec![
            cb(format!("💰 {} монет", item.price_coins), CallbackData::BuyItem(item.id, PayWith::Coins)),
            cb(format!("⭐ {}", item.price_stars), CallbackData::BuyItem(item.id, PayWith::Stars)),
        ])
        .button(back(CallbackData::ShopCards))
}

pub fn bundles(bundles: &[Bundle]) -> Keyboard {
    let mut keyboard = Keyboard::new();
    for bundle in bundles {
        keyboard = keyboard.button(cb(
            format!("{} • {} монет / {} ⭐ • {}", bundle.name, bundle.price_coins, bundle.price_stars, bundle.stock),
            CallbackData::ShopBundle(bundle.id),
        ));
    }
    keyboard.button(back(CallbackData::ShopMain))
}

pub fn bundle(bundle: &Bundle) -> Keyboard {
    Keyboard::new()
        .row(vec![
            cb(format!("💰 {} монет", bundle.price_coins), CallbackData::BuyBundle(bundle.id, PayWith::Coins)),
            cb(format!("⭐ {}", bundle.price_stars), CallbackData::BuyBundle(bundle.id, PayWith::Stars)),
        ])
        .button(back(CallbackData::ShopBundles))
}

pub fn boosters() -> Keyboard {
    let mut keyboard = Keyboard::new();
    for (kind, name) in [(BoosterKind::Luck, "🍀 Удача"), (BoosterKind::Time, "⏳ Время")] {
        keyboard = keyboard.row(vec![
            cb(format!("{} • {} монет", name, booster_price_coins(kind)), CallbackData::BuyBooster(kind, PayWith::Coins)),
            cb(format!("{} • {} ⭐", name, booster_price_stars(kind)), CallbackData::BuyBooster(kind, PayWith::Stars)),
        ]);
    }
    keyboard.button(back(CallbackData::ShopMain))
}

pub fn coin_packs() -> Keyboard {
    let buttons: Vec<Button> = COIN_PACKS
        .iter()
        .map(|(coins, stars)| cb(format!("{} 🪙 • {} ⭐", coins, stars), CallbackData::TopUpPack(*coins)))
        .collect();
    let mut keyboard = Keyboard::new();
    for pair in buttons.chunks(2) {
        keyboard = keyboard.row(pair.to_vec());
    }
    keyboard.button(back(CallbackData::ShopMain))
}

pub fn premium_plans() -> Keyboard {
    let mut keyboard = Keyboard::new();
    for plan in PremiumPlan::ALL {
        keyboard = keyboard.button(cb(format!("{} • {} ⭐", plan.title(), plan.stars()), CallbackData::BuyPremium(plan)));
    }
    keyboard
}

pub fn bonus(channel_link: &str) -> Keyboard {
    let mut keyboard = Keyboard::new();
    if !channel_link.is_empty() {
        keyboard = keyboard.button(Button::url("📢 Канал", channel_link));
    }
    keyboard.button(cb("Проверить подписку", CallbackData::CheckBonus))
}

pub fn inventory(luck: u32, time: u32) -> Keyboard {
    let mut keyboard = Keyboard::new();
    if luck > 0 {
        keyboard = keyboard.button(cb(format!("🍀 Использовать удачу ({})", luck), CallbackData::UseBooster(BoosterKind::Luck)));
    }
    if time > 0 {
        keyboard = keyboard.button(cb(format!("⏳ Использовать время ({})", time), CallbackData::UseBooster(BoosterKind::Time)));
    }
    keyboard.button(cb("🧪 Купить бустеры", CallbackData::ShopBoosters))
}

pub fn top_menu() -> Keyboard {
    Keyboard::new()
        .button(cb("🏆 Топ по очкам", CallbackData::Top(LeaderboardKind::Score)))
        .button(cb("🃏 Топ по карточкам", CallbackData::Top(LeaderboardKind::Cards)))
        .button(cb("💰 Топ по монетам", CallbackData::Top(LeaderboardKind::Coins)))
}

pub fn top_back() -> Keyboard {
    Keyboard::new().button(back(CallbackData::TopBack))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_casino_button_parses() {
        let mut keyboards = vec![casino_menu(), bomb_counts(), bet_prompt()];
        keyboards.extend(GameKind::ALL.iter().map(|g| choices(*g)));
        for keyboard in keyboards {
            for data in keyboard.callbacks() {
                assert!(CallbackData::parse(data).is_some(), "{}", data);
            }
        }
    }

    #[test]
    fn test_mines_board_layout() {
        let board = MinesBoard::new(2, 10, vec![Cell { row: 0, col: 0 }, Cell { row: 0, col: 1 }]).unwrap();
        let keyboard = mines_board(&board);
        // 5 rows of cells + back, no cash-out before the first reveal
        assert_eq!(keyboard.rows.len(), 6);
        assert!(keyboard.rows[..5].iter().all(|r| r.len() == 5));
    }
}
