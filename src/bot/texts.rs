//! User-facing wording.

use crate::cards::{card_title, DrawOutcome};
use crate::casino::{BetAccepted, GameKind, MinesBoard, RoundOutcome, RpsHand, SettledRound};
use crate::errors::{AccessError, CardError, CasinoError, HomyakError, LedgerError, PromoError, ShopError};
use crate::profile::{LeaderboardEntry, LeaderboardKind, Profile};
use crate::promo::RewardGranted;
use chrono::{DateTime, Utc};

pub const STALE_BUTTONS: &str = "❌ Эти кнопки больше не активны.";
pub const NOT_YOURS: &str = "❌ Это не ваши кнопки!";
pub const INTERNAL_ERROR: &str = "❌ Ошибка, попробуйте ещё раз.";

/// "3 ч 12 мин", "45 сек"
pub fn duration(secs: i64) -> String {
    let secs = secs.max(0);
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{} сек", s),
        (0, m) => format!("{} мин", m),
        (h, 0) => format!("{} ч", h),
        (h, m) => format!("{} ч {} мин", h, m),
    }
}

/// 12345 -> "12,345"
pub fn number(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn access_denied(error: &AccessError) -> &'static str {
    match error {
        AccessError::NotAdmin(_) => "❌ Команда доступна только администраторам",
        AccessError::NotOwner => NOT_YOURS,
        AccessError::StaleButtons => STALE_BUTTONS,
    }
}

/// Answer for a failure the user caused; `None` for internal errors
pub fn user_message(error: &HomyakError) -> Option<String> {
    let text = match error {
        HomyakError::Casino(e) => match e {
            CasinoError::BetNotANumber => "❌ Введите число!".to_string(),
            CasinoError::BetOutOfRange { min, max, .. } => {
                format!("❌ Ставка должна быть от {} до {} монет!", min, max)
            }
            CasinoError::InsufficientBalance { balance } => {
                format!("❌ Недостаточно монет! Ваш баланс: {}", number(*balance))
            }
            CasinoError::TooManyAttempts => "❌ Действие отменено, введите заново /casino".to_string(),
            CasinoError::NoActiveRound | CasinoError::ChoiceMismatch | CasinoError::RoundFinished => {
                "❌ Ставка не найдена. Начните игру заново.".to_string()
            }
            CasinoError::CellAlreadyRevealed => "Эта клетка уже открыта".to_string(),
            CasinoError::PrivateChat => "❌ К сожалению, система казино работает только в группах".to_string(),
            CasinoError::Debounced => "⏳ Подождите пару секунд".to_string(),
            CasinoError::InvalidBombCount(_) | CasinoError::CellOutOfBounds { .. } | CasinoError::InvalidDraw { .. } => {
                return None
            }
        },
        HomyakError::Cards(e) => match e {
            CardError::CooldownActive { remaining_secs } => {
                format!("⏳ Следующий хомяк через {}", duration(*remaining_secs))
            }
            CardError::EmptyCatalog => "🐹 Хомяки ещё не завезли".to_string(),
            CardError::UnknownCard(name) => format!("❌ Карточка «{}» не найдена", name),
            CardError::DuplicateCard(name) => format!("❌ Карточка «{}» уже есть", name),
            CardError::InvalidRarity(tier) => format!("❌ Редкость {} не существует (1-5)", tier),
        },
        HomyakError::Ledger(e) => match e {
            LedgerError::InsufficientFunds { available, .. } => {
                format!("❌ Недостаточно монет! Ваш баланс: {}", number(*available))
            }
            LedgerError::UnknownPlan(_) => "❌ Неизвестный тариф".to_string(),
            LedgerError::NoBooster(_) => "❌ У вас нет такого бустера".to_string(),
            LedgerError::BoosterNotApplicable => "❌ Сейчас этот бустер не нужен".to_string(),
        },
        HomyakError::Shop(e) => match e {
            ShopError::ItemNotFound(_) => "❌ Товар не найден.".to_string(),
            ShopError::BundleNotFound(_) => "❌ Набор не найден".to_string(),
            ShopError::AlreadyOwned => "❌ Вы уже купили этого хомяка.".to_string(),
            ShopError::OutOfStock => "❌ Этот товар закончился.".to_string(),
            ShopError::InsufficientFunds { price, balance } => {
                format!("❌ Недостаточно монет: нужно {}, у вас {}", number(*price), number(*balance))
            }
            ShopError::UnknownPack(_) | ShopError::BadPayload(_) => "❌ Неизвестный платеж.".to_string(),
            ShopError::DuplicateListing(_) => "❌ Этот хомяк уже продаётся".to_string(),
            ShopError::RefundRequired(_) => "❌ Покупка невозможна.".to_string(),
        },
        HomyakError::Promo(e) => match e {
            PromoError::NotFound | PromoError::Exhausted => "❌ Промокод недействителен или исчерпан.".to_string(),
            PromoError::AlreadyUsed => "❌ Вы уже активировали этот промокод.".to_string(),
            PromoError::InvalidCode(_) => "❌ Код может содержать только буквы, цифры и _".to_string(),
            PromoError::AlreadyExists(code) => format!("❌ Промокод {} уже существует", code),
            PromoError::InvalidReward(why) => format!("❌ Неверная награда: {}", why),
        },
        HomyakError::Access(e) => access_denied(e).to_string(),
        HomyakError::Configuration(_) | HomyakError::Storage(_) | HomyakError::Transport(_) => return None,
    };
    Some(text)
}

pub fn draw_result(outcome: &DrawOutcome) -> String {
    let mut lines = vec![
        format!("🐹 Вам выпал хомяк «{}»!", card_title(&outcome.filename)),
        String::new(),
        format!("💎 Редкость • {}", outcome.rarity.name()),
        format!("✨ Очки • +{} [{}]", number(outcome.points), number(outcome.total_score)),
    ];
    if outcome.duplicate {
        lines.push("🔁 Повторка: добавлены только очки.".to_string());
    }
    if outcome.luck_used {
        lines.push("🍀 Сработал бустер удачи".to_string());
    }
    if outcome.time_booster_used {
        lines.push("⏳ Использован бустер времени".to_string());
    }
    lines.join("\n")
}

pub fn casino_welcome(balance: u64) -> String {
    format!("🎰 Казино Хомяка\n\n💰 Ваш баланс: {}\nВыберите игру:", number(balance))
}

pub fn bet_prompt(game: GameKind, balance: u64) -> String {
    let limits = game.bet_limits();
    format!(
        "{}\n\n💰 Баланс: {}\nВведите ставку от {} до {} монет:",
        game.title(),
        number(balance),
        limits.min,
        limits.max
    )
}

pub fn choice_prompt(accepted: &BetAccepted) -> String {
    format!("{}\nСтавка: {} монет\nВаш выбор:", accepted.game.title(), accepted.bet)
}

pub fn bombs_prompt(bet: u64) -> String {
    format!("💣 Мины\nСтавка: {} монет\nСколько бомб спрятать?", bet)
}

pub fn round_result(settled: &SettledRound) -> String {
    let round = &settled.round;
    let headline = match settled.resolution.outcome {
        RoundOutcome::Win => format!("🎉 Победа! +{} монет ({})", number(round.payout), round.multiplier),
        RoundOutcome::Push => "🤝 Ничья, ставка возвращена".to_string(),
        RoundOutcome::Loss => format!("😔 Проигрыш, -{} монет", number(round.stake)),
    };
    let draw = match (round.game, round.draw) {
        (GameKind::Rps, Some(d)) => match RpsHand::from_draw(d) {
            Some(RpsHand::Rock) => "Бот выбрал: ✊\n".to_string(),
            Some(RpsHand::Scissors) => "Бот выбрал: ✌️\n".to_string(),
            Some(RpsHand::Paper) => "Бот выбрал: ✋\n".to_string(),
            None => String::new(),
        },
        (_, Some(d)) => format!("Выпало: {}\n", d),
        (_, None) => String::new(),
    };
    format!("{}\n\n{}{}\n💰 Баланс: {}", round.game.title(), draw, headline, number(round.balance_after))
}

pub fn mines_status(board: &MinesBoard) -> String {
    format!(
        "💣 Мины • {} бомб\nСтавка: {} • Открыто: {}\nМножитель: {} • Можно забрать: {}",
        board.bombs(),
        board.stake(),
        board.opened(),
        board.current_multiplier(),
        number(board.current_cashout())
    )
}

pub fn mines_exploded(board: &MinesBoard, balance: u64) -> String {
    format!(
        "💥 Бум! Вы наткнулись на бомбу и потеряли {} монет.\n\n{}\n\n💰 Баланс: {}",
        board.stake(),
        render_board(board).join("\n"),
        number(balance)
    )
}

pub fn mines_cashed(board: &MinesBoard, payout: u64, balance: u64) -> String {
    format!(
        "💰 Вы забрали {} монет!\n\n{}\n\n💰 Баланс: {}",
        number(payout),
        render_board(board).join("\n"),
        number(balance)
    )
}

pub fn render_board(board: &MinesBoard) -> Vec<String> {
    board.render_final().into_iter().map(|row| row.concat()).collect()
}

pub fn profile(name: &str, p: &Profile) -> String {
    let premium = if p.premium.lifetime {
        "\n👑 Premium: навсегда".to_string()
    } else if p.premium_active {
        let until = p.premium.expires_at.map(|at: DateTime<Utc>| at.format("%d.%m.%Y").to_string()).unwrap_or_default();
        format!("\n👑 Premium до: {}", until)
    } else {
        String::new()
    };
    let cooldown = if p.cooldown_secs > 0 {
        format!("через {}", duration(p.cooldown_secs))
    } else {
        "доступен сейчас".to_string()
    };
    let mut text = format!(
        "👋 Привет, {}!{}\n\n✨ Очки: {}\n💰 Монеты: {}\n🃏 Карточек: {} / {}\n🐹 Последний хомяк: {}\n⏳ Хомяк: {}",
        name,
        premium,
        number(p.score),
        number(p.balance),
        p.cards_owned,
        p.catalog_size,
        p.last_card.as_deref().unwrap_or("ещё не было"),
        cooldown,
    );
    if p.bonus_active {
        text.push_str("\n🎁 Бонус за подписку активен");
    }
    if let Some(fav) = &p.favorite {
        text.push_str(&format!("\n⭐ Любимый: {}", card_title(fav)));
    }
    text
}

pub fn inventory(p: &Profile) -> String {
    let mut text = format!(
        "🎒 Инвентарь\n\n🍀 Бустеры удачи: {}\n⏳ Бустеры времени: {}",
        p.luck_boosters, p.time_boosters
    );
    if p.luck_armed {
        text.push_str("\n\n🍀 Удача активна на следующего хомяка");
    }
    text
}

pub fn leaderboard(kind: LeaderboardKind, rows: &[(LeaderboardEntry, String)], viewer: i64) -> String {
    let (title, unit) = match kind {
        LeaderboardKind::Score => ("🏆 Топ 10 игроков по очкам", "очков"),
        LeaderboardKind::Cards => ("🃏 Топ 10 игроков по карточкам", "карточек"),
        LeaderboardKind::Coins => ("💰 Топ 10 игроков по монетам", "монет"),
    };
    if rows.is_empty() {
        return format!("{}\n\nПока никого нет.", title);
    }
    let mut lines = vec![title.to_string(), String::new()];
    for (i, (entry, name)) in rows.iter().enumerate() {
        let medal = match i {
            0 => "🥇".to_string(),
            1 => "🥈".to_string(),
            2 => "🥉".to_string(),
            n => format!("{}.", n + 1),
        };
        let you = if entry.user == viewer { " (вы)" } else { "" };
        lines.push(format!("{} {} • {} {}{}", medal, name, number(entry.value), unit, you));
    }
    lines.join("\n")
}

pub fn promo_granted(granted: &RewardGranted) -> String {
    match granted {
        RewardGranted::Points { points, .. } => format!("✅ Получено {} очков!", number(*points)),
        RewardGranted::Card { filename, rarity, points, total } => format!(
            "✅ Промокод активирован!\n🐹 Хомяк «{}»\n💎 Редкость • {}\n✨ Очки • +{} [{}]",
            card_title(filename),
            rarity.name(),
            number(*points),
            number(*total)
        ),
        RewardGranted::CooldownReset => {
            "✅ Активирован промокод\nВаш приз: Снятие КД\n\nНапишите заново «Хомяк» и откройте карточку".to_string()
        }
        RewardGranted::ScoreBoost { extra_points, expires_at } => format!(
            "✅ +{} очков за хомяка до {}!",
            number(*extra_points),
            expires_at.format("%d.%m %H:%M UTC")
        ),
        RewardGranted::Coins { coins, .. } => format!("✅ С помощью промокода вы получили {} монет!", number(*coins)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        assert_eq!(duration(45), "45 сек");
        assert_eq!(duration(3600 * 3 + 12 * 60), "3 ч 12 мин");
        assert_eq!(duration(7200), "2 ч");
        assert_eq!(duration(-5), "0 сек");
    }

    #[test]
    fn test_number_grouping() {
        assert_eq!(number(0), "0");
        assert_eq!(number(999), "999");
        assert_eq!(number(4700), "4,700");
        assert_eq!(number(1234567), "1,234,567");
    }

    #[test]
    fn test_internal_errors_have_no_user_text() {
        let internal = HomyakError::Transport("timeout".into());
        assert!(user_message(&internal).is_none());
        let user = HomyakError::from(CasinoError::InsufficientBalance { balance: 10 });
        assert_eq!(user_message(&user).unwrap(), "❌ Недостаточно монет! Ваш баланс: 10");
    }
}
