//! Typed inline-button payloads.
//!
//! Payloads are short `:`-separated strings (Telegram caps them at 64 bytes).
//! Anything that doesn't parse is ignored by the router.

use crate::casino::{Choice, DartsZone, DiceChoice, GameKind, RpsHand, ShotChoice};
use crate::ledger::BoosterKind;
use crate::premium::PremiumPlan;
use crate::profile::LeaderboardKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayWith {
    Coins,
    Stars,
}

impl PayWith {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "coins" => Some(PayWith::Coins),
            "stars" => Some(PayWith::Stars),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            PayWith::Coins => "coins",
            PayWith::Stars => "stars",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackData {
    CasinoMenu,
    OpenGame(GameKind),
    Pick(Choice),
    Bombs(u8),
    Reveal { row: u8, col: u8 },
    Cashout,
    CasinoBack,

    ShopMain,
    ShopCards,
    ShopItem(u64),
    BuyItem(u64, PayWith),
    ShopBundles,
    ShopBundle(u64),
    BuyBundle(u64, PayWith),
    ShopBoosters,
    BuyBooster(BoosterKind, PayWith),
    ShopTopUp,
    TopUpPack(u64),

    PremiumMenu,
    BuyPremium(PremiumPlan),
    CheckBonus,

    Inventory,
    UseBooster(BoosterKind),

    Top(LeaderboardKind),
    TopBack,
}

fn choice_to_str(choice: &Choice) -> &'static str {
    match choice {
        Choice::Dice(DiceChoice::High) => "high",
        Choice::Dice(DiceChoice::Low) => "low",
        Choice::Dice(DiceChoice::Even) => "even",
        Choice::Dice(DiceChoice::Odd) => "odd",
        Choice::Basketball(ShotChoice::Score) | Choice::Football(ShotChoice::Score) => "score",
        Choice::Basketball(ShotChoice::Miss) | Choice::Football(ShotChoice::Miss) => "miss",
        Choice::Rps(RpsHand::Rock) => "rock",
        Choice::Rps(RpsHand::Scissors) => "scissors",
        Choice::Rps(RpsHand::Paper) => "paper",
        Choice::Darts(DartsZone::Miss) => "miss",
        Choice::Darts(DartsZone::White) => "white",
        Choice::Darts(DartsZone::Red) => "red",
        Choice::Darts(DartsZone::Bullseye) => "bull",
        Choice::Slots => "spin",
    }
}

fn parse_choice(game: GameKind, pick: &str) -> Option<Choice> {
    let shot = |p: &str| match p {
        "score" => Some(ShotChoice::Score),
        "miss" => Some(ShotChoice::Miss),
        _ => None,
    };
    match game {
        GameKind::Dice => match pick {
            "high" => Some(Choice::Dice(DiceChoice::High)),
            "low" => Some(Choice::Dice(DiceChoice::Low)),
            "even" => Some(Choice::Dice(DiceChoice::Even)),
            "odd" => Some(Choice::Dice(DiceChoice::Odd)),
            _ => None,
        },
        GameKind::Basketball => shot(pick).map(Choice::Basketball),
        GameKind::Football => shot(pick).map(Choice::Football),
        GameKind::Rps => match pick {
            "rock" => Some(Choice::Rps(RpsHand::Rock)),
            "scissors" => Some(Choice::Rps(RpsHand::Scissors)),
            "paper" => Some(Choice::Rps(RpsHand::Paper)),
            _ => None,
        },
        GameKind::Darts => match pick {
            "miss" => Some(Choice::Darts(DartsZone::Miss)),
            "white" => Some(Choice::Darts(DartsZone::White)),
            "red" => Some(Choice::Darts(DartsZone::Red)),
            "bull" => Some(Choice::Darts(DartsZone::Bullseye)),
            _ => None,
        },
        GameKind::Slots => (pick == "spin").then_some(Choice::Slots),
        GameKind::Mines => None,
    }
}

impl CallbackData {
    pub fn parse(data: &str) -> Option<Self> {
        let parts: Vec<&str> = data.split(':').collect();
        let parsed = match parts.as_slice() {
            ["cas", "menu"] => CallbackData::CasinoMenu,
            ["cas", "game", game] => CallbackData::OpenGame(GameKind::parse(game)?),
            ["cas", "pick", game, pick] => CallbackData::Pick(parse_choice(GameKind::parse(game)?, pick)?),
            ["cas", "bombs", n] => CallbackData::Bombs(n.parse().ok()?),
            ["cas", "cell", row, col] => CallbackData::Reveal { row: row.parse().ok()?, col: col.parse().ok()? },
            ["cas", "cashout"] => CallbackData::Cashout,
            ["cas", "back"] => CallbackData::CasinoBack,

            ["shop", "main"] => CallbackData::ShopMain,
            ["shop", "cards"] => CallbackData::ShopCards,
            ["shop", "item", id] => CallbackData::ShopItem(id.parse().ok()?),
            ["shop", "buy", id, with] => CallbackData::BuyItem(id.parse().ok()?, PayWith::parse(with)?),
            ["shop", "bundles"] => CallbackData::ShopBundles,
            ["shop", "bundle", id] => CallbackData::ShopBundle(id.parse().ok()?),
            ["shop", "bbuy", id, with] => CallbackData::BuyBundle(id.parse().ok()?, PayWith::parse(with)?),
            ["shop", "boosters"] => CallbackData::ShopBoosters,
            ["shop", "boost", kind, with] => CallbackData::BuyBooster(BoosterKind::parse(kind)?, PayWith::parse(with)?),
            ["shop", "topup"] => CallbackData::ShopTopUp,
            ["shop", "pack", coins] => CallbackData::TopUpPack(coins.parse().ok()?),

            ["prem", "menu"] => CallbackData::PremiumMenu,
            ["prem", "buy", plan] => CallbackData::BuyPremium(PremiumPlan::parse(plan).ok()?),
            ["bonus", "check"] => CallbackData::CheckBonus,

            ["inv", "main"] => CallbackData::Inventory,
            ["inv", "use", kind] => CallbackData::UseBooster(BoosterKind::parse(kind)?),

            ["top", "back"] => CallbackData::TopBack,
            ["top", kind] => CallbackData::Top(LeaderboardKind::parse(kind)?),
            _ => return None,
        };
        Some(parsed)
    }

    pub fn encode(&self) -> String {
        match self {
            CallbackData::CasinoMenu => "cas:menu".to_string(),
            CallbackData::OpenGame(game) => format!("cas:game:{}", game),
            CallbackData::Pick(choice) => format!("cas:pick:{}:{}", choice.game(), choice_to_str(choice)),
            CallbackData::Bombs(n) => format!("cas:bombs:{}", n),
            CallbackData::Reveal { row, col } => format!("cas:cell:{}:{}", row, col),
            CallbackData::Cashout => "cas:cashout".to_string(),
            CallbackData::CasinoBack => "cas:back".to_string(),

            CallbackData::ShopMain => "shop:main".to_string(),
            CallbackData::ShopCards => "shop:cards".to_string(),
            CallbackData::ShopItem(id) => format!("shop:item:{}", id),
            CallbackData::BuyItem(id, with) => format!("shop:buy:{}:{}", id, with.as_str()),
            CallbackData::ShopBundles => "shop:bundles".to_string(),
            CallbackData::ShopBundle(id) => format!("shop:bundle:{}", id),
            CallbackData::BuyBundle(id, with) => format!("shop:bbuy:{}:{}", id, with.as_str()),
            CallbackData::ShopBoosters => "shop:boosters".to_string(),
            CallbackData::BuyBooster(kind, with) => format!("shop:boost:{}:{}", kind, with.as_str()),
            CallbackData::ShopTopUp => "shop:topup".to_string(),
            CallbackData::TopUpPack(coins) => format!("shop:pack:{}", coins),

            CallbackData::PremiumMenu => "prem:menu".to_string(),
            CallbackData::BuyPremium(plan) => format!("prem:buy:{}", plan),
            CallbackData::CheckBonus => "bonus:check".to_string(),

            CallbackData::Inventory => "inv:main".to_string(),
            CallbackData::UseBooster(kind) => format!("inv:use:{}", kind),

            CallbackData::Top(kind) => format!("top:{}", kind.as_str()),
            CallbackData::TopBack => "top:back".to_string(),
        }
    }

    /// Callbacks on casino messages are bound to the player who opened them
    pub fn is_casino(&self) -> bool {
        matches!(
            self,
            CallbackData::CasinoMenu
                | CallbackData::OpenGame(_)
                | CallbackData::Pick(_)
                | CallbackData::Bombs(_)
                | CallbackData::Reveal { .. }
                | CallbackData::Cashout
                | CallbackData::CasinoBack
        )
    }
}

impl From<CallbackData> for String {
    fn from(data: CallbackData) -> Self {
        data.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_payloads() {
        assert_eq!(CallbackData::parse("cas:game:mines"), Some(CallbackData::OpenGame(GameKind::Mines)));
        assert_eq!(
            CallbackData::parse("cas:pick:darts:bull"),
            Some(CallbackData::Pick(Choice::Darts(DartsZone::Bullseye)))
        );
        assert_eq!(CallbackData::parse("cas:cell:4:0"), Some(CallbackData::Reveal { row: 4, col: 0 }));
        assert_eq!(
            CallbackData::parse("shop:boost:time:stars"),
            Some(CallbackData::BuyBooster(BoosterKind::Time, PayWith::Stars))
        );
        assert_eq!(CallbackData::parse("top:cards"), Some(CallbackData::Top(LeaderboardKind::Cards)));
    }

    #[test]
    fn test_unknown_payloads_are_rejected() {
        for data in ["", "cas", "cas:game:poker", "cas:pick:dice:spin", "shop:buy:x:coins", "prem:buy:2_weeks", "top:money"] {
            assert_eq!(CallbackData::parse(data), None, "{}", data);
        }
    }

    #[test]
    fn test_every_choice_survives_encoding() {
        let picks = [
            Choice::Dice(DiceChoice::Odd),
            Choice::Basketball(ShotChoice::Miss),
            Choice::Football(ShotChoice::Score),
            Choice::Rps(RpsHand::Scissors),
            Choice::Darts(DartsZone::Red),
            Choice::Slots,
        ];
        for choice in picks {
            let data = CallbackData::Pick(choice);
            assert_eq!(CallbackData::parse(&data.encode()), Some(data));
            assert!(data.encode().len() <= 64);
        }
    }
}
