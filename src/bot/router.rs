//! Routes inbound events to handlers: admin commands, text triggers,
//! pending casino bets, inline buttons and payments.

use super::callback::CallbackData;
use super::handlers::admin::AdminCommand;
use super::handlers::{account, admin, cards, casino, report, shop, CallbackCtx, MessageCtx};
use super::inbound::{Inbound, Sender};
use super::state::AppState;
use crate::errors::HomyakResult;
use std::sync::Arc;
use tokio::task::JoinHandle;

const HELP: &str = "🐹 Привет! Я собираю хомяков.\n\n\
хомяк • открыть хомяка\n\
мои хомяки • ваша коллекция\n\
/profile • профиль\n\
/inventory • бустеры\n\
/shop • магазин\n\
/premium • Premium\n\
/bonus • бонус за подписку\n\
/casino • казино (в группах)\n\
/history • последние игры\n\
/top • топ беседы\n\
/promo [код] • активировать промокод\n\
/fav [хомяк] • любимый хомяк";

/// User-level text triggers, slash commands and their Russian aliases
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Draw,
    MyCards,
    Favorite(String),
    Profile,
    Inventory,
    Bonus,
    Promo(String),
    Top,
    Shop,
    Premium,
    Casino,
    History,
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (head, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        let rest = rest.trim().to_string();

        if let Some(slash) = head.strip_prefix('/') {
            let name = slash.split('@').next().unwrap_or(slash).to_lowercase();
            return match name.as_str() {
                "start" | "help" => Some(Command::Help),
                "homyak" => Some(Command::Draw),
                "cards" => Some(Command::MyCards),
                "fav" => Some(Command::Favorite(rest)),
                "profile" => Some(Command::Profile),
                "inventory" => Some(Command::Inventory),
                "bonus" => Some(Command::Bonus),
                "promo" => Some(Command::Promo(rest)),
                "top" => Some(Command::Top),
                "shop" => Some(Command::Shop),
                "premium" => Some(Command::Premium),
                "casino" => Some(Command::Casino),
                "history" => Some(Command::History),
                _ => None,
            };
        }

        let lowered = text.to_lowercase();
        match lowered.as_str() {
            "хомяк" => return Some(Command::Draw),
            "мои хомяки" => return Some(Command::MyCards),
            "профиль" => return Some(Command::Profile),
            "инвентарь" => return Some(Command::Inventory),
            "топ" => return Some(Command::Top),
            "магазин" => return Some(Command::Shop),
            "казино" => return Some(Command::Casino),
            _ => {}
        }
        if head.to_lowercase() == "промо" {
            return Some(Command::Promo(rest));
        }
        None
    }
}

fn is_shop(data: &CallbackData) -> bool {
    matches!(
        data,
        CallbackData::ShopMain
            | CallbackData::ShopCards
            | CallbackData::ShopItem(_)
            | CallbackData::BuyItem(..)
            | CallbackData::ShopBundles
            | CallbackData::ShopBundle(_)
            | CallbackData::BuyBundle(..)
            | CallbackData::ShopBoosters
            | CallbackData::BuyBooster(..)
            | CallbackData::ShopTopUp
            | CallbackData::TopUpPack(_)
            | CallbackData::PremiumMenu
            | CallbackData::BuyPremium(_)
    )
}

#[derive(Clone)]
pub struct Bot {
    state: Arc<AppState>,
}

impl Bot {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Handle one inbound event. Internal failures are reported to the
    /// operators and returned; user mistakes are answered in chat.
    pub async fn handle(&self, event: Inbound) -> HomyakResult<()> {
        let kind = event.kind_name();
        let user_id = event.user();
        tracing::debug!(kind, user_id, "Inbound event");
        let result = self.route(event).await;
        if let Err(e) = &result {
            report(&self.state, kind, e).await;
        }
        result
    }

    async fn route(&self, event: Inbound) -> HomyakResult<()> {
        let state = self.state.as_ref();
        match event {
            Inbound::Message { chat, kind, message_id, from, text } => {
                self.remember(&from).await;
                let ctx = MessageCtx { chat, kind, message_id, from: &from };
                self.on_message(&ctx, &text).await
            }
            Inbound::Callback { id, chat, kind, message_id, from, data } => {
                self.remember(&from).await;
                let ctx = CallbackCtx { id: &id, chat, kind, message_id, from: &from };
                let Some(data) = CallbackData::parse(&data) else {
                    tracing::debug!(data = %data, "Ignoring unknown callback data");
                    return ctx.ack(state).await;
                };
                if data.is_casino() {
                    casino::callback(state, &ctx, data).await
                } else if is_shop(&data) {
                    shop::callback(state, &ctx, data).await
                } else {
                    account::callback(state, &ctx, data).await
                }
            }
            Inbound::PreCheckout { id, from, payload } => shop::pre_checkout(state, &id, &from, &payload).await,
            Inbound::Payment { chat, from, payload, charge_id, total } => {
                shop::payment(state, chat, &from, &payload, &charge_id, total).await
            }
            Inbound::MemberLeft { chat, user } => account::member_left(state, chat, user).await,
        }
    }

    async fn on_message(&self, ctx: &MessageCtx<'_>, text: &str) -> HomyakResult<()> {
        let state = self.state.as_ref();
        if let Some(command) = AdminCommand::parse(text) {
            return admin::handle(state, ctx, command).await;
        }
        let command = Command::parse(text);
        if command.is_none() && casino::awaits_bet(state, ctx) {
            return casino::bet(state, ctx, text).await;
        }
        match command {
            Some(Command::Help) => {
                ctx.reply(state, HELP, None).await?;
                Ok(())
            }
            Some(Command::Draw) => cards::draw(state, ctx).await,
            Some(Command::MyCards) => cards::my_cards(state, ctx).await,
            Some(Command::Favorite(query)) => cards::favorite(state, ctx, &query).await,
            Some(Command::Profile) => account::profile(state, ctx).await,
            Some(Command::Inventory) => account::inventory(state, ctx).await,
            Some(Command::Bonus) => account::bonus(state, ctx).await,
            Some(Command::Promo(code)) => account::promo(state, ctx, &code).await,
            Some(Command::Top) => account::top(state, ctx).await,
            Some(Command::Shop) => shop::open(state, ctx).await,
            Some(Command::Premium) => shop::premium(state, ctx).await,
            Some(Command::Casino) => casino::menu(state, ctx).await,
            Some(Command::History) => casino::history(state, ctx).await,
            None => Ok(()),
        }
    }

    async fn remember(&self, from: &Sender) {
        if let Err(e) = self.state.profile.remember_name(from.id, &from.display()).await {
            tracing::warn!(user_id = from.id, error = %e, "Could not store display name");
        }
    }
}

/// Periodically evict idle casino sessions and message bindings
pub fn spawn_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let period = state.config.sweep_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = state.casino.sweep().await {
                report(&state, "casino sweep", &e).await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_triggers() {
        assert_eq!(Command::parse("Хомяк"), Some(Command::Draw));
        assert_eq!(Command::parse("/casino@homyak_bot"), Some(Command::Casino));
        assert_eq!(Command::parse("промо SUMMER"), Some(Command::Promo("SUMMER".into())));
        assert_eq!(Command::parse("/promo"), Some(Command::Promo(String::new())));
        assert_eq!(Command::parse("/fav Пилот"), Some(Command::Favorite("Пилот".into())));
        assert_eq!(Command::parse("150"), None);
        assert_eq!(Command::parse("/unknown"), None);
    }

    #[test]
    fn test_shop_callbacks_are_not_casino() {
        let data = CallbackData::BuyItem(3, super::super::callback::PayWith::Coins);
        assert!(is_shop(&data));
        assert!(!data.is_casino());
        assert!(!is_shop(&CallbackData::CheckBonus));
    }

    #[tokio::test]
    async fn test_sweeper_runs_until_aborted() {
        use crate::audit::TracingAudit;
        use crate::bot::testing::ScriptedTransport;
        use crate::config::HomyakConfig;
        use crate::ledger::Ledger;
        use crate::random::ScriptedDraws;

        let state = Arc::new(AppState::new(
            HomyakConfig::testing(),
            Arc::new(Ledger::in_memory()),
            Arc::new(ScriptedTransport::new()),
            Arc::new(TracingAudit),
            Arc::new(ScriptedDraws::new()),
        ));
        let sweeper = spawn_sweeper(state.clone());
        tokio::task::yield_now().await;
        assert!(!sweeper.is_finished());

        sweeper.abort();
        assert!(sweeper.await.unwrap_err().is_cancelled());
    }
}
