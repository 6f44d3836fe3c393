//! Shared harness: in-memory ledger, scripted draws, scripted transport.

#![allow(dead_code)]

use homyak::audit::TransportAudit;
use homyak::bot::testing::ScriptedTransport;
use homyak::bot::{AppState, Bot, ChatKind, Inbound, Sender};
use homyak::casino::MessageId;
use homyak::config::HomyakConfig;
use homyak::ledger::{ChatId, Ledger, UserId};
use homyak::random::ScriptedDraws;
use std::sync::Arc;

pub const GROUP: ChatId = -100500;

pub struct Harness {
    pub bot: Bot,
    pub transport: Arc<ScriptedTransport>,
    pub draws: Arc<ScriptedDraws>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_ledger(Arc::new(Ledger::in_memory()))
    }

    pub fn with_ledger(ledger: Arc<Ledger>) -> Self {
        Self::build(ledger, HomyakConfig::testing())
    }

    /// No menu debounce, for flows that reopen the same game
    pub fn without_debounce() -> Self {
        let mut config = HomyakConfig::testing();
        config.casino.menu_debounce_secs = 0;
        Self::build(Arc::new(Ledger::in_memory()), config)
    }

    pub fn build(ledger: Arc<Ledger>, config: HomyakConfig) -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let draws = Arc::new(ScriptedDraws::new());
        let audit = Arc::new(TransportAudit::new(transport.clone(), &config.bot));
        let state = AppState::new(config, ledger, transport.clone(), audit, draws.clone());
        Self { bot: Bot::new(Arc::new(state)), transport, draws }
    }

    pub fn state(&self) -> &AppState {
        self.bot.state().as_ref()
    }

    pub async fn say(&self, chat: ChatId, user: UserId, text: &str) {
        let kind = if chat < 0 { ChatKind::Group } else { ChatKind::Private };
        let event = Inbound::Message {
            chat,
            kind,
            message_id: 10_000,
            from: Sender::new(user, format!("Player{}", user)),
            text: text.to_string(),
        };
        self.bot.handle(event).await.unwrap();
    }

    pub async fn tap(&self, chat: ChatId, user: UserId, message_id: MessageId, data: impl Into<String>) {
        let kind = if chat < 0 { ChatKind::Group } else { ChatKind::Private };
        let event = Inbound::Callback {
            id: format!("cb-{}", message_id),
            chat,
            kind,
            message_id,
            from: Sender::new(user, format!("Player{}", user)),
            data: data.into(),
        };
        self.bot.handle(event).await.unwrap();
    }

    /// Id of the last message the bot sent
    pub fn last_message_id(&self) -> MessageId {
        self.transport.last_sent().map(|(id, _)| id).unwrap_or_default()
    }

    pub fn last_text(&self) -> String {
        self.transport.last_text().unwrap_or_default()
    }
}
