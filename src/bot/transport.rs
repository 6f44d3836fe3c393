//! Outbound side of the bot: what handlers may ask the chat platform to do.

use crate::casino::MessageId;
use crate::errors::HomyakResult;
use crate::ledger::{ChatId, UserId};
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self { text: text.into(), action: ButtonAction::Callback(data.into()) }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self { text: text.into(), action: ButtonAction::Url(url.into()) }
    }
}

/// Inline keyboard, row by row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.rows.push(buttons);
        }
        self
    }

    pub fn button(self, button: Button) -> Self {
        self.row(vec![button])
    }

    /// All callback payloads, in layout order
    pub fn callbacks(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|b| match &b.action {
                ButtonAction::Callback(data) => Some(data.as_str()),
                ButtonAction::Url(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat: ChatId,
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub reply_to: Option<MessageId>,
}

impl OutgoingMessage {
    pub fn new(chat: ChatId, text: impl Into<String>) -> Self {
        Self { chat, text: text.into(), keyboard: None, reply_to: None }
    }

    pub fn keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn reply_to(mut self, message: MessageId) -> Self {
        self.reply_to = Some(message);
        self
    }
}

/// Telegram Stars invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub title: String,
    pub description: String,
    pub payload: String,
    pub stars: u32,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: OutgoingMessage) -> HomyakResult<MessageId>;

    async fn edit(&self, chat: ChatId, message: MessageId, text: &str, keyboard: Option<Keyboard>) -> HomyakResult<()>;

    async fn delete(&self, chat: ChatId, message: MessageId) -> HomyakResult<()>;

    /// `alert` shows a modal instead of a toast
    async fn answer_callback(&self, callback_id: &str, text: &str, alert: bool) -> HomyakResult<()>;

    /// Send an animated dice and return its message and value
    async fn roll_dice(&self, chat: ChatId, emoji: &str, reply_to: Option<MessageId>) -> HomyakResult<(MessageId, u8)>;

    async fn send_invoice(&self, chat: ChatId, invoice: Invoice) -> HomyakResult<()>;

    async fn answer_pre_checkout(&self, query_id: &str, ok: bool, error: Option<&str>) -> HomyakResult<()>;

    async fn refund_stars(&self, user: UserId, charge_id: &str) -> HomyakResult<()>;

    async fn is_channel_member(&self, channel: ChatId, user: UserId) -> HomyakResult<bool>;

    async fn is_chat_member(&self, chat: ChatId, user: UserId) -> HomyakResult<bool>;

    /// Post to the operator chat, optionally into a forum topic
    async fn notify_operator(&self, chat: ChatId, thread: Option<i32>, text: &str) -> HomyakResult<()>;
}
