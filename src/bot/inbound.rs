//! Inbound events, already stripped of transport specifics.

use crate::casino::MessageId;
use crate::ledger::{ChatId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Channel,
}

impl ChatKind {
    pub fn is_group(&self) -> bool {
        *self == ChatKind::Group
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub first_name: String,
    pub username: Option<String>,
}

impl Sender {
    pub fn new(id: UserId, first_name: impl Into<String>) -> Self {
        Self { id, first_name: first_name.into(), username: None }
    }

    /// `@username` when there is one, the first name otherwise
    pub fn display(&self) -> String {
        match &self.username {
            Some(name) => format!("@{}", name),
            None if !self.first_name.is_empty() => self.first_name.clone(),
            None => format!("ID {}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message {
        chat: ChatId,
        kind: ChatKind,
        message_id: MessageId,
        from: Sender,
        text: String,
    },
    Callback {
        id: String,
        chat: ChatId,
        kind: ChatKind,
        message_id: MessageId,
        from: Sender,
        data: String,
    },
    PreCheckout {
        id: String,
        from: Sender,
        payload: String,
    },
    Payment {
        chat: ChatId,
        from: Sender,
        payload: String,
        charge_id: String,
        total: u32,
    },
    /// A user left (or was removed from) a chat or channel
    MemberLeft {
        chat: ChatId,
        user: UserId,
    },
}

impl Inbound {
    pub fn user(&self) -> UserId {
        match self {
            Inbound::Message { from, .. }
            | Inbound::Callback { from, .. }
            | Inbound::PreCheckout { from, .. }
            | Inbound::Payment { from, .. } => from.id,
            Inbound::MemberLeft { user, .. } => *user,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Inbound::Message { .. } => "message",
            Inbound::Callback { .. } => "callback",
            Inbound::PreCheckout { .. } => "pre_checkout",
            Inbound::Payment { .. } => "payment",
            Inbound::MemberLeft { .. } => "member_left",
        }
    }
}
