//! Feature handlers. Each takes the shared state plus the context of the
//! inbound event and talks back through the transport.

pub mod account;
pub mod admin;
pub mod cards;
pub mod casino;
pub mod shop;

use super::inbound::{ChatKind, Sender};
use super::state::AppState;
use super::texts;
use super::transport::{Keyboard, OutgoingMessage};
use crate::audit::AuditEvent;
use crate::casino::MessageId;
use crate::errors::{HomyakError, HomyakResult};
use crate::ledger::ChatId;

/// A text message addressed to the bot
#[derive(Debug, Clone, Copy)]
pub struct MessageCtx<'a> {
    pub chat: ChatId,
    pub kind: ChatKind,
    pub message_id: MessageId,
    pub from: &'a Sender,
}

/// A tap on an inline button of `message_id`
#[derive(Debug, Clone, Copy)]
pub struct CallbackCtx<'a> {
    pub id: &'a str,
    pub chat: ChatId,
    pub kind: ChatKind,
    pub message_id: MessageId,
    pub from: &'a Sender,
}

impl MessageCtx<'_> {
    pub async fn reply(&self, state: &AppState, text: impl Into<String>, keyboard: Option<Keyboard>) -> HomyakResult<MessageId> {
        let mut message = OutgoingMessage::new(self.chat, text).reply_to(self.message_id);
        if let Some(keyboard) = keyboard {
            message = message.keyboard(keyboard);
        }
        state.transport.send(message).await
    }
}

impl CallbackCtx<'_> {
    /// Replace the text and keyboard of the tapped message
    pub async fn edit(&self, state: &AppState, text: impl AsRef<str>, keyboard: Option<Keyboard>) -> HomyakResult<()> {
        state
            .transport
            .edit(self.chat, self.message_id, text.as_ref(), keyboard)
            .await
    }

    pub async fn ack(&self, state: &AppState) -> HomyakResult<()> {
        state.transport.answer_callback(self.id, "", false).await
    }

    pub async fn toast(&self, state: &AppState, text: &str) -> HomyakResult<()> {
        state.transport.answer_callback(self.id, text, false).await
    }

    pub async fn alert(&self, state: &AppState, text: &str) -> HomyakResult<()> {
        state.transport.answer_callback(self.id, text, true).await
    }
}

/// Log an internal failure and forward it to the operator chat
pub async fn report(state: &AppState, context: &str, error: &HomyakError) {
    tracing::error!(context, error = %error, "Handler failed");
    let event = AuditEvent::InternalError { context: context.to_string(), error: error.to_string() };
    if let Err(e) = state.audit.record(event).await {
        tracing::warn!(error = %e, "Failed to report error to operators");
    }
}

/// Record an audit event; a failed notification never fails the handler
pub async fn audit(state: &AppState, event: AuditEvent) {
    if let Err(e) = state.audit.record(event).await {
        tracing::warn!(error = %e, "Audit notification failed");
    }
}

/// User-facing errors become a reply, anything else is returned
pub async fn answer_message(state: &AppState, ctx: &MessageCtx<'_>, error: HomyakError) -> HomyakResult<()> {
    match texts::user_message(&error) {
        Some(text) => {
            ctx.reply(state, text, None).await?;
            Ok(())
        }
        None => Err(error),
    }
}

pub async fn answer_callback(state: &AppState, ctx: &CallbackCtx<'_>, error: HomyakError) -> HomyakResult<()> {
    match texts::user_message(&error) {
        Some(text) => ctx.alert(state, &text).await,
        None => Err(error),
    }
}
