//! In-memory transport that records everything the bot asks for and
//! replays scripted dice values and memberships. Used by the tests and the
//! offline tooling.

use super::transport::{Invoice, Keyboard, OutgoingMessage, Transport};
use crate::casino::MessageId;
use crate::errors::{HomyakError, HomyakResult};
use crate::ledger::{ChatId, UserId};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub chat: ChatId,
    pub message: MessageId,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAnswer {
    pub callback_id: String,
    pub text: String,
    pub alert: bool,
}

#[derive(Debug, Default)]
struct Recorded {
    next_message: MessageId,
    sent: Vec<(MessageId, OutgoingMessage)>,
    edits: Vec<Edit>,
    deleted: Vec<(ChatId, MessageId)>,
    answers: Vec<CallbackAnswer>,
    dice: VecDeque<u8>,
    invoices: Vec<(ChatId, Invoice)>,
    pre_checkouts: Vec<(String, bool, Option<String>)>,
    refunds: Vec<(UserId, String)>,
    operator: Vec<(ChatId, Option<i32>, String)>,
    channel_members: HashSet<(ChatId, UserId)>,
    absent_from_chat: HashSet<(ChatId, UserId)>,
    fail_operator: bool,
    last_text: Option<String>,
}

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    inner: Mutex<Recorded>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Value of the next `roll_dice`; 1 when nothing is queued
    pub fn push_dice(&self, value: u8) -> &Self {
        self.lock().dice.push_back(value);
        self
    }

    pub fn join_channel(&self, channel: ChatId, user: UserId) {
        self.lock().channel_members.insert((channel, user));
    }

    pub fn leave_channel(&self, channel: ChatId, user: UserId) {
        self.lock().channel_members.remove(&(channel, user));
    }

    /// Everyone counts as a chat member unless marked absent
    pub fn mark_absent(&self, chat: ChatId, user: UserId) {
        self.lock().absent_from_chat.insert((chat, user));
    }

    pub fn fail_operator_notifications(&self, fail: bool) {
        self.lock().fail_operator = fail;
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.lock().sent.iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn last_sent(&self) -> Option<(MessageId, OutgoingMessage)> {
        self.lock().sent.last().cloned()
    }

    pub fn edits(&self) -> Vec<Edit> {
        self.lock().edits.clone()
    }

    pub fn last_edit(&self) -> Option<Edit> {
        self.lock().edits.last().cloned()
    }

    pub fn answers(&self) -> Vec<CallbackAnswer> {
        self.lock().answers.clone()
    }

    pub fn last_answer(&self) -> Option<CallbackAnswer> {
        self.lock().answers.last().cloned()
    }

    pub fn invoices(&self) -> Vec<(ChatId, Invoice)> {
        self.lock().invoices.clone()
    }

    pub fn pre_checkouts(&self) -> Vec<(String, bool, Option<String>)> {
        self.lock().pre_checkouts.clone()
    }

    pub fn refunds(&self) -> Vec<(UserId, String)> {
        self.lock().refunds.clone()
    }

    pub fn operator_messages(&self) -> Vec<String> {
        self.lock().operator.iter().map(|(_, _, text)| text.clone()).collect()
    }

    pub fn deleted(&self) -> Vec<(ChatId, MessageId)> {
        self.lock().deleted.clone()
    }

    /// Last text shown to the user, sent or edited, whichever came later
    pub fn last_text(&self) -> Option<String> {
        self.lock().last_text.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, message: OutgoingMessage) -> HomyakResult<MessageId> {
        let mut recorded = self.lock();
        recorded.next_message += 1;
        let id = recorded.next_message;
        recorded.last_text = Some(message.text.clone());
        recorded.sent.push((id, message));
        Ok(id)
    }

    async fn edit(&self, chat: ChatId, message: MessageId, text: &str, keyboard: Option<Keyboard>) -> HomyakResult<()> {
        let mut recorded = self.lock();
        recorded.last_text = Some(text.to_string());
        recorded.edits.push(Edit { chat, message, text: text.to_string(), keyboard });
        Ok(())
    }

    async fn delete(&self, chat: ChatId, message: MessageId) -> HomyakResult<()> {
        self.lock().deleted.push((chat, message));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: &str, alert: bool) -> HomyakResult<()> {
        self.lock().answers.push(CallbackAnswer {
            callback_id: callback_id.to_string(),
            text: text.to_string(),
            alert,
        });
        Ok(())
    }

    async fn roll_dice(&self, chat: ChatId, emoji: &str, reply_to: Option<MessageId>) -> HomyakResult<(MessageId, u8)> {
        let mut recorded = self.lock();
        let value = recorded.dice.pop_front().unwrap_or(1);
        recorded.next_message += 1;
        let id = recorded.next_message;
        let mut message = OutgoingMessage::new(chat, emoji);
        if let Some(to) = reply_to {
            message = message.reply_to(to);
        }
        recorded.sent.push((id, message));
        Ok((id, value))
    }

    async fn send_invoice(&self, chat: ChatId, invoice: Invoice) -> HomyakResult<()> {
        self.lock().invoices.push((chat, invoice));
        Ok(())
    }

    async fn answer_pre_checkout(&self, query_id: &str, ok: bool, error: Option<&str>) -> HomyakResult<()> {
        self.lock()
            .pre_checkouts
            .push((query_id.to_string(), ok, error.map(str::to_string)));
        Ok(())
    }

    async fn refund_stars(&self, user: UserId, charge_id: &str) -> HomyakResult<()> {
        self.lock().refunds.push((user, charge_id.to_string()));
        Ok(())
    }

    async fn is_channel_member(&self, channel: ChatId, user: UserId) -> HomyakResult<bool> {
        Ok(self.lock().channel_members.contains(&(channel, user)))
    }

    async fn is_chat_member(&self, chat: ChatId, user: UserId) -> HomyakResult<bool> {
        Ok(!self.lock().absent_from_chat.contains(&(chat, user)))
    }

    async fn notify_operator(&self, chat: ChatId, thread: Option<i32>, text: &str) -> HomyakResult<()> {
        let mut recorded = self.lock();
        if recorded.fail_operator {
            return Err(HomyakError::Transport("operator chat unavailable".to_string()));
        }
        recorded.operator.push((chat, thread, text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_scripts() {
        let transport = ScriptedTransport::new();
        transport.push_dice(6);
        let first = transport.send(OutgoingMessage::new(1, "hi")).await.unwrap();
        let (dice, value) = transport.roll_dice(1, "🎲", Some(first)).await.unwrap();
        assert_eq!((first, dice, value), (1, 2, 6));
        assert_eq!(transport.roll_dice(1, "🎲", None).await.unwrap().1, 1);

        transport.join_channel(-200, 5);
        assert!(transport.is_channel_member(-200, 5).await.unwrap());
        assert!(!transport.is_channel_member(-200, 6).await.unwrap());
        transport.mark_absent(-1, 5);
        assert!(!transport.is_chat_member(-1, 5).await.unwrap());
    }
}
