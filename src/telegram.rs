//! Live Telegram transport and update dispatcher on teloxide.

use crate::bot::{Bot as Router, ChatKind, Inbound, Invoice, Keyboard, OutgoingMessage, Sender, Transport};
use crate::bot::transport::ButtonAction;
use crate::casino::MessageId as HomyakMessageId;
use crate::errors::{HomyakError, HomyakResult};
use crate::ledger::{ChatId as HomyakChatId, UserId as HomyakUserId};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    Chat, ChatMemberUpdated, DiceEmoji, InlineKeyboardButton, InlineKeyboardMarkup, LabeledPrice, MessageId,
    PreCheckoutQuery, ReplyParameters, ThreadId, User,
};

const STARS_CURRENCY: &str = "XTR";

fn transport_error(e: impl std::fmt::Display) -> HomyakError {
    HomyakError::Transport(e.to_string())
}

fn markup(keyboard: &Keyboard) -> HomyakResult<InlineKeyboardMarkup> {
    let mut rows = Vec::with_capacity(keyboard.rows.len());
    for row in &keyboard.rows {
        let mut buttons = Vec::with_capacity(row.len());
        for button in row {
            buttons.push(match &button.action {
                ButtonAction::Callback(data) => InlineKeyboardButton::callback(button.text.clone(), data.clone()),
                ButtonAction::Url(url) => InlineKeyboardButton::url(button.text.clone(), url.parse().map_err(transport_error)?),
            });
        }
        rows.push(buttons);
    }
    Ok(InlineKeyboardMarkup::new(rows))
}

fn dice_emoji(emoji: &str) -> DiceEmoji {
    match emoji {
        "🏀" => DiceEmoji::Basketball,
        "⚽" => DiceEmoji::Football,
        "🎰" => DiceEmoji::SlotMachine,
        "🎯" => DiceEmoji::Darts,
        _ => DiceEmoji::Dice,
    }
}

fn user_id(user: HomyakUserId) -> UserId {
    UserId(user as u64)
}

pub struct TeloxideTransport {
    bot: teloxide::Bot,
}

impl TeloxideTransport {
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TeloxideTransport {
    async fn send(&self, message: OutgoingMessage) -> HomyakResult<HomyakMessageId> {
        let mut request = self.bot.send_message(ChatId(message.chat), message.text);
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(markup(keyboard)?);
        }
        if let Some(to) = message.reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(to)).allow_sending_without_reply());
        }
        let sent = request.await.map_err(transport_error)?;
        Ok(sent.id.0)
    }

    async fn edit(&self, chat: HomyakChatId, message: HomyakMessageId, text: &str, keyboard: Option<Keyboard>) -> HomyakResult<()> {
        let mut request = self.bot.edit_message_text(ChatId(chat), MessageId(message), text);
        if let Some(keyboard) = &keyboard {
            request = request.reply_markup(markup(keyboard)?);
        }
        request.await.map_err(transport_error)?;
        Ok(())
    }

    async fn delete(&self, chat: HomyakChatId, message: HomyakMessageId) -> HomyakResult<()> {
        self.bot
            .delete_message(ChatId(chat), MessageId(message))
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: &str, alert: bool) -> HomyakResult<()> {
        let mut request = self.bot.answer_callback_query(callback_id.to_string());
        if !text.is_empty() {
            request = request.text(text).show_alert(alert);
        }
        request.await.map_err(transport_error)?;
        Ok(())
    }

    async fn roll_dice(&self, chat: HomyakChatId, emoji: &str, reply_to: Option<HomyakMessageId>) -> HomyakResult<(HomyakMessageId, u8)> {
        let mut request = self.bot.send_dice(ChatId(chat)).emoji(dice_emoji(emoji));
        if let Some(to) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(to)).allow_sending_without_reply());
        }
        let sent = request.await.map_err(transport_error)?;
        let value = sent
            .dice()
            .map(|dice| dice.value)
            .ok_or_else(|| transport_error("dice message without a value"))?;
        Ok((sent.id.0, value))
    }

    async fn send_invoice(&self, chat: HomyakChatId, invoice: Invoice) -> HomyakResult<()> {
        self.bot
            .send_invoice(
                ChatId(chat),
                invoice.title.clone(),
                invoice.description,
                invoice.payload,
                "",
                STARS_CURRENCY,
                vec![LabeledPrice::new(invoice.title, invoice.stars)],
            )
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn answer_pre_checkout(&self, query_id: &str, ok: bool, error: Option<&str>) -> HomyakResult<()> {
        let mut request = self.bot.answer_pre_checkout_query(query_id.to_string(), ok);
        if let Some(error) = error {
            request = request.error_message(error);
        }
        request.await.map_err(transport_error)?;
        Ok(())
    }

    async fn refund_stars(&self, user: HomyakUserId, charge_id: &str) -> HomyakResult<()> {
        self.bot
            .refund_star_payment(user_id(user), charge_id.to_string())
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn is_channel_member(&self, channel: HomyakChatId, user: HomyakUserId) -> HomyakResult<bool> {
        self.is_chat_member(channel, user).await
    }

    async fn is_chat_member(&self, chat: HomyakChatId, user: HomyakUserId) -> HomyakResult<bool> {
        match self.bot.get_chat_member(ChatId(chat), user_id(user)).await {
            Ok(member) => Ok(member.kind.is_present()),
            // Unknown users come back as an API error rather than `left`
            Err(teloxide::RequestError::Api(_)) => Ok(false),
            Err(e) => Err(transport_error(e)),
        }
    }

    async fn notify_operator(&self, chat: HomyakChatId, thread: Option<i32>, text: &str) -> HomyakResult<()> {
        let mut request = self.bot.send_message(ChatId(chat), text);
        if let Some(thread) = thread {
            request = request.message_thread_id(ThreadId(MessageId(thread)));
        }
        request.await.map_err(transport_error)?;
        Ok(())
    }
}

fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::Private
    } else if chat.is_channel() {
        ChatKind::Channel
    } else {
        ChatKind::Group
    }
}

fn sender(user: &User) -> Sender {
    Sender {
        id: user.id.0 as HomyakUserId,
        first_name: user.first_name.clone(),
        username: user.username.clone(),
    }
}

/// Translate a message update; `None` for anything the bot ignores
fn message_event(msg: &Message) -> Option<Inbound> {
    let chat = msg.chat.id.0;
    if let Some(left) = msg.left_chat_member() {
        return Some(Inbound::MemberLeft { chat, user: left.id.0 as HomyakUserId });
    }
    let from = sender(msg.from.as_ref()?);
    if let Some(payment) = msg.successful_payment() {
        return Some(Inbound::Payment {
            chat,
            from,
            payload: payment.invoice_payload.clone(),
            charge_id: payment.telegram_payment_charge_id.to_string(),
            total: payment.total_amount,
        });
    }
    Some(Inbound::Message {
        chat,
        kind: chat_kind(&msg.chat),
        message_id: msg.id.0,
        from,
        text: msg.text()?.to_string(),
    })
}

async fn dispatch(router: &Router, event: Inbound) {
    let kind = event.kind_name();
    if let Err(e) = router.handle(event).await {
        tracing::debug!(kind, error = %e, "Update failed");
    }
}

async fn on_message(msg: Message, router: Router) -> ResponseResult<()> {
    if let Some(event) = message_event(&msg) {
        dispatch(&router, event).await;
    }
    Ok(())
}

async fn on_callback(query: CallbackQuery, router: Router) -> ResponseResult<()> {
    let (Some(message), Some(data)) = (query.message.as_ref(), query.data.clone()) else {
        return Ok(());
    };
    let event = Inbound::Callback {
        id: query.id.clone(),
        chat: message.chat().id.0,
        kind: chat_kind(message.chat()),
        message_id: message.id().0,
        from: sender(&query.from),
        data,
    };
    dispatch(&router, event).await;
    Ok(())
}

async fn on_pre_checkout(query: PreCheckoutQuery, router: Router) -> ResponseResult<()> {
    let event = Inbound::PreCheckout {
        id: query.id.clone(),
        from: sender(&query.from),
        payload: query.invoice_payload.clone(),
    };
    dispatch(&router, event).await;
    Ok(())
}

async fn on_chat_member(update: ChatMemberUpdated, router: Router) -> ResponseResult<()> {
    if update.old_chat_member.kind.is_present() && !update.new_chat_member.kind.is_present() {
        let event = Inbound::MemberLeft {
            chat: update.chat.id.0,
            user: update.new_chat_member.user.id.0 as HomyakUserId,
        };
        dispatch(&router, event).await;
    }
    Ok(())
}

/// Long-poll Telegram until ctrl-c
pub async fn run(bot: teloxide::Bot, router: Router) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
        .branch(Update::filter_pre_checkout_query().endpoint(on_pre_checkout))
        .branch(Update::filter_chat_member().endpoint(on_chat_member));

    tracing::info!("Starting Telegram dispatcher");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
