//! Profile, inventory, leaderboards, channel bonus and promo codes.

use super::{answer_callback, answer_message, audit, CallbackCtx, MessageCtx};
use crate::audit::AuditEvent;
use crate::bonus::BonusChange;
use crate::bot::callback::CallbackData;
use crate::bot::keyboards;
use crate::bot::state::AppState;
use crate::bot::texts;
use crate::bot::transport::{Button, Keyboard, OutgoingMessage};
use crate::errors::HomyakResult;
use crate::ledger::{BoosterKind, ChatId, UserId};
use crate::profile::{LeaderboardEntry, LeaderboardKind};
use chrono::Utc;

const TOP_SIZE: usize = 10;
const TOP_TITLE: &str = "🏆 Топ беседы\n\nВыберите категорию:";

pub async fn profile(state: &AppState, ctx: &MessageCtx<'_>) -> HomyakResult<()> {
    let profile = state.profile.profile(ctx.from.id, Utc::now())?;
    let keyboard = Keyboard::new().button(Button::callback("🎒 Инвентарь", CallbackData::Inventory));
    ctx.reply(state, texts::profile(&ctx.from.display(), &profile), Some(keyboard))
        .await?;
    Ok(())
}

pub async fn inventory(state: &AppState, ctx: &MessageCtx<'_>) -> HomyakResult<()> {
    let profile = state.profile.profile(ctx.from.id, Utc::now())?;
    ctx.reply(
        state,
        texts::inventory(&profile),
        Some(keyboards::inventory(profile.luck_boosters, profile.time_boosters)),
    )
    .await?;
    Ok(())
}

pub async fn bonus(state: &AppState, ctx: &MessageCtx<'_>) -> HomyakResult<()> {
    if state.bonus.status(ctx.from.id)?.active {
        ctx.reply(state, "✅ У вас уже активированы бонусы!", None).await?;
        return Ok(());
    }
    ctx.reply(
        state,
        "📒 Задания\nПодпишитесь на канал, чтобы получить бонус:",
        Some(keyboards::bonus(&state.config.bot.bonus_channel_link)),
    )
    .await?;
    Ok(())
}

/// `/promo CODE` or "промо CODE"
pub async fn promo(state: &AppState, ctx: &MessageCtx<'_>, code: &str) -> HomyakResult<()> {
    let code = code.trim();
    if code.is_empty() {
        ctx.reply(state, "❌ Использование: /promo [код]", None).await?;
        return Ok(());
    }
    let redemption = match state.promo.redeem(ctx.from.id, code, Utc::now()).await {
        Ok(redemption) => redemption,
        Err(e) => return answer_message(state, ctx, e).await,
    };
    ctx.reply(state, texts::promo_granted(&redemption.granted), None).await?;
    audit(
        state,
        AuditEvent::PromoUsed {
            user: ctx.from.id,
            code: redemption.promo.code.clone(),
            reward: redemption.promo.reward.to_string(),
            remaining: redemption.promo.remaining_uses(),
        },
    )
    .await;
    Ok(())
}

pub async fn top(state: &AppState, ctx: &MessageCtx<'_>) -> HomyakResult<()> {
    ctx.reply(state, TOP_TITLE, Some(keyboards::top_menu())).await?;
    Ok(())
}

/// Leaderboard rows for users still in `chat`, with their display names
async fn chat_leaderboard(state: &AppState, chat: ChatId, kind: LeaderboardKind) -> HomyakResult<Vec<(LeaderboardEntry, String)>> {
    let mut rows = Vec::with_capacity(TOP_SIZE);
    for entry in state.profile.leaderboard(kind)? {
        if rows.len() == TOP_SIZE {
            break;
        }
        if !state.transport.is_chat_member(chat, entry.user).await? {
            continue;
        }
        let name = state.profile.display_name(entry.user)?;
        rows.push((entry, name));
    }
    Ok(rows)
}

pub async fn callback(state: &AppState, ctx: &CallbackCtx<'_>, data: CallbackData) -> HomyakResult<()> {
    match dispatch(state, ctx, data).await {
        Ok(()) => Ok(()),
        Err(e) => answer_callback(state, ctx, e).await,
    }
}

async fn dispatch(state: &AppState, ctx: &CallbackCtx<'_>, data: CallbackData) -> HomyakResult<()> {
    let user = ctx.from.id;
    let now = Utc::now();
    match data {
        CallbackData::Top(kind) => {
            let rows = chat_leaderboard(state, ctx.chat, kind).await?;
            ctx.edit(state, texts::leaderboard(kind, &rows, user), Some(keyboards::top_back()))
                .await?;
        }
        CallbackData::TopBack => ctx.edit(state, TOP_TITLE, Some(keyboards::top_menu())).await?,
        CallbackData::Inventory => {
            let profile = state.profile.profile(user, now)?;
            ctx.edit(
                state,
                texts::inventory(&profile),
                Some(keyboards::inventory(profile.luck_boosters, profile.time_boosters)),
            )
            .await?;
        }
        CallbackData::UseBooster(kind) => {
            match kind {
                BoosterKind::Luck => state.cards.activate_luck(user, now).await?,
                BoosterKind::Time => state.cards.activate_time(user, now).await?,
            }
            let profile = state.profile.profile(user, now)?;
            let note = match kind {
                BoosterKind::Luck => "🍀 Удача сработает при следующем открытии хомяка".to_string(),
                BoosterKind::Time => format!("⏳ Ожидание сокращено на час. Осталось: {}", texts::duration(profile.cooldown_secs)),
            };
            ctx.edit(
                state,
                format!("{}\n\n{}", note, texts::inventory(&profile)),
                Some(keyboards::inventory(profile.luck_boosters, profile.time_boosters)),
            )
            .await?;
        }
        CallbackData::CheckBonus => return check_bonus(state, ctx).await,
        _ => return Ok(()),
    }
    ctx.ack(state).await
}

async fn check_bonus(state: &AppState, ctx: &CallbackCtx<'_>) -> HomyakResult<()> {
    let user = ctx.from.id;
    let channel = state.config.bot.bonus_channel_id;
    if !state.transport.is_channel_member(channel, user).await? {
        return ctx.alert(state, "❌ Вы не подписаны на канал").await;
    }
    match state.bonus.activate(user, Utc::now()).await? {
        BonusChange::Activated { premium_snapshot } => {
            ctx.edit(
                state,
                "✅ Бонусы активированы!\nВам было выдано (навсегда):\n\n\
                 Кд 6 часов вместо 7 (при наличии Premium 4 часа вместо 5)\n\
                 +500 очков с каждого хомяка (при наличии Premium +700 очков)",
                None,
            )
            .await?;
            audit(state, AuditEvent::BonusChanged { user, active: true, premium: premium_snapshot }).await;
            ctx.ack(state).await
        }
        _ => ctx.toast(state, "✅ У вас уже активированы бонусы!").await,
    }
}

/// Someone left a chat; only the bonus channel matters
pub async fn member_left(state: &AppState, chat: ChatId, user: UserId) -> HomyakResult<()> {
    if chat != state.config.bot.bonus_channel_id {
        return Ok(());
    }
    if state.bonus.remove(user).await? != BonusChange::Removed {
        return Ok(());
    }
    audit(state, AuditEvent::BonusChanged { user, active: false, premium: false }).await;
    let notice = OutgoingMessage::new(
        user,
        "❌ Проблема!\n\n😭 Вы вышли из канала, и поэтому ваши бонусы были полностью отключены.\n\
         🤔 Если хотите их вернуть, подпишитесь заново на канал.",
    );
    if let Err(e) = state.transport.send(notice).await {
        tracing::warn!(user_id = user, error = %e, "Could not notify user about bonus removal");
    }
    Ok(())
}
