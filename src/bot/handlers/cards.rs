use super::{answer_message, MessageCtx};
use crate::bot::state::AppState;
use crate::bot::texts;
use crate::cards::card_title;
use crate::errors::HomyakResult;
use chrono::Utc;

/// "хомяк": the timed card draw
pub async fn draw(state: &AppState, ctx: &MessageCtx<'_>) -> HomyakResult<()> {
    match state.cards.draw(ctx.from.id, Utc::now(), state.rng.as_ref()).await {
        Ok(outcome) => {
            ctx.reply(state, texts::draw_result(&outcome), None).await?;
            Ok(())
        }
        Err(e) => answer_message(state, ctx, e).await,
    }
}

pub async fn my_cards(state: &AppState, ctx: &MessageCtx<'_>) -> HomyakResult<()> {
    let mut cards = state.cards.user_cards(ctx.from.id)?;
    if cards.is_empty() {
        ctx.reply(state, "🐹 У вас пока нет хомяков. Напишите «хомяк»!", None)
            .await?;
        return Ok(());
    }
    cards.sort_by(|(a, ra), (b, rb)| rb.tier().cmp(&ra.tier()).then_with(|| a.filename.cmp(&b.filename)));
    let mut lines = vec![format!("🃏 Ваши хомяки ({}):", cards.len()), String::new()];
    for (card, rarity) in &cards {
        let copies = if card.copies > 1 { format!(" ×{}", card.copies) } else { String::new() };
        lines.push(format!("• {} [{}]{}", card_title(&card.filename), rarity.name(), copies));
    }
    ctx.reply(state, lines.join("\n"), None).await?;
    Ok(())
}

/// `/fav <card>`: the name may omit the file extension
pub async fn favorite(state: &AppState, ctx: &MessageCtx<'_>, query: &str) -> HomyakResult<()> {
    let query = query.trim();
    if query.is_empty() {
        let text = match state.cards.favorite(ctx.from.id)? {
            Some(fav) => format!("⭐ Любимый хомяк: {}", card_title(&fav)),
            None => "Использование: /fav <название хомяка>".to_string(),
        };
        ctx.reply(state, text, None).await?;
        return Ok(());
    }
    let owned = state.cards.user_cards(ctx.from.id)?;
    let wanted = query.to_lowercase();
    let filename = owned
        .iter()
        .map(|(card, _)| card.filename.as_str())
        .find(|f| *f == query || card_title(f).to_lowercase() == wanted)
        .unwrap_or(query)
        .to_string();
    match state.cards.set_favorite(ctx.from.id, &filename).await {
        Ok(()) => {
            ctx.reply(state, format!("⭐ Теперь ваш любимый хомяк: {}", card_title(&filename)), None)
                .await?;
            Ok(())
        }
        Err(e) => answer_message(state, ctx, e).await,
    }
}
