//! Casino: menu, typed bets, choices, dice rolls and the mines board.

use super::{answer_callback, answer_message, audit, CallbackCtx, MessageCtx};
use crate::audit::AuditEvent;
use crate::bot::callback::CallbackData;
use crate::bot::keyboards;
use crate::bot::state::AppState;
use crate::bot::texts;
use crate::casino::mines::Cell;
use crate::casino::{CasinoRound, Choice, GameKind, MinesBoard, MinesStep, RoundState};
use crate::errors::{CasinoError, HomyakError, HomyakResult};

async fn audit_round(state: &AppState, round: CasinoRound, board: Option<&MinesBoard>) {
    let board = board.map(texts::render_board);
    audit(state, AuditEvent::CasinoRound { round, board }).await;
}

/// `/casino`: drop whatever round was in progress and show the game list
pub async fn menu(state: &AppState, ctx: &MessageCtx<'_>) -> HomyakResult<()> {
    let user = ctx.from.id;
    if !ctx.kind.is_group() {
        return answer_message(state, ctx, CasinoError::PrivateChat.into()).await;
    }
    if let Some(closed) = state.casino.abandon(ctx.chat, user).await? {
        audit_round(state, closed.round, Some(&closed.board)).await;
    }
    let balance = state.ledger.get_balance(user)?;
    let sent = ctx
        .reply(state, texts::casino_welcome(balance), Some(keyboards::casino_menu()))
        .await?;
    state.casino.ownership().bind(ctx.chat, sent, user);
    Ok(())
}

/// Whether a plain message should be read as a bet
pub fn awaits_bet(state: &AppState, ctx: &MessageCtx<'_>) -> bool {
    matches!(state.casino.state(ctx.chat, ctx.from.id), Some(RoundState::AwaitingBet { .. }))
}

pub async fn bet(state: &AppState, ctx: &MessageCtx<'_>, text: &str) -> HomyakResult<()> {
    let user = ctx.from.id;
    let accepted = match state.casino.submit_bet(ctx.chat, user, text) {
        Ok(accepted) => accepted,
        Err(e) => return answer_message(state, ctx, e).await,
    };
    let sent = if accepted.game == GameKind::Mines {
        ctx.reply(state, texts::bombs_prompt(accepted.bet), Some(keyboards::bomb_counts()))
            .await?
    } else {
        ctx.reply(state, texts::choice_prompt(&accepted), Some(keyboards::choices(accepted.game)))
            .await?
    };
    state.casino.ownership().bind(ctx.chat, sent, user);
    Ok(())
}

pub async fn callback(state: &AppState, ctx: &CallbackCtx<'_>, data: CallbackData) -> HomyakResult<()> {
    if let Err(denied) = state.casino.ownership().check(ctx.chat, ctx.message_id, ctx.from.id) {
        return ctx.alert(state, texts::access_denied(&denied)).await;
    }
    match dispatch(state, ctx, data).await {
        Ok(()) => Ok(()),
        Err(e) => answer_callback(state, ctx, e).await,
    }
}

async fn dispatch(state: &AppState, ctx: &CallbackCtx<'_>, data: CallbackData) -> HomyakResult<()> {
    let user = ctx.from.id;
    match data {
        CallbackData::CasinoMenu | CallbackData::CasinoBack => {
            if let Some(closed) = state.casino.abandon(ctx.chat, user).await? {
                audit_round(state, closed.round, Some(&closed.board)).await;
            }
            let balance = state.ledger.get_balance(user)?;
            ctx.edit(state, texts::casino_welcome(balance), Some(keyboards::casino_menu()))
                .await?;
            ctx.ack(state).await
        }
        CallbackData::OpenGame(game) => {
            let balance = match state.casino.open_game(ctx.chat, user, game, ctx.kind.is_group()) {
                Ok(balance) => balance,
                Err(HomyakError::Casino(CasinoError::Debounced)) => {
                    return ctx.toast(state, "⏳ Подождите пару секунд").await;
                }
                Err(e) => return Err(e),
            };
            ctx.edit(state, texts::bet_prompt(game, balance), Some(keyboards::bet_prompt()))
                .await?;
            ctx.ack(state).await
        }
        CallbackData::Pick(choice) => play(state, ctx, choice).await,
        CallbackData::Bombs(bombs) => {
            let board = state.casino.start_mines(ctx.chat, user, bombs).await?;
            ctx.edit(state, texts::mines_status(&board), Some(keyboards::mines_board(&board)))
                .await?;
            ctx.ack(state).await
        }
        CallbackData::Reveal { row, col } => {
            let cell = Cell::new(row, col)?;
            match state.casino.reveal(ctx.chat, user, cell).await {
                Ok(MinesStep::Safe { board, .. }) => {
                    ctx.edit(state, texts::mines_status(&board), Some(keyboards::mines_board(&board)))
                        .await?;
                }
                Ok(MinesStep::Exploded { round, board }) => {
                    ctx.edit(
                        state,
                        texts::mines_exploded(&board, round.balance_after),
                        Some(keyboards::play_again(GameKind::Mines)),
                    )
                    .await?;
                    audit_round(state, round, Some(&board)).await;
                }
                Err(HomyakError::Casino(CasinoError::CellAlreadyRevealed)) => {
                    return ctx.toast(state, "Эта клетка уже открыта").await;
                }
                Err(e) => return Err(e),
            }
            ctx.ack(state).await
        }
        CallbackData::Cashout => {
            let closed = state.casino.cashout(ctx.chat, user).await?;
            ctx.edit(
                state,
                texts::mines_cashed(&closed.board, closed.round.payout, closed.round.balance_after),
                Some(keyboards::play_again(GameKind::Mines)),
            )
            .await?;
            audit_round(state, closed.round, Some(&closed.board)).await;
            ctx.ack(state).await
        }
        _ => Ok(()),
    }
}

/// Lock the choice, get the draw, settle, then show the result
async fn play(state: &AppState, ctx: &CallbackCtx<'_>, choice: Choice) -> HomyakResult<()> {
    let pending = state.casino.take_choice(ctx.chat, ctx.from.id, choice)?;

    let draw = match pending.game.dice_emoji() {
        Some(emoji) => {
            let (_, value) = state
                .transport
                .roll_dice(ctx.chat, emoji, Some(ctx.message_id))
                .await?;
            value
        }
        None => state.casino.local_draw(pending.game),
    };

    let settled = state.casino.settle(pending, draw).await?;
    ctx.edit(state, texts::round_result(&settled), Some(keyboards::play_again(pending.game)))
        .await?;
    audit_round(state, settled.round, None).await;
    ctx.ack(state).await
}

const HISTORY_SIZE: usize = 10;

/// `/history`: the player's latest rounds
pub async fn history(state: &AppState, ctx: &MessageCtx<'_>) -> HomyakResult<()> {
    let rounds = state.casino.history(ctx.from.id, HISTORY_SIZE)?;
    if rounds.is_empty() {
        ctx.reply(state, "🎰 Вы ещё не играли в казино", None).await?;
        return Ok(());
    }
    let mut lines = vec!["🎰 Последние игры:".to_string(), String::new()];
    for round in &rounds {
        let net = match round.outcome {
            None => "в процессе".to_string(),
            Some(_) if round.net() >= 0 => format!("+{}", round.net()),
            Some(_) => round.net().to_string(),
        };
        lines.push(format!(
            "{} {} • ставка {} • {}",
            round.created_at.format("%d.%m %H:%M"),
            round.game.title(),
            texts::number(round.stake),
            net
        ));
    }
    ctx.reply(state, lines.join("\n"), None).await?;
    Ok(())
}
