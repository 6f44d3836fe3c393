//! Operator-facing audit trail: casino rounds, purchases, promo use, bonus
//! changes and internal failures.

use crate::bot::transport::Transport;
use crate::casino::{CasinoRound, RoundOutcome};
use crate::config::BotConfig;
use crate::errors::HomyakResult;
use crate::ledger::{ChatId, UserId};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    CasinoRound {
        round: CasinoRound,
        /// Final mines board, one string per row
        board: Option<Vec<String>>,
    },
    Purchase {
        user: UserId,
        item: String,
        price: String,
        charge_id: Option<String>,
    },
    PromoUsed {
        user: UserId,
        code: String,
        reward: String,
        remaining: u32,
    },
    BonusChanged {
        user: UserId,
        active: bool,
        premium: bool,
    },
    Refund {
        user: UserId,
        reason: String,
        charge_id: String,
    },
    InternalError {
        context: String,
        error: String,
    },
}

impl AuditEvent {
    fn topic(&self) -> Topic {
        match self {
            AuditEvent::CasinoRound { .. } => Topic::Casino,
            AuditEvent::InternalError { .. } => Topic::Errors,
            _ => Topic::Events,
        }
    }

    pub fn render(&self) -> String {
        match self {
            AuditEvent::CasinoRound { round, board } => {
                let verdict = match round.outcome {
                    Some(RoundOutcome::Win) => "выигрыш",
                    Some(RoundOutcome::Loss) => "проигрыш",
                    Some(RoundOutcome::Push) => "ничья",
                    None => "открыт",
                };
                let mut text = format!(
                    "🎰 {} • ID {}\nСтавка: {} • Выплата: {} ({})\nИтог: {} • Баланс: {} → {}\nРаунд: {}",
                    round.game.title(),
                    round.user,
                    round.stake,
                    round.payout,
                    round.multiplier,
                    verdict,
                    round.balance_before,
                    round.balance_after,
                    round.round_id,
                );
                if let Some(draw) = round.draw {
                    text.push_str(&format!("\nВыпало: {}", draw));
                }
                if let Some(detail) = &round.detail {
                    text.push_str(&format!("\n{}", detail));
                }
                if let Some(rows) = board {
                    text.push('\n');
                    text.push_str(&rows.join("\n"));
                }
                text
            }
            AuditEvent::Purchase { user, item, price, charge_id } => {
                let mut text = format!("🛒 Покупка\nПокупатель: ID {}\nТовар: {}\nЦена: {}", user, item, price);
                if let Some(id) = charge_id {
                    text.push_str(&format!("\nID операции: {}", id));
                }
                text
            }
            AuditEvent::PromoUsed { user, code, reward, remaining } => format!(
                "🎟 Промокод {}\nПользователь: ID {}\nНаграда: {}\nОсталось активаций: {}",
                code, user, reward, remaining
            ),
            AuditEvent::BonusChanged { user, active, premium } => {
                if *active {
                    let kind = if *premium { "Premium" } else { "Обычный" };
                    format!("🎁 Бонус активирован\nПользователь: ID {}\nТип бонуса: {}", user, kind)
                } else {
                    format!("🎁 Бонус снят\nПользователь: ID {} отписался от канала", user)
                }
            }
            AuditEvent::Refund { user, reason, charge_id } => {
                format!("↩️ Возврат звёзд\nПользователь: ID {}\nПричина: {}\nID операции: {}", user, reason, charge_id)
            }
            AuditEvent::InternalError { context, error } => format!("⚠️ Ошибка в {}\n{}", context, error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Casino,
    Events,
    Errors,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> HomyakResult<()>;
}

/// Writes events to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAudit;

#[async_trait]
impl AuditSink for TracingAudit {
    async fn record(&self, event: AuditEvent) -> HomyakResult<()> {
        match &event {
            AuditEvent::InternalError { context, error } => {
                tracing::error!(context = %context, error = %error, "Internal error");
            }
            other => tracing::info!(event = ?other.topic(), "{}", other.render()),
        }
        Ok(())
    }
}

/// Logs locally and posts each event into the operator chat
pub struct TransportAudit {
    transport: Arc<dyn Transport>,
    chat: ChatId,
    casino_thread: Option<i32>,
    events_thread: Option<i32>,
}

impl TransportAudit {
    pub fn new(transport: Arc<dyn Transport>, config: &BotConfig) -> Self {
        Self {
            transport,
            chat: config.admin_chat_id,
            casino_thread: config.casino_log_thread_id,
            events_thread: config.events_thread_id,
        }
    }
}

#[async_trait]
impl AuditSink for TransportAudit {
    async fn record(&self, event: AuditEvent) -> HomyakResult<()> {
        TracingAudit.record(event.clone()).await?;
        if self.chat == 0 {
            return Ok(());
        }
        let thread = match event.topic() {
            Topic::Casino => self.casino_thread,
            Topic::Events => self.events_thread,
            Topic::Errors => None,
        };
        self.transport.notify_operator(self.chat, thread, &event.render()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_bonus_and_promo() {
        let event = AuditEvent::BonusChanged { user: 3, active: true, premium: true };
        assert!(event.render().contains("Premium"));
        let event = AuditEvent::PromoUsed { user: 3, code: "GIFT".into(), reward: "40 монет".into(), remaining: 0 };
        assert!(event.render().contains("GIFT"));
        assert_eq!(event.topic(), Topic::Events);
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_everything() {
        let sink = TracingAudit;
        sink.record(AuditEvent::InternalError { context: "draw".into(), error: "disk".into() })
            .await
            .unwrap();
    }
}
