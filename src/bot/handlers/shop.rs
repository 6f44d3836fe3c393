//! Shop screens, coin purchases, star invoices and payment fulfilment.

use super::{answer_callback, audit, report, CallbackCtx, MessageCtx};
use crate::audit::AuditEvent;
use crate::bot::callback::{CallbackData, PayWith};
use crate::bot::inbound::Sender;
use crate::bot::keyboards;
use crate::bot::state::AppState;
use crate::bot::texts::{self, number};
use crate::bot::transport::{Invoice, OutgoingMessage};
use crate::cards::card_title;
use crate::errors::{HomyakError, HomyakResult, ShopError};
use crate::ledger::{BoosterKind, ChatId};
use crate::premium::PremiumPlan;
use crate::shop::{booster_price_stars, pack_stars, Fulfilment, PaymentPayload};
use chrono::Utc;

const SHOP_TITLE: &str = "🛒 Магазин Хомяка\n\nВыберите раздел:";

fn booster_name(kind: BoosterKind) -> &'static str {
    match kind {
        BoosterKind::Luck => "🍀 Бустер удачи",
        BoosterKind::Time => "⏳ Бустер времени",
    }
}

pub fn premium_text() -> String {
    let mut lines = vec![
        "👑 Premium".to_string(),
        String::new(),
        "• Хомяк каждые 5 часов вместо 7".to_string(),
        "• +1000 очков за каждого хомяка".to_string(),
        "• Повышенный шанс на редких хомяков".to_string(),
        String::new(),
    ];
    for plan in PremiumPlan::ALL {
        lines.push(format!("{} • {} ⭐", plan.title(), plan.stars()));
    }
    lines.join("\n")
}

pub async fn open(state: &AppState, ctx: &MessageCtx<'_>) -> HomyakResult<()> {
    ctx.reply(state, SHOP_TITLE, Some(keyboards::shop_main())).await?;
    Ok(())
}

pub async fn premium(state: &AppState, ctx: &MessageCtx<'_>) -> HomyakResult<()> {
    ctx.reply(state, premium_text(), Some(keyboards::premium_plans())).await?;
    Ok(())
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
        CallbackData::ShopMain => ctx.edit(state, SHOP_TITLE, Some(keyboards::shop_main())).await?,
        CallbackData::ShopCards => {
            let items = state.shop.items()?;
            let text = if items.is_empty() { "🐹 Хомяков в продаже пока нет." } else { "🐹 Хомяки в продаже:" };
            ctx.edit(state, text, Some(keyboards::shop_items(&items))).await?;
        }
        CallbackData::ShopItem(id) => {
            let item = state.shop.item(id)?;
            let points = state.shop.quote_card(user, id, now)?;
            let rarity = state.cards.rarity_of(&item.filename)?;
            let bought = if state.shop.has_bought(user, id)? { "\n\n✅ Уже куплен" } else { "" };
            let text = format!(
                "🐹 {}\n💎 Редкость • {}\n✨ Очки • +{}\n📦 Осталось: {}\n\n💰 {} монет или ⭐ {}{}",
                item.name,
                rarity.name(),
                number(points),
                item.stock,
                number(item.price_coins),
                item.price_stars,
                bought
            );
            ctx.edit(state, text, Some(keyboards::shop_item(&item))).await?;
        }
        CallbackData::BuyItem(id, PayWith::Coins) => {
            let purchase = state.shop.buy_card_with_coins(user, id, now).await?;
            ctx.edit(
                state,
                format!(
                    "✅ Вы купили хомяка «{}»!\n✨ Очки • +{} [{}]\n💰 Баланс: {}",
                    purchase.item.name,
                    number(purchase.points),
                    number(purchase.total_score),
                    number(purchase.balance)
                ),
                Some(keyboards::shop_main()),
            )
            .await?;
            audit(
                state,
                AuditEvent::Purchase {
                    user,
                    item: purchase.item.name.clone(),
                    price: format!("{} монет", purchase.item.price_coins),
                    charge_id: None,
                },
            )
            .await;
        }
        CallbackData::BuyItem(id, PayWith::Stars) => {
            let item = state.shop.item(id)?;
            if state.shop.has_bought(user, id)? {
                return Err(ShopError::AlreadyOwned.into());
            }
            if item.stock.is_sold_out() {
                return Err(ShopError::OutOfStock.into());
            }
            invoice(
                state,
                ctx.chat,
                Invoice {
                    title: item.name.clone(),
                    description: format!("Хомяк «{}»", card_title(&item.filename)),
                    payload: PaymentPayload::Card(id).encode(),
                    stars: item.price_stars,
                },
            )
            .await?;
        }
        CallbackData::ShopBundles => {
            let bundles = state.shop.bundles()?;
            let text = if bundles.is_empty() { "📦 Наборов пока нет." } else { "📦 Наборы хомяков:" };
            ctx.edit(state, text, Some(keyboards::bundles(&bundles))).await?;
        }
        CallbackData::ShopBundle(id) => {
            let bundle = state.shop.bundle(id)?;
            let points = state.shop.quote_bundle(user, id, now)?;
            let names: Vec<&str> = bundle.filenames.iter().map(|f| card_title(f)).collect();
            let text = format!(
                "📦 {}\n\n{}\n\n✨ Очки • +{}\n📦 Осталось: {}\n💰 {} монет или ⭐ {}",
                bundle.name,
                names.join(", "),
                number(points),
                bundle.stock,
                number(bundle.price_coins),
                bundle.price_stars
            );
            ctx.edit(state, text, Some(keyboards::bundle(&bundle))).await?;
        }
        CallbackData::BuyBundle(id, PayWith::Coins) => {
            let purchase = state.shop.buy_bundle_with_coins(user, id, now).await?;
            ctx.edit(
                state,
                format!(
                    "✅ Набор «{}» ваш!\n🐹 Хомяков: {}\n✨ Очки • +{} [{}]\n💰 Баланс: {}",
                    purchase.bundle.name,
                    purchase.bundle.filenames.len(),
                    number(purchase.points),
                    number(purchase.total_score),
                    number(purchase.balance)
                ),
                Some(keyboards::shop_main()),
            )
            .await?;
            audit(
                state,
                AuditEvent::Purchase {
                    user,
                    item: format!("набор {}", purchase.bundle.name),
                    price: format!("{} монет", purchase.bundle.price_coins),
                    charge_id: None,
                },
            )
            .await;
        }
        CallbackData::BuyBundle(id, PayWith::Stars) => {
            let bundle = state.shop.bundle(id)?;
            if bundle.stock.is_sold_out() {
                return Err(ShopError::OutOfStock.into());
            }
            invoice(
                state,
                ctx.chat,
                Invoice {
                    title: bundle.name.clone(),
                    description: format!("Набор из {} хомяков", bundle.filenames.len()),
                    payload: PaymentPayload::Bundle(id).encode(),
                    stars: bundle.price_stars,
                },
            )
            .await?;
        }
        CallbackData::ShopBoosters => {
            ctx.edit(
                state,
                "🧪 Бустеры\n\n🍀 Удача: выше шанс редкого хомяка при следующем открытии\n⏳ Время: минус час ожидания",
                Some(keyboards::boosters()),
            )
            .await?;
        }
        CallbackData::BuyBooster(kind, PayWith::Coins) => {
            let balance = state.shop.buy_booster_with_coins(user, kind, now).await?;
            ctx.edit(
                state,
                format!("✅ {} куплен!\n💰 Баланс: {}", booster_name(kind), number(balance)),
                Some(keyboards::boosters()),
            )
            .await?;
            audit(
                state,
                AuditEvent::Purchase {
                    user,
                    item: booster_name(kind).to_string(),
                    price: format!("{} монет", crate::shop::booster_price_coins(kind)),
                    charge_id: None,
                },
            )
            .await;
        }
        CallbackData::BuyBooster(kind, PayWith::Stars) => {
            invoice(
                state,
                ctx.chat,
                Invoice {
                    title: booster_name(kind).to_string(),
                    description: "Одноразовый бустер".to_string(),
                    payload: PaymentPayload::Booster(kind).encode(),
                    stars: booster_price_stars(kind),
                },
            )
            .await?;
        }
        CallbackData::ShopTopUp => {
            let balance = state.ledger.get_balance(user)?;
            ctx.edit(
                state,
                format!("💰 Пополнение монет\n\nВаш баланс: {}", number(balance)),
                Some(keyboards::coin_packs()),
            )
            .await?;
        }
        CallbackData::TopUpPack(coins) => {
            let stars = pack_stars(coins).ok_or(ShopError::UnknownPack(coins))?;
            invoice(
                state,
                ctx.chat,
                Invoice {
                    title: format!("{} монет", coins),
                    description: "Пополнение баланса".to_string(),
                    payload: PaymentPayload::TopUp(coins).encode(),
                    stars,
                },
            )
            .await?;
        }
        CallbackData::PremiumMenu => {
            ctx.edit(state, premium_text(), Some(keyboards::premium_plans())).await?;
        }
        CallbackData::BuyPremium(plan) => {
            invoice(
                state,
                ctx.chat,
                Invoice {
                    title: format!("Premium • {}", plan.title()),
                    description: "Premium-статус для Хомяка".to_string(),
                    payload: PaymentPayload::Premium { plan, buyer: user }.encode(),
                    stars: plan.stars(),
                },
            )
            .await?;
        }
        _ => return Ok(()),
    }
    ctx.ack(state).await
}

async fn invoice(state: &AppState, chat: ChatId, invoice: Invoice) -> HomyakResult<()> {
    tracing::debug!(chat_id = chat, payload = %invoice.payload, stars = invoice.stars, "Sending invoice");
    state.transport.send_invoice(chat, invoice).await
}

/// Refuse a checkout whose payload can no longer be honoured
pub async fn pre_checkout(state: &AppState, query_id: &str, from: &Sender, payload: &str) -> HomyakResult<()> {
    let verdict = match PaymentPayload::parse(payload) {
        Ok(PaymentPayload::Premium { buyer, .. }) if buyer != from.id => Err("Этот счёт выставлен другому пользователю"),
        Ok(PaymentPayload::Card(id)) => match state.shop.item(id) {
            Ok(item) if item.stock.is_sold_out() => Err("Этот товар закончился"),
            Ok(_) if state.shop.has_bought(from.id, id)? => Err("Вы уже купили этого хомяка"),
            Ok(_) => Ok(()),
            Err(_) => Err("Товар не найден"),
        },
        Ok(_) => Ok(()),
        Err(_) => Err("Неизвестный платеж"),
    };
    match verdict {
        Ok(()) => state.transport.answer_pre_checkout(query_id, true, None).await,
        Err(reason) => {
            tracing::info!(user_id = from.id, payload, reason, "Pre-checkout refused");
            state.transport.answer_pre_checkout(query_id, false, Some(reason)).await
        }
    }
}

fn fulfilment_text(fulfilment: &Fulfilment) -> (String, String) {
    match fulfilment {
        Fulfilment::Coins { coins, balance } => (
            format!("✅ Начислено {} монет!\n💰 Баланс: {}", number(*coins), number(*balance)),
            format!("{} монет", coins),
        ),
        Fulfilment::Booster(kind) => (format!("✅ {} добавлен в инвентарь!", booster_name(*kind)), booster_name(*kind).to_string()),
        Fulfilment::Card(purchase) => (
            format!(
                "✅ Вы купили хомяка «{}»!\n✨ Очки • +{} [{}]",
                purchase.item.name,
                number(purchase.points),
                number(purchase.total_score)
            ),
            purchase.item.name.clone(),
        ),
        Fulfilment::Bundle(purchase) => (
            format!(
                "✅ Набор «{}» ваш!\n✨ Очки • +{} [{}]",
                purchase.bundle.name,
                number(purchase.points),
                number(purchase.total_score)
            ),
            format!("набор {}", purchase.bundle.name),
        ),
        Fulfilment::Premium { plan, record } => {
            let until = if record.lifetime {
                "навсегда".to_string()
            } else {
                record.expires_at.map(|at| format!("до {}", at.format("%d.%m.%Y"))).unwrap_or_default()
            };
            (format!("👑 Premium активирован {}!", until), format!("Premium {}", plan.title()))
        }
    }
}

/// A confirmed star payment. Anything that can't be honoured is refunded.
pub async fn payment(state: &AppState, chat: ChatId, from: &Sender, payload: &str, charge_id: &str, total: u32) -> HomyakResult<()> {
    let result = match PaymentPayload::parse(payload) {
        Ok(parsed) => state.shop.fulfil(from.id, parsed, Utc::now()).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(fulfilment) => {
            let (text, item) = fulfilment_text(&fulfilment);
            state.transport.send(OutgoingMessage::new(chat, text)).await?;
            audit(
                state,
                AuditEvent::Purchase { user: from.id, item, price: format!("{} ⭐", total), charge_id: Some(charge_id.to_string()) },
            )
            .await;
            Ok(())
        }
        Err(e) => refund(state, chat, from, charge_id, e).await,
    }
}

async fn refund(state: &AppState, chat: ChatId, from: &Sender, charge_id: &str, error: HomyakError) -> HomyakResult<()> {
    tracing::warn!(user_id = from.id, charge_id, error = %error, "Refunding star payment");
    if !error.is_user_facing() {
        report(state, "payment", &error).await;
    }
    state.transport.refund_stars(from.id, charge_id).await?;
    let reason = match &error {
        HomyakError::Shop(ShopError::RefundRequired(reason)) => reason.clone(),
        other => other.to_string(),
    };
    audit(state, AuditEvent::Refund { user: from.id, reason, charge_id: charge_id.to_string() }).await;
    let text = match texts::user_message(&error) {
        Some(text) => format!("{}\n⭐ Звёзды возвращены.", text),
        None => "❌ Не удалось выполнить покупку, ⭐ звёзды возвращены.".to_string(),
    };
    state.transport.send(OutgoingMessage::new(chat, text)).await?;
    Ok(())
}
