//! Admin text commands. Everything here requires an admin; the registry
//! itself (`/addadmin`, `/deladmin`) is limited to owners by `AdminService`.

use super::{answer_message, MessageCtx};
use crate::bot::state::AppState;
use crate::bot::texts::number;
use crate::errors::HomyakResult;
use crate::ledger::UserId;
use crate::promo::PromoReward;
use crate::rewards::Rarity;
use chrono::Utc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    ResetStats(UserId),
    AddAdmin(UserId),
    RemoveAdmin(UserId),
    Admins,
    GrantCoins { user: UserId, delta: i64 },
    AddCard { filename: String, tier: u8 },
    SetRarity { filename: String, tier: u8 },
    RenameCard { old: String, new: String },
    DeleteCard(String),
    RarityStats,
    AddItem { filename: String, price_coins: u64, price_stars: u32, stock: u32, name: String },
    DeleteItem(u64),
    AddBundle { name: String, filenames: Vec<String>, price_coins: u64, price_stars: u32, stock: u32 },
    DeleteBundle(u64),
    AddPromo { code: String, kind: u8, value: String, uses: u32, minutes: Option<u32> },
    DeletePromo(String),
    Promos,
    GivePremium { user: UserId, days: i64 },
    RemovePremium(UserId),
    InfiniteCooldown { user: UserId, on: bool },
    ResetCooldown(Option<UserId>),
}

const USAGE: &str = "Команды администратора:\n\
/rss [id] • сбросить статистику\n\
/addadmin [id] • /deladmin [id] • /admins\n\
/coins [id] [±сумма]\n\
/addcard [файл] [1-5] • /setrarity [файл] [1-5]\n\
/rename [файл] [новый файл] • /delcard [файл] • /rarities\n\
/additem [файл] [монеты] [звёзды] [кол-во, 0 = ∞] [название]\n\
/delitem [id]\n\
/addbundle [монеты] [звёзды] [кол-во] [название] | [файл, файл, ...]\n\
/delbundle [id]\n\
/addpromo [код] [тип 1-5] [значение] [активаций] [минуты]\n\
/delpromo [код] • /promos\n\
/givepremium [id] [дни] • /delpremium [id]\n\
/infcd [id] on|off • /resetcd [id|all]";

impl AdminCommand {
    /// `None` when the text isn't an admin command at all,
    /// `Some(Err(usage))` when it is but the arguments are wrong
    pub fn parse(text: &str) -> Option<Result<Self, &'static str>> {
        let text = text.trim();
        let (head, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        let command = head.strip_prefix('/')?.split('@').next()?;
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let user = |i: usize| args.get(i).and_then(|s| s.parse::<UserId>().ok());
        let int = |i: usize| args.get(i).and_then(|s| s.parse::<u64>().ok());
        let small = |i: usize| args.get(i).and_then(|s| s.parse::<u32>().ok());
        let word = |i: usize| args.get(i).map(|s| s.to_string());

        let parsed = match command {
            "rss" => user(0).map(AdminCommand::ResetStats),
            "addadmin" => user(0).map(AdminCommand::AddAdmin),
            "deladmin" => user(0).map(AdminCommand::RemoveAdmin),
            "admins" => Some(AdminCommand::Admins),
            "coins" => match (user(0), args.get(1).and_then(|s| s.parse::<i64>().ok())) {
                (Some(user), Some(delta)) => Some(AdminCommand::GrantCoins { user, delta }),
                _ => None,
            },
            "addcard" | "setrarity" => match (word(0), args.get(1).and_then(|s| s.parse::<u8>().ok())) {
                (Some(filename), Some(tier)) if command == "addcard" => Some(AdminCommand::AddCard { filename, tier }),
                (Some(filename), Some(tier)) => Some(AdminCommand::SetRarity { filename, tier }),
                _ => None,
            },
            "rename" => match (word(0), word(1)) {
                (Some(old), Some(new)) => Some(AdminCommand::RenameCard { old, new }),
                _ => None,
            },
            "delcard" => word(0).map(AdminCommand::DeleteCard),
            "rarities" => Some(AdminCommand::RarityStats),
            "additem" => match (word(0), int(1), small(2), small(3)) {
                (Some(filename), Some(price_coins), Some(price_stars), Some(stock)) if args.len() > 4 => {
                    Some(AdminCommand::AddItem { filename, price_coins, price_stars, stock, name: args[4..].join(" ") })
                }
                _ => None,
            },
            "delitem" => int(0).map(AdminCommand::DeleteItem),
            "addbundle" => parse_bundle(rest),
            "delbundle" => int(0).map(AdminCommand::DeleteBundle),
            "addpromo" => match (word(0), args.get(1).and_then(|s| s.parse::<u8>().ok()), word(2), small(3)) {
                (Some(code), Some(kind), Some(value), Some(uses)) => {
                    Some(AdminCommand::AddPromo { code, kind, value, uses, minutes: small(4) })
                }
                _ => None,
            },
            "delpromo" => word(0).map(AdminCommand::DeletePromo),
            "promos" => Some(AdminCommand::Promos),
            "givepremium" => match (user(0), args.get(1).and_then(|s| s.parse::<i64>().ok())) {
                (Some(user), Some(days)) if days > 0 => Some(AdminCommand::GivePremium { user, days }),
                _ => None,
            },
            "delpremium" => user(0).map(AdminCommand::RemovePremium),
            "infcd" => match (user(0), args.get(1).copied()) {
                (Some(user), Some("on")) => Some(AdminCommand::InfiniteCooldown { user, on: true }),
                (Some(user), Some("off")) => Some(AdminCommand::InfiniteCooldown { user, on: false }),
                _ => None,
            },
            "resetcd" => match args.first().copied() {
                Some("all") => Some(AdminCommand::ResetCooldown(None)),
                _ => user(0).map(|u| AdminCommand::ResetCooldown(Some(u))),
            },
            _ => return None,
        };
        Some(parsed.ok_or(USAGE))
    }
}

/// `100 20 0 Name words | a.png, b.png`
fn parse_bundle(rest: &str) -> Option<AdminCommand> {
    let (head, files) = rest.split_once('|')?;
    let mut words = head.split_whitespace();
    let price_coins = words.next()?.parse().ok()?;
    let price_stars = words.next()?.parse().ok()?;
    let stock = words.next()?.parse().ok()?;
    let name = words.collect::<Vec<_>>().join(" ");
    let filenames: Vec<String> = files
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    if name.is_empty() || filenames.is_empty() {
        return None;
    }
    Some(AdminCommand::AddBundle { name, filenames, price_coins, price_stars, stock })
}

fn tier(value: u8) -> HomyakResult<Rarity> {
    Rarity::new(value).ok_or_else(|| crate::errors::CardError::InvalidRarity(value).into())
}

pub async fn handle(state: &AppState, ctx: &MessageCtx<'_>, command: Result<AdminCommand, &'static str>) -> HomyakResult<()> {
    let by = ctx.from.id;
    if let Err(e) = state.admin.require_admin(by) {
        return answer_message(state, ctx, e).await;
    }
    let command = match command {
        Ok(command) => command,
        Err(usage) => {
            ctx.reply(state, usage, None).await?;
            return Ok(());
        }
    };
    tracing::info!(admin_id = by, command = ?command, "Admin command");
    match execute(state, by, command).await {
        Ok(text) => {
            ctx.reply(state, text, None).await?;
            Ok(())
        }
        Err(e) => answer_message(state, ctx, e).await,
    }
}

async fn execute(state: &AppState, by: UserId, command: AdminCommand) -> HomyakResult<String> {
    let now = Utc::now();
    Ok(match command {
        AdminCommand::ResetStats(user) => {
            let summary = state.admin.reset_user(user).await?;
            format!(
                "✅ Статистика пользователя {} полностью сброшена!\nКарточек удалено: {}, очков: {}",
                user,
                summary.cards,
                number(summary.score)
            )
        }
        AdminCommand::AddAdmin(user) => {
            state.admin.add_admin(by, user, now).await?;
            format!("✅ {} теперь администратор", user)
        }
        AdminCommand::RemoveAdmin(user) => {
            state.admin.remove_admin(by, user).await?;
            format!("✅ {} больше не администратор", user)
        }
        AdminCommand::Admins => {
            let ids: Vec<String> = state.admin.admins()?.iter().map(|id| id.to_string()).collect();
            format!("👮 Администраторы:\n{}", ids.join("\n"))
        }
        AdminCommand::GrantCoins { user, delta } => {
            let balance = state.admin.grant_coins(user, delta).await?;
            format!("✅ Баланс {} теперь {}", user, number(balance))
        }
        AdminCommand::AddCard { filename, tier: t } => {
            state.cards.add_card(&filename, tier(t)?).await?;
            format!("✅ Хомяк {} добавлен с редкостью {}", filename, t)
        }
        AdminCommand::SetRarity { filename, tier: t } => {
            state.cards.set_rarity(&filename, tier(t)?).await?;
            format!("✅ Редкость {} изменена на {}", filename, t)
        }
        AdminCommand::RenameCard { old, new } => {
            let moved = state.cards.rename(&old, &new).await?;
            format!("✅ {} переименован в {} (у {} игроков)", old, new, moved)
        }
        AdminCommand::DeleteCard(filename) => {
            let removed = state.cards.delete(&filename).await?;
            format!("✅ {} удалён (у {} игроков)", filename, removed)
        }
        AdminCommand::RarityStats => {
            let stats = state.cards.rarity_stats()?;
            let mut lines = vec!["📊 Хомяки по редкости:".to_string()];
            for (t, count) in stats {
                let name = Rarity::new(t).map(|r| r.name()).unwrap_or("?");
                lines.push(format!("{} ({}): {}", name, t, count));
            }
            lines.join("\n")
        }
        AdminCommand::AddItem { filename, price_coins, price_stars, stock, name } => {
            let item = state.shop.add_item(&filename, &name, price_coins, price_stars, stock).await?;
            format!("✅ Товар #{} «{}» добавлен, в наличии: {}", item.id, item.name, item.stock)
        }
        AdminCommand::DeleteItem(id) => {
            state.shop.delete_item(id).await?;
            format!("✅ Товар #{} удалён", id)
        }
        AdminCommand::AddBundle { name, filenames, price_coins, price_stars, stock } => {
            let bundle = state.shop.create_bundle(&name, filenames, price_coins, price_stars, stock).await?;
            format!("✅ Набор #{} «{}» создан ({} хомяков)", bundle.id, bundle.name, bundle.filenames.len())
        }
        AdminCommand::DeleteBundle(id) => {
            state.shop.delete_bundle(id).await?;
            format!("✅ Набор #{} удалён", id)
        }
        AdminCommand::AddPromo { code, kind, value, uses, minutes } => {
            let reward = PromoReward::from_parts(kind, &value, minutes)?;
            let promo = state.promo.create(&code, by, reward, uses, now).await?;
            format!("✅ Промокод {} создан: {}, активаций: {}", promo.code, promo.reward, promo.max_uses)
        }
        AdminCommand::DeletePromo(code) => {
            state.promo.delete(&code).await?;
            format!("✅ Промокод {} удалён", code)
        }
        AdminCommand::Promos => {
            let promos = state.promo.list()?;
            if promos.is_empty() {
                "Промокодов нет".to_string()
            } else {
                promos
                    .iter()
                    .map(|p| format!("{} • {} • {}/{}", p.code, p.reward, p.used_count, p.max_uses))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        AdminCommand::GivePremium { user, days } => {
            let record = state.premium.grant_days(user, days, now).await?;
            let until = record.expires_at.map(|at| at.format("%d.%m.%Y").to_string()).unwrap_or_else(|| "навсегда".to_string());
            format!("✅ Premium для {} до {}", user, until)
        }
        AdminCommand::RemovePremium(user) => {
            state.premium.remove(user).await?;
            format!("✅ Premium у {} снят", user)
        }
        AdminCommand::InfiniteCooldown { user, on } => {
            state.cooldowns.set_infinite(user, on).await?;
            format!("✅ Бесконечные хомяки для {}: {}", user, if on { "вкл" } else { "выкл" })
        }
        AdminCommand::ResetCooldown(Some(user)) => {
            state.cooldowns.reset(user).await?;
            format!("✅ КД пользователя {} сброшен", user)
        }
        AdminCommand::ResetCooldown(None) => {
            let cleared = state.cooldowns.reset_all().await?;
            format!("✅ КД сброшен у {} пользователей", cleared)
        }
    })
}
