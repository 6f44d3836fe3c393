//! Shop, promo codes, star payments, bonus and admin commands through the router

mod common;

use common::{Harness, GROUP};
use homyak::bot::{Inbound, Sender};
use homyak::premium::PremiumPlan;
use homyak::rewards::{points_for, Rarity};
use homyak::shop::PaymentPayload;

const OWNER: i64 = 1;
const CHANNEL: i64 = -200;

async fn pay(h: &Harness, user: i64, payload: PaymentPayload, charge: &str) {
    h.bot
        .handle(Inbound::Payment {
            chat: user,
            from: Sender::new(user, "Buyer"),
            payload: payload.encode(),
            charge_id: charge.to_string(),
            total: 10,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_admin_commands_need_an_admin() {
    let h = Harness::new();
    h.say(GROUP, 5, "/coins 7 50").await;
    assert!(h.last_text().contains("только администраторам"));
    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 0);

    h.say(GROUP, OWNER, "/coins 7 50").await;
    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 50);

    h.say(GROUP, OWNER, "/addadmin 5").await;
    h.say(GROUP, 5, "/coins 7 -20").await;
    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 30);

    // Only owners manage the admin list
    h.say(GROUP, 5, "/addadmin 6").await;
    assert!(!h.state().admin.is_admin(6).unwrap());

    h.say(GROUP, OWNER, "/rss").await;
    assert!(h.last_text().contains("Команды администратора"));
}

#[tokio::test]
async fn test_promo_codes_are_single_use_per_user() {
    let h = Harness::new();
    h.say(GROUP, OWNER, "/addpromo GIFT 5 40 2").await;
    assert!(h.last_text().contains("GIFT"));

    h.say(GROUP, 7, "промо gift").await;
    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 40);
    assert!(h.transport.operator_messages().iter().any(|m| m.contains("GIFT")));

    h.say(GROUP, 7, "/promo GIFT").await;
    assert!(h.last_text().contains("уже активировали"));
    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 40);

    h.say(GROUP, 8, "/promo GIFT").await;
    assert_eq!(h.state().ledger.get_balance(8).unwrap(), 40);

    h.say(GROUP, 9, "/promo GIFT").await;
    assert!(h.last_text().contains("исчерпан"));
    assert_eq!(h.state().ledger.get_balance(9).unwrap(), 0);

    h.say(GROUP, 9, "/promo NOPE").await;
    assert!(h.last_text().contains("недействителен"));
}

#[tokio::test]
async fn test_last_item_in_stock_sells_once() {
    let h = Harness::new();
    h.say(GROUP, OWNER, "/addcard pilot.png 2").await;
    h.say(GROUP, OWNER, "/additem pilot.png 30 10 1 Хомяк пилот").await;
    h.state().ledger.add_balance(7, 100).await.unwrap();
    h.state().ledger.add_balance(8, 100).await.unwrap();

    h.say(GROUP, 7, "/shop").await;
    let shop = h.last_message_id();
    h.tap(GROUP, 7, shop, "shop:buy:1:coins").await;
    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 70);
    assert!(h.state().shop.has_bought(7, 1).unwrap());
    assert!(h.last_text().contains("Вы купили"));

    h.tap(GROUP, 8, shop, "shop:buy:1:coins").await;
    let answer = h.transport.last_answer().unwrap();
    assert!(answer.alert);
    assert!(answer.text.contains("закончился"));
    assert_eq!(h.state().ledger.get_balance(8).unwrap(), 100);

    // Stars: refused at checkout, refunded if paid anyway
    h.bot
        .handle(Inbound::PreCheckout {
            id: "q1".to_string(),
            from: Sender::new(8, "Buyer"),
            payload: PaymentPayload::Card(1).encode(),
        })
        .await
        .unwrap();
    let (_, ok, _) = h.transport.pre_checkouts().pop().unwrap();
    assert!(!ok);

    pay(&h, 8, PaymentPayload::Card(1), "charge-1").await;
    assert_eq!(h.transport.refunds(), vec![(8, "charge-1".to_string())]);
    assert!(h.last_text().contains("Звёзды возвращены"));
    assert!(!h.state().shop.has_bought(8, 1).unwrap());
}

#[tokio::test]
async fn test_unlimited_bundle_and_star_top_up() {
    let h = Harness::new();
    h.say(GROUP, OWNER, "/addcard a.png 1").await;
    h.say(GROUP, OWNER, "/addcard b.png 3").await;
    h.say(GROUP, OWNER, "/addbundle 50 5 0 Дуэт | a.png, b.png").await;
    assert!(h.last_text().contains("Дуэт"));

    for user in [7, 8] {
        h.state().ledger.add_balance(user, 60).await.unwrap();
        h.say(GROUP, user, "/shop").await;
        let shop = h.last_message_id();
        h.tap(GROUP, user, shop, "shop:bbuy:1:coins").await;
        assert_eq!(h.state().ledger.get_balance(user).unwrap(), 10);
        assert_eq!(h.state().cards.user_cards(user).unwrap().len(), 2);
    }

    pay(&h, 7, PaymentPayload::TopUp(500), "charge-2").await;
    assert_eq!(h.state().ledger.get_balance(7).unwrap(), 510);
    assert!(h.transport.refunds().is_empty());
}

#[tokio::test]
async fn test_premium_paid_for_someone_else_is_refunded() {
    let h = Harness::new();
    pay(&h, 7, PaymentPayload::Premium { plan: PremiumPlan::OneMonth, buyer: 8 }, "charge-3").await;
    assert_eq!(h.transport.refunds(), vec![(7, "charge-3".to_string())]);
    assert!(!h.state().premium.status(7).unwrap().lifetime);

    pay(&h, 7, PaymentPayload::Premium { plan: PremiumPlan::OneMonth, buyer: 7 }, "charge-4").await;
    assert!(h.state().premium.is_active(7, chrono::Utc::now()).unwrap());
    assert_eq!(h.transport.refunds().len(), 1);
}

#[tokio::test]
async fn test_channel_bonus_lifecycle() {
    let h = Harness::new();
    h.say(GROUP, 7, "/bonus").await;
    let message = h.last_message_id();

    h.tap(GROUP, 7, message, "bonus:check").await;
    assert!(h.transport.last_answer().unwrap().text.contains("не подписаны"));
    assert!(!h.state().bonus.status(7).unwrap().active);

    h.transport.join_channel(CHANNEL, 7);
    h.tap(GROUP, 7, message, "bonus:check").await;
    assert!(h.state().bonus.status(7).unwrap().active);
    assert!(h.last_text().contains("Бонусы активированы"));

    h.transport.leave_channel(CHANNEL, 7);
    h.bot.handle(Inbound::MemberLeft { chat: CHANNEL, user: 7 }).await.unwrap();
    assert!(!h.state().bonus.status(7).unwrap().active);
    let (_, notice) = h.transport.last_sent().unwrap();
    assert_eq!(notice.chat, 7);
    assert!(notice.text.contains("бонусы были полностью отключены"));

    // Leaving some other chat changes nothing
    h.bot.handle(Inbound::MemberLeft { chat: GROUP, user: 8 }).await.unwrap();
}

#[tokio::test]
async fn test_draw_then_cooldown() {
    let h = Harness::new();
    h.say(GROUP, 7, "хомяк").await;
    assert!(h.last_text().contains("не завезли"));

    h.say(GROUP, OWNER, "/addcard sleepy.png 1").await;
    h.say(GROUP, 7, "Хомяк").await;
    assert!(h.last_text().contains("sleepy"));
    let expected = points_for(Rarity::COMMON, false, false, false);
    assert_eq!(h.state().ledger.get_score(7).unwrap().total, expected);

    h.say(GROUP, 7, "/homyak").await;
    assert!(h.last_text().contains("Следующий хомяк через"));
    assert_eq!(h.state().ledger.get_score(7).unwrap().total, expected);

    h.say(GROUP, OWNER, "/resetcd 7").await;
    h.say(GROUP, 7, "хомяк").await;
    assert!(h.last_text().contains("Повторка"));
    assert_eq!(h.state().ledger.get_score(7).unwrap().total, expected * 2);
}

#[tokio::test]
async fn test_leaderboard_skips_users_who_left_the_chat() {
    let h = Harness::new();
    h.state().ledger.add_balance(7, 500).await.unwrap();
    h.state().ledger.add_balance(8, 300).await.unwrap();
    h.say(GROUP, 7, "/profile").await;
    h.say(GROUP, 8, "/profile").await;
    h.transport.mark_absent(GROUP, 7);

    h.say(GROUP, 8, "топ").await;
    let menu = h.last_message_id();
    h.tap(GROUP, 8, menu, "top:coins").await;

    let text = h.last_text();
    assert!(text.contains("Player8"));
    assert!(!text.contains("Player7"));
}
