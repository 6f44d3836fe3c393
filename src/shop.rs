//! Shop: single cards, bundles, boosters and coin top-ups.
//!
//! Every purchase is one ledger transaction. Star payments arrive already
//! charged, so a purchase that can no longer be honoured comes back as
//! [`ShopError::RefundRequired`] for the caller to refund.

use crate::cards::{card_title, grant_scored, points_now, rarity_of};
use crate::errors::{CardError, HomyakError, HomyakResult, ShopError};
use crate::ledger::{keys, BoosterKind, Ledger, LedgerTxn, PremiumRecord, UserId};
use crate::premium::{self, PremiumPlan};
use crate::rewards::Rarity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// (coins, stars)
pub const COIN_PACKS: [(u64, u32); 10] = [
    (50, 7),
    (100, 13),
    (200, 25),
    (300, 44),
    (400, 55),
    (500, 71),
    (800, 114),
    (1000, 142),
    (1500, 214),
    (2000, 285),
];

pub fn pack_stars(coins: u64) -> Option<u32> {
    COIN_PACKS.iter().find(|(c, _)| *c == coins).map(|(_, s)| *s)
}

pub fn booster_price_coins(kind: BoosterKind) -> u64 {
    match kind {
        BoosterKind::Luck => 100,
        BoosterKind::Time => 70,
    }
}

pub fn booster_price_stars(kind: BoosterKind) -> u32 {
    match kind {
        BoosterKind::Luck => 9,
        BoosterKind::Time => 8,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Stock {
    Unlimited,
    Limited(u32),
}

impl Stock {
    /// Admin input: 0 means unlimited
    pub fn from_count(count: u32) -> Self {
        if count == 0 {
            Stock::Unlimited
        } else {
            Stock::Limited(count)
        }
    }

    /// Take one unit; a sold out limited stock refuses
    fn take(&mut self) -> bool {
        match self {
            Stock::Unlimited => true,
            Stock::Limited(0) => false,
            Stock::Limited(n) => {
                *n -= 1;
                true
            }
        }
    }

    pub fn is_sold_out(&self) -> bool {
        *self == Stock::Limited(0)
    }
}

impl fmt::Display for Stock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stock::Unlimited => f.write_str("∞"),
            Stock::Limited(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShopItem {
    pub id: u64,
    pub filename: String,
    pub name: String,
    pub price_coins: u64,
    pub price_stars: u32,
    pub stock: Stock,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bundle {
    pub id: u64,
    pub name: String,
    pub filenames: Vec<String>,
    pub price_coins: u64,
    pub price_stars: u32,
    pub stock: Stock,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct PurchaseRecord {
    filename: String,
    at: DateTime<Utc>,
}

/// What a star invoice was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentPayload {
    TopUp(u64),
    Booster(BoosterKind),
    Card(u64),
    Bundle(u64),
    Premium { plan: PremiumPlan, buyer: UserId },
}

impl PaymentPayload {
    pub fn parse(raw: &str) -> HomyakResult<Self> {
        let bad = || HomyakError::from(ShopError::BadPayload(raw.to_string()));
        if let Some(rest) = raw.strip_prefix("premium|") {
            let (plan, buyer) = rest.split_once('|').ok_or_else(bad)?;
            return Ok(PaymentPayload::Premium {
                plan: PremiumPlan::parse(plan).map_err(|_| bad())?,
                buyer: buyer.parse().map_err(|_| bad())?,
            });
        }
        let (kind, value) = raw.split_once(':').ok_or_else(bad)?;
        match kind {
            "topup" => Ok(PaymentPayload::TopUp(value.parse().map_err(|_| bad())?)),
            "boost" => Ok(PaymentPayload::Booster(BoosterKind::parse(value).ok_or_else(bad)?)),
            "cardbuy" => Ok(PaymentPayload::Card(value.parse().map_err(|_| bad())?)),
            "bundlebuy" => Ok(PaymentPayload::Bundle(value.parse().map_err(|_| bad())?)),
            _ => Err(bad()),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            PaymentPayload::TopUp(coins) => format!("topup:{}", coins),
            PaymentPayload::Booster(kind) => format!("boost:{}", kind),
            PaymentPayload::Card(id) => format!("cardbuy:{}", id),
            PaymentPayload::Bundle(id) => format!("bundlebuy:{}", id),
            PaymentPayload::Premium { plan, buyer } => format!("premium|{}|{}", plan, buyer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPurchase {
    pub item: ShopItem,
    pub rarity: Rarity,
    pub points: u64,
    pub total_score: u64,
    pub balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePurchase {
    pub bundle: Bundle,
    pub points: u64,
    pub total_score: u64,
    pub balance: u64,
}

/// Result of honouring a star payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fulfilment {
    Coins { coins: u64, balance: u64 },
    Booster(BoosterKind),
    Card(CardPurchase),
    Bundle(BundlePurchase),
    Premium { plan: PremiumPlan, record: PremiumRecord },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payment {
    Coins,
    Stars,
}

fn load_item(txn: &LedgerTxn<'_>, id: u64) -> HomyakResult<ShopItem> {
    txn.get(&keys::shop_item(id))?
        .ok_or_else(|| ShopError::ItemNotFound(id).into())
}

fn load_bundle(txn: &LedgerTxn<'_>, id: u64) -> HomyakResult<Bundle> {
    txn.get(&keys::bundle(id))?
        .ok_or_else(|| ShopError::BundleNotFound(id).into())
}

fn charge(txn: &mut LedgerTxn<'_>, user: UserId, price: u64) -> HomyakResult<u64> {
    let balance = txn.balance(user)?;
    if balance < price {
        return Err(ShopError::InsufficientFunds { price, balance }.into());
    }
    txn.debit(user, price)
}

fn buy_card(txn: &mut LedgerTxn<'_>, user: UserId, item_id: u64, payment: Payment, now: DateTime<Utc>) -> HomyakResult<CardPurchase> {
    let mut item = load_item(txn, item_id)?;
    if txn.exists(&keys::purchase(user, item_id))? {
        return Err(match payment {
            Payment::Coins => ShopError::AlreadyOwned,
            Payment::Stars => ShopError::RefundRequired(format!("{} already bought", item.name)),
        }
        .into());
    }
    if !item.stock.take() {
        return Err(match payment {
            Payment::Coins => ShopError::OutOfStock,
            Payment::Stars => ShopError::RefundRequired(format!("{} sold out", item.name)),
        }
        .into());
    }
    if payment == Payment::Coins {
        charge(txn, user, item.price_coins)?;
    }
    txn.put(&keys::shop_item(item.id), &item)?;

    let rarity = rarity_of(txn, &item.filename)?;
    let points = points_now(txn, user, rarity, now)?;
    txn.grant_card(user, &item.filename, now)?;
    let total_score = txn.add_score(user, points, Some(&item.name))?;
    txn.put(
        &keys::purchase(user, item.id),
        &PurchaseRecord { filename: item.filename.clone(), at: now },
    )?;
    let balance = txn.balance(user)?;
    Ok(CardPurchase { item, rarity, points, total_score, balance })
}

fn buy_bundle(txn: &mut LedgerTxn<'_>, user: UserId, bundle_id: u64, payment: Payment, now: DateTime<Utc>) -> HomyakResult<BundlePurchase> {
    let mut bundle = load_bundle(txn, bundle_id)?;
    if !bundle.stock.take() {
        return Err(match payment {
            Payment::Coins => ShopError::OutOfStock,
            Payment::Stars => ShopError::RefundRequired(format!("{} sold out", bundle.name)),
        }
        .into());
    }
    if payment == Payment::Coins {
        charge(txn, user, bundle.price_coins)?;
    }
    txn.put(&keys::bundle(bundle.id), &bundle)?;

    let mut points = 0;
    for filename in &bundle.filenames {
        points += grant_scored(txn, user, filename, now)?;
    }
    let total_score = txn.score(user)?.total;
    let balance = txn.balance(user)?;
    Ok(BundlePurchase { bundle, points, total_score, balance })
}

#[derive(Clone)]
pub struct ShopService {
    ledger: Arc<Ledger>,
}

impl ShopService {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    // --- catalogue ---

    pub fn items(&self) -> HomyakResult<Vec<ShopItem>> {
        self.ledger.read(|txn| {
            Ok(txn
                .scan::<ShopItem>(keys::SHOP_ITEM_PREFIX)?
                .into_iter()
                .map(|(_, item)| item)
                .collect())
        })
    }

    pub fn item(&self, id: u64) -> HomyakResult<ShopItem> {
        self.ledger.read(|txn| load_item(txn, id))
    }

    pub async fn add_item(
        &self,
        filename: &str,
        name: &str,
        price_coins: u64,
        price_stars: u32,
        stock: u32,
    ) -> HomyakResult<ShopItem> {
        let item = self
            .ledger
            .transaction(|txn| {
                if !txn.exists(&keys::rarity(filename))? {
                    return Err(CardError::UnknownCard(filename.to_string()).into());
                }
                let listed = txn
                    .scan::<ShopItem>(keys::SHOP_ITEM_PREFIX)?
                    .into_iter()
                    .any(|(_, item)| item.filename == filename);
                if listed {
                    return Err(ShopError::DuplicateListing(filename.to_string()).into());
                }
                let item = ShopItem {
                    id: txn.next_id("shop_item")?,
                    filename: filename.to_string(),
                    name: if name.trim().is_empty() { card_title(filename).to_string() } else { name.trim().to_string() },
                    price_coins,
                    price_stars,
                    stock: Stock::from_count(stock),
                };
                txn.put(&keys::shop_item(item.id), &item)?;
                Ok(item)
            })
            .await?;
        tracing::info!(item_id = item.id, filename, price_coins, price_stars, "Shop item added");
        Ok(item)
    }

    pub async fn delete_item(&self, id: u64) -> HomyakResult<()> {
        self.ledger
            .transaction(|txn| {
                load_item(txn, id)?;
                txn.delete(&keys::shop_item(id));
                Ok(())
            })
            .await?;
        tracing::info!(item_id = id, "Shop item deleted");
        Ok(())
    }

    pub fn bundles(&self) -> HomyakResult<Vec<Bundle>> {
        self.ledger.read(|txn| {
            Ok(txn
                .scan::<Bundle>(keys::BUNDLE_PREFIX)?
                .into_iter()
                .map(|(_, b)| b)
                .collect())
        })
    }

    pub fn bundle(&self, id: u64) -> HomyakResult<Bundle> {
        self.ledger.read(|txn| load_bundle(txn, id))
    }

    pub async fn create_bundle(
        &self,
        name: &str,
        filenames: Vec<String>,
        price_coins: u64,
        price_stars: u32,
        stock: u32,
    ) -> HomyakResult<Bundle> {
        let bundle = self
            .ledger
            .transaction(|txn| {
                if filenames.is_empty() {
                    return Err(CardError::UnknownCard("empty bundle".to_string()).into());
                }
                for filename in &filenames {
                    if !txn.exists(&keys::rarity(filename))? {
                        return Err(CardError::UnknownCard(filename.clone()).into());
                    }
                }
                let bundle = Bundle {
                    id: txn.next_id("bundle")?,
                    name: name.trim().to_string(),
                    filenames,
                    price_coins,
                    price_stars,
                    stock: Stock::from_count(stock),
                };
                txn.put(&keys::bundle(bundle.id), &bundle)?;
                Ok(bundle)
            })
            .await?;
        tracing::info!(bundle_id = bundle.id, cards = bundle.filenames.len(), "Bundle created");
        Ok(bundle)
    }

    pub async fn delete_bundle(&self, id: u64) -> HomyakResult<()> {
        self.ledger
            .transaction(|txn| {
                load_bundle(txn, id)?;
                txn.delete(&keys::bundle(id));
                Ok(())
            })
            .await
    }

    pub fn has_bought(&self, user: UserId, item_id: u64) -> HomyakResult<bool> {
        self.ledger.read(|txn| txn.exists(&keys::purchase(user, item_id)))
    }

    // --- previews ---

    pub fn quote_card(&self, user: UserId, item_id: u64, now: DateTime<Utc>) -> HomyakResult<u64> {
        self.ledger.read(|txn| {
            let item = load_item(txn, item_id)?;
            let rarity = rarity_of(txn, &item.filename)?;
            points_now(txn, user, rarity, now)
        })
    }

    pub fn quote_bundle(&self, user: UserId, bundle_id: u64, now: DateTime<Utc>) -> HomyakResult<u64> {
        self.ledger.read(|txn| {
            let bundle = load_bundle(txn, bundle_id)?;
            let mut total = 0;
            for filename in &bundle.filenames {
                let rarity = rarity_of(txn, filename)?;
                total += points_now(txn, user, rarity, now)?;
            }
            Ok(total)
        })
    }

    // --- purchases with coins ---

    pub async fn buy_card_with_coins(&self, user: UserId, item_id: u64, now: DateTime<Utc>) -> HomyakResult<CardPurchase> {
        let purchase = self
            .ledger
            .transaction(|txn| buy_card(txn, user, item_id, Payment::Coins, now))
            .await?;
        tracing::info!(user_id = user, item_id, price = purchase.item.price_coins, "Card bought with coins");
        Ok(purchase)
    }

    pub async fn buy_bundle_with_coins(&self, user: UserId, bundle_id: u64, now: DateTime<Utc>) -> HomyakResult<BundlePurchase> {
        let purchase = self
            .ledger
            .transaction(|txn| buy_bundle(txn, user, bundle_id, Payment::Coins, now))
            .await?;
        tracing::info!(user_id = user, bundle_id, price = purchase.bundle.price_coins, "Bundle bought with coins");
        Ok(purchase)
    }

    /// One single-use booster for coins. Returns the new balance.
    pub async fn buy_booster_with_coins(&self, user: UserId, kind: BoosterKind, now: DateTime<Utc>) -> HomyakResult<u64> {
        let price = booster_price_coins(kind);
        let balance = self
            .ledger
            .transaction(|txn| {
                let balance = charge(txn, user, price)?;
                txn.add_elixir(user, kind, 1, None, now)?;
                Ok(balance)
            })
            .await?;
        tracing::info!(user_id = user, kind = %kind, price, "Booster bought with coins");
        Ok(balance)
    }

    // --- star payments ---

    /// Honour a confirmed star payment from `payer`
    pub async fn fulfil(&self, payer: UserId, payload: PaymentPayload, now: DateTime<Utc>) -> HomyakResult<Fulfilment> {
        let fulfilment = self
            .ledger
            .transaction(|txn| match payload {
                PaymentPayload::TopUp(coins) => {
                    if pack_stars(coins).is_none() {
                        return Err(ShopError::UnknownPack(coins).into());
                    }
                    let balance = txn.credit(payer, coins)?;
                    Ok(Fulfilment::Coins { coins, balance })
                }
                PaymentPayload::Booster(kind) => {
                    txn.add_elixir(payer, kind, 1, None, now)?;
                    Ok(Fulfilment::Booster(kind))
                }
                PaymentPayload::Card(item_id) => {
                    buy_card(txn, payer, item_id, Payment::Stars, now).map(Fulfilment::Card)
                }
                PaymentPayload::Bundle(bundle_id) => {
                    buy_bundle(txn, payer, bundle_id, Payment::Stars, now).map(Fulfilment::Bundle)
                }
                PaymentPayload::Premium { plan, buyer } => {
                    if buyer != payer {
                        return Err(ShopError::BadPayload(format!("payment by {} for {}", payer, buyer)).into());
                    }
                    let record = premium::activate_plan(txn, payer, plan, now)?;
                    Ok(Fulfilment::Premium { plan, record })
                }
            })
            .await?;
        tracing::info!(user_id = payer, payload = %payload.encode(), "Star payment fulfilled");
        Ok(fulfilment)
    }
}
