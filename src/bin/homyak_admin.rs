//! Offline maintenance for a Homyak data directory.
//!
//! Runs the storage-level admin operations directly against RocksDB; stop
//! the bot first, RocksDB allows one process per directory.

use chrono::Utc;
use clap::{Parser, Subcommand};
use homyak::{
    admin::AdminService,
    cards::CardService,
    config::{ConfigLoader, EconomyConfig},
    cooldown::Cooldowns,
    errors::HomyakResult,
    ledger::{Ledger, UserId},
    profile::{LeaderboardKind, ProfileService},
    promo::{PromoReward, PromoService},
    rewards::Rarity,
    storage::RocksStore,
    telemetry,
};
use std::{path::PathBuf, sync::Arc};

/// Homyak offline admin tool
#[derive(Parser)]
#[command(name = "homyak-admin")]
#[command(about = "Inspect and maintain the Homyak ledger offline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory, overrides the config file
    #[arg(short, long)]
    data_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a user's profile
    User { id: UserId },

    /// Wipe a user's score, cards, cooldown, premium and bonus
    ResetUser { id: UserId },

    /// Adjust a balance by a signed amount
    GrantCoins {
        id: UserId,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },

    /// Register a card file with a rarity tier (1-5)
    AddCard { filename: String, tier: u8 },

    /// Change a card's rarity tier
    SetRarity { filename: String, tier: u8 },

    /// Rename a card everywhere
    RenameCard { old: String, new: String },

    /// Remove a card from the catalog and every collection
    DeleteCard { filename: String },

    /// Number of cards per rarity tier
    RarityStats,

    /// Create a promo code. Kinds: 1 points, 2 card, 3 cooldown reset, 4 score boost, 5 coins
    AddPromo {
        code: String,
        kind: u8,
        value: String,
        uses: u32,
        /// Boost duration for kind 4
        #[arg(short, long)]
        minutes: Option<u32>,
    },

    /// Delete a promo code
    DeletePromo { code: String },

    /// List promo codes
    Promos,

    /// Clear every draw cooldown
    ResetCooldowns,

    /// Top users by score, coins or cards
    Top {
        #[arg(default_value = "score")]
        kind: String,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

fn tier(value: u8) -> HomyakResult<Rarity> {
    Rarity::new(value).ok_or_else(|| homyak::errors::CardError::InvalidRarity(value).into())
}

#[tokio::main]
async fn main() -> HomyakResult<()> {
    let cli = Cli::parse();
    telemetry::init(false);

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_directory = dir;
    }

    let ledger = Arc::new(Ledger::new(Arc::new(RocksStore::open(&config.storage.data_directory)?)));
    let now = Utc::now();

    match cli.command {
        Commands::User { id } => {
            let profile = ProfileService::new(ledger.clone()).profile(id, now)?;
            println!("👤 User {}", id);
            println!("   Coins: {}", profile.balance);
            println!("   Score: {}", profile.score);
            println!("   Cards: {}/{}", profile.cards_owned, profile.catalog_size);
            println!("   Premium: {}", profile.premium_active);
            println!("   Bonus: {}", profile.bonus_active);
            println!("   Boosters: luck {}, time {}", profile.luck_boosters, profile.time_boosters);
            println!("   Cooldown: {}s", profile.cooldown_secs);
        }
        Commands::ResetUser { id } => {
            let summary = admin(&ledger, &config.bot.owner_ids).reset_user(id).await?;
            println!("✅ Reset user {}: {} cards, {} points removed", id, summary.cards, summary.score);
        }
        Commands::GrantCoins { id, delta } => {
            let balance = admin(&ledger, &config.bot.owner_ids).grant_coins(id, delta).await?;
            println!("✅ Balance of {} is now {}", id, balance);
        }
        Commands::AddCard { filename, tier: t } => {
            cards(&ledger, &config.economy).add_card(&filename, tier(t)?).await?;
            println!("✅ Added {} as tier {}", filename, t);
        }
        Commands::SetRarity { filename, tier: t } => {
            cards(&ledger, &config.economy).set_rarity(&filename, tier(t)?).await?;
            println!("✅ {} is now tier {}", filename, t);
        }
        Commands::RenameCard { old, new } => {
            let moved = cards(&ledger, &config.economy).rename(&old, &new).await?;
            println!("✅ Renamed {} to {} ({} owners)", old, new, moved);
        }
        Commands::DeleteCard { filename } => {
            let removed = cards(&ledger, &config.economy).delete(&filename).await?;
            println!("✅ Deleted {} ({} owners)", filename, removed);
        }
        Commands::RarityStats => {
            for (t, count) in cards(&ledger, &config.economy).rarity_stats()? {
                println!("   Tier {}: {}", t, count);
            }
        }
        Commands::AddPromo { code, kind, value, uses, minutes } => {
            let reward = PromoReward::from_parts(kind, &value, minutes)?;
            let owner = config.bot.owner_ids.first().copied().unwrap_or_default();
            let promo = PromoService::new(ledger.clone()).create(&code, owner, reward, uses, now).await?;
            println!("✅ Promo {} created: {} × {}", promo.code, promo.reward, promo.max_uses);
        }
        Commands::DeletePromo { code } => {
            PromoService::new(ledger.clone()).delete(&code).await?;
            println!("✅ Promo {} deleted", code);
        }
        Commands::Promos => {
            for promo in PromoService::new(ledger.clone()).list()? {
                println!("   {} • {} • {}/{}", promo.code, promo.reward, promo.used_count, promo.max_uses);
            }
        }
        Commands::ResetCooldowns => {
            let cleared = Cooldowns::new(ledger.clone()).reset_all().await?;
            println!("✅ Cleared {} cooldowns", cleared);
        }
        Commands::Top { kind, limit } => {
            let kind = LeaderboardKind::parse(&kind).unwrap_or(LeaderboardKind::Score);
            let profiles = ProfileService::new(ledger.clone());
            for (place, entry) in profiles.top(kind, limit)?.iter().enumerate() {
                println!("   {}. {} ({}): {}", place + 1, profiles.display_name(entry.user)?, entry.user, entry.value);
            }
        }
    }
    Ok(())
}

fn admin(ledger: &Arc<Ledger>, owners: &[UserId]) -> AdminService {
    AdminService::new(ledger.clone(), owners.to_vec())
}

fn cards(ledger: &Arc<Ledger>, economy: &EconomyConfig) -> CardService {
    CardService::new(ledger.clone(), economy.clone())
}
