//! Homyak bot binary
//!
//! Loads configuration, opens the RocksDB ledger, closes casino rounds a
//! previous run left open and starts the Telegram dispatcher.

use clap::Parser;
use homyak::{
    audit::TransportAudit,
    bot::{spawn_sweeper, AppState, Bot},
    config::{require_token, ConfigLoader},
    errors::HomyakResult,
    ledger::Ledger,
    random::ThreadRngSource,
    storage::RocksStore,
    telegram::{self, TeloxideTransport},
    telemetry,
};
use std::{path::PathBuf, sync::Arc};

/// Homyak Telegram bot
#[derive(Parser)]
#[command(name = "homyak")]
#[command(about = "Hamster card collection bot with a coin casino")]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory, overrides the config file
    #[arg(short, long)]
    data_dir: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> HomyakResult<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_directory = dir;
    }
    let token = require_token(&config)?.to_string();

    let store = RocksStore::open_with_config(&config.storage)?;
    let ledger = Arc::new(Ledger::new(Arc::new(store)));
    tracing::info!(path = %config.storage.data_directory, "Ledger opened");

    let tg = teloxide::Bot::new(token);
    let transport = Arc::new(TeloxideTransport::new(tg.clone()));
    let audit = Arc::new(TransportAudit::new(transport.clone(), &config.bot));
    let state = Arc::new(AppState::new(config, ledger, transport, audit, Arc::new(ThreadRngSource)));

    let closed = state.casino.reconcile_open_rounds().await?;
    tracing::info!(closed, "Casino rounds reconciled");

    let sweeper = spawn_sweeper(state.clone());
    telegram::run(tg, Bot::new(state)).await;
    sweeper.abort();

    tracing::info!("Homyak stopped");
    Ok(())
}
