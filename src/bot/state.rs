//! Shared state handed to every handler.

use super::transport::Transport;
use crate::admin::AdminService;
use crate::audit::AuditSink;
use crate::bonus::BonusService;
use crate::cards::CardService;
use crate::casino::CasinoEngine;
use crate::config::HomyakConfig;
use crate::cooldown::Cooldowns;
use crate::ledger::Ledger;
use crate::premium::PremiumService;
use crate::profile::ProfileService;
use crate::promo::PromoService;
use crate::random::DrawSource;
use crate::shop::ShopService;
use std::sync::Arc;

pub struct AppState {
    pub config: HomyakConfig,
    pub ledger: Arc<Ledger>,
    pub transport: Arc<dyn Transport>,
    pub audit: Arc<dyn AuditSink>,
    pub rng: Arc<dyn DrawSource>,

    pub cards: CardService,
    pub cooldowns: Cooldowns,
    pub casino: CasinoEngine,
    pub shop: ShopService,
    pub promo: PromoService,
    pub premium: PremiumService,
    pub bonus: BonusService,
    pub profile: ProfileService,
    pub admin: AdminService,
}

impl AppState {
    pub fn new(
        config: HomyakConfig,
        ledger: Arc<Ledger>,
        transport: Arc<dyn Transport>,
        audit: Arc<dyn AuditSink>,
        rng: Arc<dyn DrawSource>,
    ) -> Self {
        Self {
            cards: CardService::new(ledger.clone(), config.economy.clone()),
            cooldowns: Cooldowns::new(ledger.clone()),
            casino: CasinoEngine::new(ledger.clone(), rng.clone(), &config.casino),
            shop: ShopService::new(ledger.clone()),
            promo: PromoService::new(ledger.clone()),
            premium: PremiumService::new(ledger.clone()),
            bonus: BonusService::new(ledger.clone()),
            profile: ProfileService::new(ledger.clone()),
            admin: AdminService::new(ledger.clone(), config.bot.owner_ids.clone()),
            config,
            ledger,
            transport,
            audit,
            rng,
        }
    }
}
