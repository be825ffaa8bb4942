use std::sync::Arc;

use crate::application::config::AppConfig;
use crate::application::services::{
    AdjustmentService, AnalyticsService, BalanceService, ConfigService, LeaveService,
    MaintenanceScheduler, MakeUpService, PreferenceService, TransactionService,
};
use classledger_domain::adjustment::AdjustmentRepository;
use classledger_domain::analytics::AnalyticsRepository;
use classledger_domain::catalog::ClassCatalogRepository;
use classledger_domain::leave::LeaveRequestRepository;
use classledger_domain::ledger::{LedgerRepository, PurchaseRepository};
use classledger_domain::makeup::MakeUpRepository;
use classledger_domain::postponement::PostponementRepository;
use classledger_domain::scheduling::PreferenceRepository;
use classledger_infrastructure::persistence::Database;

pub struct Runtime {
    pub db: Arc<Database>,
}

pub struct Repositories {
    pub ledger: Arc<dyn LedgerRepository>,
    pub purchase: Arc<dyn PurchaseRepository>,
    pub adjustment: Arc<dyn AdjustmentRepository>,
    pub leave: Arc<dyn LeaveRequestRepository>,
    pub postponement: Arc<dyn PostponementRepository>,
    pub makeup: Arc<dyn MakeUpRepository>,
    pub catalog: Arc<dyn ClassCatalogRepository>,
    pub preference: Arc<dyn PreferenceRepository>,
    pub analytics: Arc<dyn AnalyticsRepository>,
}

pub struct Services {
    pub balance: Arc<BalanceService>,
    pub transaction: Arc<TransactionService>,
    pub adjustment: Arc<AdjustmentService>,
    pub leave: Arc<LeaveService>,
    pub makeup: Arc<MakeUpService>,
    pub preference: Arc<PreferenceService>,
    pub analytics: Arc<AnalyticsService>,
    pub scheduler: Arc<MaintenanceScheduler>,
    pub config: Arc<ConfigService>,
}

/// Everything a handler needs, wired once at start-up
pub struct AppState {
    pub runtime: Runtime,
    pub repositories: Repositories,
    pub services: Services,
}

impl AppState {
    pub async fn new(config: ConfigService) -> anyhow::Result<Self> {
        crate::presentation::bootstrap::build_app_state(config).await
    }

    pub fn config(&self) -> &AppConfig {
        self.services.config.config()
    }

    /// Stop background work and close the store.
    pub async fn shutdown(&self) {
        self.services.scheduler.shutdown().await;
        self.runtime.db.close().await;
    }
}
