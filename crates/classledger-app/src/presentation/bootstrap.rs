use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::application::services::{
    AdjustmentService, AnalyticsService, BalanceService, ConfigService, LeaveService,
    MaintenanceScheduler, MakeUpService, PreferenceService, TransactionService,
};
use crate::presentation::state::{AppState, Repositories, Runtime, Services};
use classledger_domain::adjustment::AdjustmentRepository;
use classledger_domain::analytics::AnalyticsRepository;
use classledger_domain::catalog::ClassCatalogRepository;
use classledger_domain::leave::{LeavePolicy, LeaveRequestRepository};
use classledger_domain::ledger::{LedgerRepository, PurchaseRepository};
use classledger_domain::makeup::MakeUpRepository;
use classledger_domain::postponement::PostponementRepository;
use classledger_domain::scheduling::PreferenceRepository;
use classledger_infrastructure::persistence::{
    repositories::{
        SqliteAdjustmentRepository, SqliteAnalyticsRepository, SqliteClassCatalogRepository,
        SqliteLeaveRequestRepository, SqliteLedgerRepository, SqliteMakeUpRepository,
        SqlitePostponementRepository, SqlitePreferenceRepository, SqlitePurchaseRepository,
    },
    Database,
};

/// Open the configured database file and wire the application.
pub async fn build_app_state(config: ConfigService) -> anyhow::Result<AppState> {
    let settings = &config.config().database;
    let db_path = settings.resolve_path();
    let db_path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?
        .to_string();
    info!("Database path: {}", db_path_str);

    info!("🔌 Connecting to database...");
    let started_at = Instant::now();
    let database = Database::connect(&db_path_str, &settings.store_config())
        .await
        .context("Failed to open ledger store")?;
    info!(
        "✓ Database connection established ({}ms)",
        started_at.elapsed().as_millis()
    );

    build_app_state_with_database(database, config).await
}

/// Wire the application on top of an already opened database.
pub async fn build_app_state_with_database(
    database: Database,
    config: ConfigService,
) -> anyhow::Result<AppState> {
    let startup_started_at = Instant::now();
    let app_config = config.config().clone();

    info!("🔄 Running migrations...");
    let started_at = Instant::now();
    database
        .run_migrations()
        .await
        .context("Failed to run migrations")?;
    info!(
        "✓ Migrations completed ({}ms)",
        started_at.elapsed().as_millis()
    );

    let pool = Arc::new(database.pool().clone());

    let started_at = Instant::now();
    let repositories = Repositories {
        ledger: Arc::new(SqliteLedgerRepository::new(pool.clone())) as Arc<dyn LedgerRepository>,
        purchase: Arc::new(SqlitePurchaseRepository::new(pool.clone()))
            as Arc<dyn PurchaseRepository>,
        adjustment: Arc::new(SqliteAdjustmentRepository::new(pool.clone()))
            as Arc<dyn AdjustmentRepository>,
        leave: Arc::new(SqliteLeaveRequestRepository::new(pool.clone()))
            as Arc<dyn LeaveRequestRepository>,
        postponement: Arc::new(SqlitePostponementRepository::new(pool.clone()))
            as Arc<dyn PostponementRepository>,
        makeup: Arc::new(SqliteMakeUpRepository::new(pool.clone())) as Arc<dyn MakeUpRepository>,
        catalog: Arc::new(SqliteClassCatalogRepository::new(pool.clone()))
            as Arc<dyn ClassCatalogRepository>,
        preference: Arc::new(SqlitePreferenceRepository::new(pool.clone()))
            as Arc<dyn PreferenceRepository>,
        analytics: Arc::new(SqliteAnalyticsRepository::new(pool.clone()))
            as Arc<dyn AnalyticsRepository>,
    };
    info!(
        "✓ Repositories initialized ({}ms)",
        started_at.elapsed().as_millis()
    );

    let started_at = Instant::now();
    let balance = Arc::new(BalanceService::new(
        repositories.ledger.clone(),
        repositories.purchase.clone(),
        app_config.balance,
    ));
    let transaction = Arc::new(TransactionService::new(
        repositories.ledger.clone(),
        repositories.purchase.clone(),
        repositories.catalog.clone(),
    ));
    let adjustment = Arc::new(AdjustmentService::new(
        repositories.adjustment.clone(),
        repositories.ledger.clone(),
    ));
    let makeup = Arc::new(
        MakeUpService::new(
            repositories.postponement.clone(),
            repositories.makeup.clone(),
            repositories.catalog.clone(),
            repositories.preference.clone(),
            app_config.suggestions.clone(),
        )
        .context("Invalid suggestion settings")?,
    );
    let leave = Arc::new(LeaveService::new(
        repositories.leave.clone(),
        repositories.postponement.clone(),
        repositories.catalog.clone(),
        repositories.ledger.clone(),
        makeup.clone(),
        LeavePolicy::new(app_config.leave_policy.clone()),
    ));
    let preference = Arc::new(PreferenceService::new(repositories.preference.clone()));
    let analytics = Arc::new(AnalyticsService::new(
        repositories.analytics.clone(),
        app_config.analytics.thresholds,
        app_config.analytics.cache_ttl(),
    ));
    let scheduler = Arc::new(MaintenanceScheduler::new(
        transaction.clone(),
        makeup.clone(),
    ));
    info!(
        "✓ Services initialized ({}ms)",
        started_at.elapsed().as_millis()
    );

    info!(
        "✅ Application state ready ({}ms)",
        startup_started_at.elapsed().as_millis()
    );

    Ok(AppState {
        runtime: Runtime {
            db: Arc::new(database),
        },
        repositories,
        services: Services {
            balance,
            transaction,
            adjustment,
            leave,
            makeup,
            preference,
            analytics,
            scheduler,
            config: Arc::new(config),
        },
    })
}
