pub mod adjustment_repo;
pub mod analytics_repo;
pub mod catalog_repo;
pub mod leave_repo;
pub mod ledger_repo;
pub mod makeup_repo;
pub mod postponement_repo;
pub mod preference_repo;
pub mod purchase_repo;

pub use adjustment_repo::SqliteAdjustmentRepository;
pub use analytics_repo::SqliteAnalyticsRepository;
pub use catalog_repo::SqliteClassCatalogRepository;
pub use leave_repo::SqliteLeaveRequestRepository;
pub use ledger_repo::SqliteLedgerRepository;
pub use makeup_repo::SqliteMakeUpRepository;
pub use postponement_repo::SqlitePostponementRepository;
pub use preference_repo::SqlitePreferenceRepository;
pub use purchase_repo::SqlitePurchaseRepository;
