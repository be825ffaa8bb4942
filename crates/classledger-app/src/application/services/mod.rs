mod access;
mod adjustment_service;
mod analytics_service;
mod balance_service;
mod config_service;
mod leave_service;
mod makeup_service;
mod preference_service;
mod scheduler;
mod transaction_service;

pub use adjustment_service::AdjustmentService;
pub use analytics_service::AnalyticsService;
pub use balance_service::BalanceService;
pub use config_service::{ConfigService, LogLevel};
pub use leave_service::{LeaveApprovalOutcome, LeaveService, LeaveSubmission};
pub use makeup_service::MakeUpService;
pub use preference_service::PreferenceService;
pub use scheduler::{MaintenanceReport, MaintenanceScheduler};
pub use transaction_service::TransactionService;
