mod app_config;

pub use app_config::{
    AnalyticsSettings, AppConfig, DatabaseSettings, LoggingSettings, MaintenanceSettings,
};
