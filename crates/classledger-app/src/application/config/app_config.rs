use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use classledger_domain::analytics::EfficiencyThresholds;
use classledger_domain::leave::LeavePolicyConfig;
use classledger_domain::ledger::BalancePolicy;
use classledger_domain::makeup::{SuggestionConfig, SuggestionScorer};
use classledger_domain::shared::DomainError;
use classledger_infrastructure::config::StoreConfig;

use crate::application::services::LogLevel;

const APP_DIR: &str = "classledger";

/// Where the ledger database lives and how the pool behaves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Defaults to `<data dir>/classledger/classledger.db`
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

impl DatabaseSettings {
    pub fn resolve_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            let db_filename = if cfg!(debug_assertions) {
                "classledger-dev.db"
            } else {
                "classledger.db"
            };
            dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from("."))
                .join(db_filename)
        })
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.max_connections, self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    /// Defaults to `<local data dir>/classledger/logs`
    pub log_dir: Option<PathBuf>,
}

impl LoggingSettings {
    pub fn resolve_log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|dir| dir.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from("."))
                .join("logs")
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    pub cache_ttl_secs: u64,
    #[serde(flatten)]
    pub thresholds: EfficiencyThresholds,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 900,
            thresholds: EfficiencyThresholds::default(),
        }
    }
}

impl AnalyticsSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceSettings {
    pub enabled: bool,
    pub sweep_interval_secs: u64,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: 3_600,
        }
    }
}

impl MaintenanceSettings {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Contents of `classledger.json`
///
/// Every section is optional in the file; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub leave_policy: LeavePolicyConfig,
    pub suggestions: SuggestionConfig,
    pub balance: BalancePolicy,
    pub analytics: AnalyticsSettings,
    pub maintenance: MaintenanceSettings,
}

impl AppConfig {
    /// Reject settings the services cannot run with.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.leave_policy.validate()?;
        SuggestionScorer::new(&self.suggestions)?;

        if self.suggestions.search_window_days <= 0 || self.suggestions.selection_deadline_days <= 0
        {
            return Err(DomainError::Validation(
                "Suggestion search window and selection deadline must be at least one day"
                    .to_string(),
            ));
        }
        if self.balance.low_balance_threshold < 0.0 || self.balance.expiring_window_days < 0 {
            return Err(DomainError::Validation(
                "Balance thresholds cannot be negative".to_string(),
            ));
        }
        if self.maintenance.sweep_interval_secs == 0 {
            return Err(DomainError::Validation(
                "Maintenance sweep interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    // Builder helpers, mostly for tests and embedding

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database.path = Some(path.into());
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.logging.log_dir = Some(dir.into());
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.analytics.cache_ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.maintenance.sweep_interval_secs = interval.as_secs();
        self
    }
}
