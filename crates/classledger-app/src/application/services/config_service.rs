use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{info, warn};

use crate::application::config::AppConfig;

/// Verbosity persisted under `logging.level`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error = 1,
    Warn = 2,
    #[default]
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// Unknown discriminants read back as `Info`
    fn from_raw(raw: u8) -> Self {
        Self::ALL
            .into_iter()
            .find(|level| *level as u8 == raw)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| {
                "Invalid log level. Must be one of: error, warn, info, debug, trace".to_string()
            })
    }
}

/// Loads `classledger.json` and persists log level changes back to it
pub struct ConfigService {
    config: AppConfig,
    level: AtomicU8,
    config_path: PathBuf,
}

impl ConfigService {
    /// `<config dir>/classledger/classledger.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("classledger")
            .join("classledger.json")
    }

    /// Load and validate the file at `path`. A missing file yields defaults.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let config_path = path.into();

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config {:?}", config_path))?;
            serde_json::from_str::<AppConfig>(&content)
                .with_context(|| format!("Invalid config {:?}", config_path))?
        } else {
            AppConfig::default()
        };

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid config {:?}: {}", config_path, e))?;

        info!(
            "📁 Config {:?} loaded, log level {}",
            config_path,
            config.logging.level.as_str()
        );

        Ok(Self {
            level: AtomicU8::new(config.logging.level as u8),
            config,
            config_path,
        })
    }

    /// Like [`ConfigService::load`], falling back to defaults when the file is unusable
    pub fn load_or_default(path: Option<PathBuf>) -> Self {
        let config_path = path.unwrap_or_else(Self::default_path);
        match Self::load(config_path.clone()) {
            Ok(service) => service,
            Err(e) => {
                warn!("⚠️  {:#}; using default configuration", e);
                Self::with_config(AppConfig::default(), config_path)
            }
        }
    }

    pub fn with_config(config: AppConfig, config_path: PathBuf) -> Self {
        Self {
            level: AtomicU8::new(config.logging.level as u8),
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_log_level(&self) -> LogLevel {
        LogLevel::from_raw(self.level.load(Ordering::Relaxed))
    }

    /// Swap the level in memory and rewrite the config file with it.
    ///
    /// The running subscriber keeps its filter until the next start.
    pub fn set_log_level(&self, level: LogLevel) -> anyhow::Result<()> {
        let previous = self.get_log_level();
        self.level.store(level as u8, Ordering::Relaxed);

        let mut config = self.config.clone();
        config.logging.level = level;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, serde_json::to_string_pretty(&config)?)
            .with_context(|| format!("Failed to write config {:?}", self.config_path))?;

        info!(
            "🔧 Log level {} -> {} written to {:?} (applies after restart)",
            previous.as_str(),
            level.as_str(),
            self.config_path
        );
        Ok(())
    }
}
