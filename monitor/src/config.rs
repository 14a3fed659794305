//! Configuration management (TOML)

use crate::error::MonitorError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub tracking: TrackingConfig,
    pub display: DisplayConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub refresh_interval_secs: u64,
    /// Used instead of `refresh_interval_secs` while any process is high risk.
    pub alert_interval_secs: u64,
    pub snapshot_timeout_ms: u64,
    pub max_consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub enabled: bool,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogBackend {
    Text,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub enabled: bool,
    pub every_cycles: u64,
    pub backend: LogBackend,
    pub text_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    pub retention_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            general: GeneralConfig {
                refresh_interval_secs: 3,
                alert_interval_secs: 1,
                snapshot_timeout_ms: 2000,
                max_consecutive_failures: 3,
            },
            tracking: TrackingConfig {
                capacity: crate::store::DEFAULT_CAPACITY,
            },
            display: DisplayConfig {
                enabled: true,
                rows: 10,
            },
            log: LogConfig {
                enabled: true,
                every_cycles: 5,
                backend: LogBackend::Text,
                text_path: PathBuf::from("data/analysis.log"),
                database_path: None,
                retention_days: 7,
            },
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        let checks = [
            (self.tracking.capacity == 0, "tracking.capacity must be positive"),
            (self.display.rows == 0, "display.rows must be positive"),
            (self.log.every_cycles == 0, "log.every_cycles must be positive"),
            (self.general.refresh_interval_secs == 0, "general.refresh_interval_secs must be positive"),
            (self.general.alert_interval_secs == 0, "general.alert_interval_secs must be positive"),
            (self.general.snapshot_timeout_ms == 0, "general.snapshot_timeout_ms must be positive"),
            (
                self.general.max_consecutive_failures == 0,
                "general.max_consecutive_failures must be positive",
            ),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(MonitorError::InvalidConfig(message.to_string())),
            None => Ok(()),
        }
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "riskmon")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Configured SQLite path, or `history.db` in the platform data dir.
    pub fn database_path(&self) -> PathBuf {
        self.log.database_path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "riskmon")
                .map(|dirs| dirs.data_dir().join("history.db"))
                .unwrap_or_else(|| PathBuf::from("data/history.db"))
        })
    }
}
