//! # Application Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CELUMAX_DB_PATH=/srv/celumax/celumax.db                            │
//! │     CELUMAX_BACKUP_DIR=/mnt/usb/backups                                │
//! │     CELUMAX_BACKUP_INTERVAL_HOURS=12                                   │
//! │     CELUMAX_BACKUP_ENABLED=false                                       │
//! │     CELUMAX_SHOP_NAME="CELUMAX Centro"                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/celumax/celumax.toml (Linux)                             │
//! │     ~/Library/Application Support/com.celumax.shop/celumax.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     database and backups under the platform data directory            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/home/shop/.local/share/celumax/celumax.db"
//!
//! [shop]
//! name = "CELUMAX"
//! tagline = "Servicio Técnico Especializado"
//! address = "Cra 7 # 12-40"
//! phones = "320 555 0000"
//! owner = "Thiago"
//! tax_id = "900.123.456-7"
//!
//! [backup]
//! enabled = true
//! interval_hours = 24
//! directory = "/home/shop/.local/share/celumax/backups"
//! keep_last = 10
//! file_prefix = "backup_auto"
//!
//! [logging]
//! filter = "info,celumax=debug,sqlx=warn"
//! ```

use std::path::{Path, PathBuf};

use celumax_backup::BackupConfig;
use celumax_core::printing::ShopHeader;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CliError, CliResult};

/// File name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "celumax.toml";

/// Database file name inside the platform data directory.
pub const DATABASE_FILE_NAME: &str = "celumax.db";

/// Default `tracing` filter when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,celumax=debug,sqlx=warn";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Unset means `<data dir>/celumax.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            filter: default_log_filter(),
        }
    }
}

/// Everything read from `celumax.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSection,

    /// Ticket header.
    #[serde(default)]
    pub shop: ShopHeader,

    #[serde(default = "default_backup")]
    pub backup: BackupConfig,

    #[serde(default)]
    pub logging: LoggingSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database: DatabaseSection::default(),
            shop: ShopHeader::default(),
            backup: default_backup(),
            logging: LoggingSection::default(),
        }
    }
}

/// Backups default to `<data dir>/backups` rather than a relative path.
fn default_backup() -> BackupConfig {
    BackupConfig {
        directory: data_dir()
            .map(|dir| dir.join("backups"))
            .unwrap_or_else(|| PathBuf::from("backups")),
        ..BackupConfig::default()
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "celumax", "shop")
}

fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (celumax.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CliResult<Self> {
        let mut config = match config_path.or_else(Self::default_config_path) {
            Some(path) => Self::read_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    fn read_file(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> CliResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CliError::config("No config path available"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(path)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.shop.name.trim().is_empty() {
            return Err(CliError::config("shop.name must not be empty"));
        }
        if let Some(path) = &self.database.path {
            if path.as_os_str().is_empty() {
                return Err(CliError::config("database.path must not be empty"));
            }
        }
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.logging.filter) {
            return Err(CliError::config(format!(
                "logging.filter '{}' is invalid: {}",
                self.logging.filter, e
            )));
        }
        self.backup.validate()?;
        Ok(())
    }

    /// Applies `CELUMAX_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("CELUMAX_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(dir) = lookup("CELUMAX_BACKUP_DIR") {
            self.backup.directory = PathBuf::from(dir);
        }

        if let Some(hours) = lookup("CELUMAX_BACKUP_INTERVAL_HOURS") {
            match hours.parse::<u64>() {
                Ok(h) => self.backup.interval_hours = h,
                Err(_) => warn!(value = %hours, "Ignoring invalid CELUMAX_BACKUP_INTERVAL_HOURS"),
            }
        }

        if let Some(enabled) = lookup("CELUMAX_BACKUP_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.backup.enabled = true,
                "0" | "false" | "no" | "off" => self.backup.enabled = false,
                _ => warn!(value = %enabled, "Ignoring invalid CELUMAX_BACKUP_ENABLED"),
            }
        }

        if let Some(name) = lookup("CELUMAX_SHOP_NAME") {
            self.shop.name = name;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Database file to open.
    pub fn database_path(&self) -> CliResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        data_dir()
            .map(|dir| dir.join(DATABASE_FILE_NAME))
            .ok_or_else(|| CliError::config("Could not determine app data directory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.shop.name, "CELUMAX");
        assert_eq!(config.backup.interval_hours, 24);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [shop]
            name = "CELUMAX Centro"
            phones = "320 555 0000"

            [backup]
            keep_last = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.shop.name, "CELUMAX Centro");
        assert_eq!(config.shop.tagline, "Servicio Técnico Especializado");
        assert_eq!(config.backup.keep_last, 3);
        assert_eq!(config.backup.interval_hours, 24);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CELUMAX_DB_PATH", "/tmp/shop.db"),
            ("CELUMAX_BACKUP_DIR", "/tmp/backups"),
            ("CELUMAX_BACKUP_INTERVAL_HOURS", "6"),
            ("CELUMAX_BACKUP_ENABLED", "off"),
            ("CELUMAX_SHOP_NAME", "Celumax Norte"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.backup.directory, PathBuf::from("/tmp/backups"));
        assert_eq!(config.backup.interval_hours, 6);
        assert!(!config.backup.enabled);
        assert_eq!(config.shop.name, "Celumax Norte");
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "CELUMAX_BACKUP_INTERVAL_HOURS" => Some("daily".to_string()),
            "CELUMAX_BACKUP_ENABLED" => Some("maybe".to_string()),
            _ => None,
        });
        assert_eq!(config.backup.interval_hours, 24);
        assert!(config.backup.enabled);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = AppConfig::default();
        config.shop.address = "Cra 7 # 12-40".to_string();
        config.database.path = Some(dir.path().join("shop.db"));
        config.save(Some(path.clone())).unwrap();

        let loaded = AppConfig::read_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_rejects_bad_sections() {
        let mut config = AppConfig::default();
        config.backup.keep_last = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.shop.name = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
