//! # Backup Configuration
//!
//! The `[backup]` section of `celumax.toml`.
//!
//! ```toml
//! [backup]
//! enabled = true
//! interval_hours = 24
//! directory = "/home/shop/.local/share/celumax/backups"
//! keep_last = 10
//! file_prefix = "backup_auto"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BackupError, BackupResult};

/// Settings for the periodic backup worker and the directory sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Whether the periodic worker runs at all.
    /// Manual backups work either way.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Hours between scheduled backups.
    /// Default: 24
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// Where [`DirectorySink`](crate::sink::DirectorySink) writes snapshots.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Snapshots kept after each run; older ones are pruned.
    /// Default: 10
    #[serde(default = "default_keep_last")]
    pub keep_last: usize,

    /// Snapshot files are named `<prefix>_<unix millis>.db`.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_enabled() -> bool {
    true
}

fn default_interval_hours() -> u64 {
    24
}

fn default_directory() -> PathBuf {
    PathBuf::from("backups")
}

fn default_keep_last() -> usize {
    10
}

fn default_file_prefix() -> String {
    "backup_auto".to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        BackupConfig {
            enabled: default_enabled(),
            interval_hours: default_interval_hours(),
            directory: default_directory(),
            keep_last: default_keep_last(),
            file_prefix: default_file_prefix(),
        }
    }
}

impl BackupConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.saturating_mul(3600))
    }

    pub fn validate(&self) -> BackupResult<()> {
        if self.interval_hours == 0 {
            return Err(BackupError::InvalidConfig(
                "interval_hours must be at least 1".to_string(),
            ));
        }
        if self.keep_last == 0 {
            return Err(BackupError::InvalidConfig(
                "keep_last must be at least 1".to_string(),
            ));
        }
        let prefix_ok = !self.file_prefix.is_empty()
            && self
                .file_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !prefix_ok {
            return Err(BackupError::InvalidConfig(format!(
                "file_prefix '{}' may only contain letters, digits, '_' and '-'",
                self.file_prefix
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackupConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval(), Duration::from_secs(24 * 3600));
        assert_eq!(config.keep_last, 10);
        assert_eq!(config.file_prefix, "backup_auto");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = BackupConfig {
            interval_hours: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.interval_hours = 6;
        config.keep_last = 0;
        assert!(config.validate().is_err());

        config.keep_last = 3;
        config.file_prefix = "../escape".to_string();
        assert!(config.validate().is_err());
    }
}
