//! # State Module
//!
//! What a command needs besides its arguments.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────────────────┐                                       │
//! │  │           AppState           │  built once in main() per invocation  │
//! │  │  db: Database (pool + feed)  │                                       │
//! │  │  config: AppConfig           │                                       │
//! │  └──────────────┬───────────────┘                                       │
//! │                 │ db.clone()                                            │
//! │        ┌────────┴─────────┐                                             │
//! │        ▼                  ▼                                             │
//! │  ┌──────────────┐  ┌──────────────┐                                     │
//! │  │InventoryState│  │DashboardState│  watch channels, refreshed by the   │
//! │  │ query, rows, │  │ today's      │  change feed                        │
//! │  │ metrics      │  │ snapshot     │                                     │
//! │  └──────────────┘  └──────────────┘                                     │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Database: internal connection pool, cheap to clone                  │
//! │  • View states: Arc<watch::Sender<T>>, cloned into listener tasks      │
//! │  • AppConfig: read-only after load                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod dashboard;
mod inventory;

pub use config::{AppConfig, DatabaseSection, LoggingSection, CONFIG_FILE_NAME, DEFAULT_LOG_FILTER};
pub use dashboard::{DashboardState, DASHBOARD_TICK};
pub use inventory::{InventoryState, InventoryView, INVENTORY_SEARCH_LIMIT};

use celumax_db::{Database, DbConfig};
use tracing::info;

use crate::error::CliResult;

/// Shared by every command of one invocation.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
}

impl AppState {
    /// Opens the configured database, creating it and its directory if needed.
    pub async fn open(config: AppConfig) -> CliResult<Self> {
        let path = config.database_path()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!(path = %path.display(), "Opening database");
        let db = Database::new(DbConfig::new(path)).await?;
        Ok(AppState { db, config })
    }

    #[cfg(test)]
    pub(crate) async fn in_memory(config: AppConfig) -> CliResult<Self> {
        let db = Database::new(DbConfig::in_memory()).await?;
        Ok(AppState { db, config })
    }
}
