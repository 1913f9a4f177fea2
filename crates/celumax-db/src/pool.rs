//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  CLI startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐   ┌──────────────────┐    │
//! │  │            SqlitePool                    │   │   ChangeFeed     │    │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │   │   (broadcast)    │    │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │   └──────────────────┘    │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.products() / db.invoices() / db.receipts() ...                     │
//! │  Each repository shares the pool and the change feed.                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Better concurrent read performance
//! - Readers don't block writers
//! - Better crash recovery
//!
//! Snapshots checkpoint the WAL first so the copied file is complete.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::changes::{ChangeFeed, DataChange};
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::dashboard::DashboardRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::movement::MovementRepository;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;
use crate::repository::receipt::ReceiptRepository;

/// Path value that selects a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/celumax.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (plenty for a single shop counter)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// A single connection is kept for the whole lifetime of the pool:
    /// every new in-memory connection would see an empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(3600),
            run_migrations: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }

    fn connect_url(&self) -> String {
        if self.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            // mode=rwc creates the file if it does not exist
            format!("sqlite://{}?mode=rwc", self.database_path.display())
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone: the pool and the change feed are both reference counted.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./celumax.db")).await?;
/// let product = db.products().insert(&new_product).await?;
/// db.movements()
///     .record(&product.id, MovementKind::Salida, 1, "Ajuste por pérdida")
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
    changes: ChangeFeed,
    path: PathBuf,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled (invoice lines and movements depend on them)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_options = SqliteConnectOptions::from_str(&config.connect_url())
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has foreign keys disabled by default
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout));

        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None).idle_timeout(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            changes: ChangeFeed::new(),
            path: config.database_path.clone(),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Idempotent: applied migrations are tracked in `_sqlx_migrations`.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Path the database was opened with (`:memory:` for tests).
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone(), self.changes.clone())
    }

    pub fn movements(&self) -> MovementRepository {
        MovementRepository::new(self.pool.clone(), self.changes.clone())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone(), self.changes.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone(), self.changes.clone())
    }

    pub fn receipts(&self) -> ReceiptRepository {
        ReceiptRepository::new(self.pool.clone(), self.changes.clone())
    }

    pub fn dashboard(&self) -> DashboardRepository {
        DashboardRepository::new(self.pool.clone(), self.changes.clone())
    }

    /// Subscribes to change notifications published after each commit.
    pub fn subscribe(&self) -> broadcast::Receiver<DataChange> {
        self.changes.subscribe()
    }

    /// Writes a consistent copy of the database to `dest`.
    ///
    /// ## How It Works
    /// 1. `PRAGMA wal_checkpoint(TRUNCATE)` folds the WAL into the main file
    /// 2. `VACUUM INTO` writes a compacted single-file copy
    ///
    /// `dest` must not exist yet; SQLite refuses to overwrite it.
    pub async fn snapshot_to(&self, dest: &Path) -> DbResult<()> {
        if dest.exists() {
            return Err(DbError::SnapshotFailed(format!(
                "{} already exists",
                dest.display()
            )));
        }

        let target = dest
            .to_str()
            .ok_or_else(|| DbError::SnapshotFailed("path is not valid UTF-8".to_string()))?
            .to_string();

        debug!(dest = %target, "Checkpointing WAL before snapshot");
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;

        sqlx::query("VACUUM INTO ?1")
            .bind(&target)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::SnapshotFailed(e.to_string()))?;

        info!(dest = %target, "Database snapshot written");
        Ok(())
    }

    /// Closes the database connection pool.
    ///
    /// Call before replacing the database file (restore) or on shutdown.
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
