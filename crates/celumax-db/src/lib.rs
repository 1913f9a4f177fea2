//! # celumax-db: Database Layer for the Celumax Shop Manager
//!
//! This crate provides database access for the shop manager.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Celumax Data Flow                                │
//! │                                                                         │
//! │  CLI command (celumax invoice create ...)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    celumax-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InvoiceRepo   │    │ 001_initial_ │  │   │
//! │  │   │ ChangeFeed    │    │ ReceiptRepo   │    │  schema.sql  │  │   │
//! │  │   │ snapshot_to() │    │ ...           │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/celumax.db                                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, configuration and snapshots
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`changes`] - Post-commit change notifications
//! - [`repository`] - Repository implementations (product, invoice, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use celumax_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/celumax.db")).await?;
//!
//! let screens = db.products().search("pantalla", 20, 0).await?;
//! let today = db.dashboard().today().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod changes;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use changes::{ChangeFeed, DataChange};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, IN_MEMORY_PATH};

// Repository re-exports for convenience
pub use repository::dashboard::DashboardRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::movement::MovementRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::receipt::ReceiptRepository;
