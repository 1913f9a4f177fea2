//! # Backup Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Backup Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Snapshot     │  │      Restore            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Database       │  │  NotASqliteFile         │ │
//! │  │                 │  │  Io             │  │  BackupNotFound         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │      Sink       │  │     Worker      │                              │
//! │  │                 │  │                 │                              │
//! │  │  InvalidName    │  │  ChannelError   │                              │
//! │  │  SinkFailed     │  │  TaskFailed     │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use celumax_db::DbError;
use thiserror::Error;

/// Result type alias for backup operations.
pub type BackupResult<T> = Result<T, BackupError>;

#[derive(Debug, Error)]
pub enum BackupError {
    /// Invalid backup configuration.
    #[error("Invalid backup configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot could not be taken.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File lacks the `SQLite format 3` header.
    #[error("{} is not a SQLite database", .0.display())]
    NotASqliteFile(PathBuf),

    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    /// Backup names are plain file names, never paths.
    #[error("Invalid backup name: {0}")]
    InvalidName(String),

    #[error("Backup sink failed: {0}")]
    SinkFailed(String),

    /// Worker is gone.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// A blocking sink call panicked or was cancelled.
    #[error("Backup task failed: {0}")]
    TaskFailed(String),
}

impl From<tokio::task::JoinError> for BackupError {
    fn from(err: tokio::task::JoinError) -> Self {
        BackupError::TaskFailed(err.to_string())
    }
}
