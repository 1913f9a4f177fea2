//! # celumax-backup: Database Backups
//!
//! Whole-database snapshots, shipped to a sink on a schedule.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Backup Architecture                             │
//! │                                                                         │
//! │   ┌──────────────┐   snapshot_to()   ┌─────────────────────────────┐   │
//! │   │  celumax-db  │ ────────────────► │  staging/<prefix>_<ms>.db   │   │
//! │   │  (Database)  │   VACUUM INTO     └──────────────┬──────────────┘   │
//! │   └──────────────┘                                  │ store()          │
//! │          ▲                                          ▼                  │
//! │          │ restore_file()            ┌─────────────────────────────┐   │
//! │          └────────────────────────── │  dyn BackupSink             │   │
//! │             (db closed first)        │  DirectorySink (local dir)  │   │
//! │                                      └─────────────────────────────┘   │
//! │                                                                         │
//! │   BackupWorker: interval tick / manual trigger → run_backup()          │
//! │   BackupWorkerHandle: status(), trigger(), shutdown()                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let sink = Arc::new(DirectorySink::new(&config.directory, &config.file_prefix));
//! let (worker, handle) = BackupWorker::new(db.clone(), sink, config);
//! tokio::spawn(worker.run());
//!
//! let outcome = handle.trigger().await?;
//! ```

pub mod config;
pub mod error;
pub mod restore;
pub mod sink;
pub mod snapshot;
pub mod worker;

pub use config::BackupConfig;
pub use error::{BackupError, BackupResult};
pub use restore::{restore_file, restore_from_sink, RestoreReport};
pub use sink::{BackupEntry, BackupSink, DirectorySink};
pub use snapshot::{create_snapshot, Snapshot};
pub use worker::{run_backup, BackupOutcome, BackupStatus, BackupWorker, BackupWorkerHandle};
