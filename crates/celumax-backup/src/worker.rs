//! # Backup Worker
//!
//! Periodic background backups.
//!
//! ## Worker Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        BackupWorker::run()                              │
//! │                                                                         │
//! │  loop select! {                                                         │
//! │    interval.tick()   ──► run_backup() ──► status.record(outcome)        │
//! │    trigger_rx.recv() ──► run_backup() ──► status.record(outcome)        │
//! │                                      └──► reply on the oneshot          │
//! │    shutdown_rx.recv() ─► break                                          │
//! │  }                                                                      │
//! │                                                                         │
//! │  run_backup():                                                          │
//! │    1. snapshot into a private staging dir  (VACUUM INTO)                │
//! │    2. sink.store()                          (spawn_blocking)            │
//! │    3. sink.prune(keep_last)                 (spawn_blocking)            │
//! │                                                                         │
//! │  TIMING:                                                                │
//! │  • First tick fires immediately, then every interval_hours             │
//! │  • Missed ticks are delayed, never bunched                             │
//! │  • A failed run is not retried before the next tick                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use celumax_db::Database;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, error, info};

use crate::config::BackupConfig;
use crate::error::{BackupError, BackupResult};
use crate::sink::{BackupEntry, BackupSink};
use crate::snapshot::create_snapshot;

/// Result of one backup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BackupOutcome {
    Stored {
        entry: BackupEntry,
        /// Older backups removed by retention.
        pruned: Vec<String>,
    },
    Failed {
        error: String,
    },
}

impl BackupOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BackupOutcome::Stored { .. })
    }
}

/// Running totals kept by the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackupStatus {
    pub runs: u64,
    pub failures: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<BackupOutcome>,
}

impl BackupStatus {
    fn record(&mut self, at: DateTime<Utc>, outcome: &BackupOutcome) {
        self.runs += 1;
        self.last_run_at = Some(at);
        if outcome.is_success() {
            self.last_success_at = Some(at);
        } else {
            self.failures += 1;
        }
        self.last_outcome = Some(outcome.clone());
    }
}

/// Takes one backup and applies retention.
///
/// Never fails: errors end up in [`BackupOutcome::Failed`].
pub async fn run_backup(
    db: &Database,
    sink: Arc<dyn BackupSink>,
    config: &BackupConfig,
) -> BackupOutcome {
    match try_backup(db, sink, config).await {
        Ok((entry, pruned)) => BackupOutcome::Stored { entry, pruned },
        Err(e) => {
            error!(error = %e, "Backup failed");
            BackupOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

async fn try_backup(
    db: &Database,
    sink: Arc<dyn BackupSink>,
    config: &BackupConfig,
) -> BackupResult<(BackupEntry, Vec<String>)> {
    // Removed on drop, after the sink has its own copy
    let staging = tempfile::Builder::new()
        .prefix("celumax-backup")
        .tempdir()?;
    let snapshot = create_snapshot(db, staging.path(), &config.file_prefix).await?;

    let store_sink = Arc::clone(&sink);
    let entry = tokio::task::spawn_blocking(move || {
        store_sink.store(&snapshot.path, &snapshot.name)
    })
    .await??;

    let keep_last = config.keep_last;
    let pruned = tokio::task::spawn_blocking(move || sink.prune(keep_last)).await??;
    if !pruned.is_empty() {
        info!(count = pruned.len(), "Pruned old backups");
    }

    Ok((entry, pruned))
}

// =============================================================================
// Worker
// =============================================================================

/// Periodic backup task. Spawn [`BackupWorker::run`] on the runtime.
pub struct BackupWorker {
    db: Database,
    sink: Arc<dyn BackupSink>,
    config: BackupConfig,
    status: Arc<RwLock<BackupStatus>>,
    trigger_rx: mpsc::Receiver<oneshot::Sender<BackupOutcome>>,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling a running [`BackupWorker`].
#[derive(Clone)]
pub struct BackupWorkerHandle {
    status: Arc<RwLock<BackupStatus>>,
    trigger_tx: mpsc::Sender<oneshot::Sender<BackupOutcome>>,
    shutdown_tx: mpsc::Sender<()>,
}

impl BackupWorkerHandle {
    pub async fn status(&self) -> BackupStatus {
        self.status.read().await.clone()
    }

    /// Runs a backup now and waits for its outcome.
    pub async fn trigger(&self) -> BackupResult<BackupOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.trigger_tx
            .send(reply_tx)
            .await
            .map_err(|_| BackupError::ChannelError("Backup worker stopped".into()))?;
        reply_rx
            .await
            .map_err(|_| BackupError::ChannelError("Backup worker dropped the request".into()))
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> BackupResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| BackupError::ChannelError("Shutdown channel closed".into()))
    }
}

impl BackupWorker {
    /// Creates a new worker and returns its handle.
    pub fn new(
        db: Database,
        sink: Arc<dyn BackupSink>,
        config: BackupConfig,
    ) -> (Self, BackupWorkerHandle) {
        let (trigger_tx, trigger_rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let status = Arc::new(RwLock::new(BackupStatus::default()));

        let worker = BackupWorker {
            db,
            sink,
            config,
            status: Arc::clone(&status),
            trigger_rx,
            shutdown_rx,
        };
        let handle = BackupWorkerHandle {
            status,
            trigger_tx,
            shutdown_tx,
        };

        (worker, handle)
    }

    /// Runs the backup loop until shutdown.
    ///
    /// Returns right away when backups are disabled in the config.
    pub async fn run(mut self) {
        if !self.config.enabled {
            info!("Periodic backups disabled");
            return;
        }

        info!(
            sink = %self.sink.label(),
            interval_hours = self.config.interval_hours,
            keep_last = self.config.keep_last,
            "Backup worker starting"
        );

        let mut interval = tokio::time::interval(self.config.interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    debug!("Scheduled backup");
                    self.run_and_record().await;
                }

                Some(reply) = self.trigger_rx.recv() => {
                    debug!("Manual backup requested");
                    let outcome = self.run_and_record().await;
                    let _ = reply.send(outcome);
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Backup worker shutting down");
                    break;
                }
            }
        }

        info!("Backup worker stopped");
    }

    async fn run_and_record(&self) -> BackupOutcome {
        let started = Utc::now();
        let outcome = run_backup(&self.db, Arc::clone(&self.sink), &self.config).await;
        self.status.write().await.record(started, &outcome);
        outcome
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::DirectorySink;
    use celumax_db::DbConfig;
    use std::path::Path;

    async fn file_db(dir: &Path) -> Database {
        Database::new(DbConfig::new(dir.join("celumax.db")))
            .await
            .unwrap()
    }

    fn config(dir: &Path, keep_last: usize) -> BackupConfig {
        BackupConfig {
            directory: dir.join("backups"),
            keep_last,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_record() {
        let mut status = BackupStatus::default();
        let now = Utc::now();
        status.record(now, &BackupOutcome::Failed { error: "disk full".into() });
        assert_eq!(status.runs, 1);
        assert_eq!(status.failures, 1);
        assert_eq!(status.last_success_at, None);
        assert_eq!(status.last_run_at, Some(now));
    }

    #[tokio::test]
    async fn test_run_backup_stores_and_prunes() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(dir.path()).await;
        let config = config(dir.path(), 2);
        let sink = Arc::new(DirectorySink::new(&config.directory, &config.file_prefix));

        for _ in 0..3 {
            let outcome = run_backup(&db, sink.clone(), &config).await;
            assert!(outcome.is_success(), "{outcome:?}");
            // Names carry millisecond timestamps
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let stored = sink.list().unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored[0].created_at > stored[1].created_at);
    }

    #[tokio::test]
    async fn test_run_backup_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(dir.path()).await;
        // A regular file where the sink expects a directory
        let blocker = dir.path().join("backups");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let config = config(dir.path(), 2);
        let sink = Arc::new(DirectorySink::new(&blocker, &config.file_prefix));

        let outcome = run_backup(&db, sink, &config).await;
        assert!(matches!(outcome, BackupOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_worker_trigger_status_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(dir.path()).await;
        let config = config(dir.path(), 10);
        let sink = Arc::new(DirectorySink::new(&config.directory, &config.file_prefix));

        let (worker, handle) = BackupWorker::new(db, sink.clone(), config);
        let task = tokio::spawn(worker.run());

        let outcome = handle.trigger().await.unwrap();
        assert!(outcome.is_success());

        let status = handle.status().await;
        assert!(status.runs >= 1);
        assert_eq!(status.failures, 0);
        assert!(status.last_success_at.is_some());
        assert!(!sink.list().unwrap().is_empty());

        handle.shutdown().await.unwrap();
        task.await.unwrap();
        assert!(handle.trigger().await.is_err());
    }

    #[tokio::test]
    async fn test_disabled_worker_exits() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(dir.path()).await;
        let config = BackupConfig {
            enabled: false,
            ..config(dir.path(), 10)
        };
        let sink = Arc::new(DirectorySink::new(&config.directory, &config.file_prefix));

        let (worker, handle) = BackupWorker::new(db, sink, config);
        worker.run().await;
        assert_eq!(handle.status().await, BackupStatus::default());
    }
}
