//! # Backup Commands
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  backup now          one snapshot into [backup].directory, then prune   │
//! │  backup list         stored snapshots, newest first                     │
//! │  backup restore X    close the pool, keep celumax.db.pre-restore,       │
//! │                      copy X over celumax.db, drop -wal / -shm           │
//! │  backup run          stay in the foreground: BackupWorker on its        │
//! │                      interval until Ctrl-C                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use celumax_backup::{
    restore_file, restore_from_sink, run_backup, BackupOutcome, BackupSink, BackupWorker,
    DirectorySink,
};
use celumax_db::IN_MEMORY_PATH;
use tracing::{info, warn};

use super::Output;
use crate::error::{CliError, CliResult, ErrorCode};
use crate::state::AppState;

#[derive(Debug, Clone, Subcommand)]
pub enum BackupCommand {
    /// Take a backup now
    Now,
    /// Stored backups, newest first
    List,
    /// Replace the database with a stored backup
    Restore {
        /// Backup name as shown by `backup list`
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        name: Option<String>,
        /// Restore from a database file outside the backup directory
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Run periodic backups in the foreground until Ctrl-C
    Run,
}

fn sink_for(state: &AppState) -> Arc<dyn BackupSink> {
    let config = &state.config.backup;
    Arc::new(DirectorySink::new(&config.directory, &config.file_prefix))
}

/// Runs blocking sink I/O off the async workers.
async fn blocking<T, F>(f: F) -> CliResult<T>
where
    F: FnOnce() -> celumax_backup::BackupResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CliError::internal(format!("Backup task failed: {}", e)))?
        .map_err(Into::into)
}

pub async fn run(state: &AppState, cmd: BackupCommand) -> CliResult<Output> {
    match cmd {
        BackupCommand::Now => match run_backup(&state.db, sink_for(state), &state.config.backup).await {
            BackupOutcome::Failed { error } => Err(CliError::new(ErrorCode::BackupError, error)),
            stored => Output::json(stored),
        },

        BackupCommand::List => {
            let sink = sink_for(state);
            Output::json(blocking(move || sink.list()).await?)
        }

        BackupCommand::Restore { name, file } => {
            let db_path = state.db.path().to_path_buf();
            if db_path.as_os_str() == IN_MEMORY_PATH {
                return Err(CliError::validation("Cannot restore over an in-memory database"));
            }

            // The pool must let go of the file before it is replaced
            state.db.close().await;

            let report = match (name, file) {
                (_, Some(file)) => blocking(move || restore_file(&file, &db_path)).await?,
                (Some(name), None) => {
                    let sink = sink_for(state);
                    blocking(move || restore_from_sink(sink.as_ref(), &name, &db_path)).await?
                }
                (None, None) => return Err(CliError::validation("Give a backup name or --file")),
            };
            Output::json(report)
        }

        BackupCommand::Run => {
            if !state.config.backup.enabled {
                warn!("[backup].enabled is false, nothing to run");
                return Output::json(serde_json::json!({ "enabled": false }));
            }

            let (worker, handle) =
                BackupWorker::new(state.db.clone(), sink_for(state), state.config.backup.clone());
            let task = tokio::spawn(worker.run());

            tokio::signal::ctrl_c().await?;
            info!("Ctrl-C received, stopping backup worker");

            handle.shutdown().await?;
            if let Err(e) = task.await {
                warn!(error = %e, "Backup worker task ended abnormally");
            }
            Output::json(handle.status().await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use celumax_core::NewProduct;
    use std::path::Path;

    fn config(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.database.path = Some(dir.join("celumax.db"));
        config.backup.directory = dir.join("backups");
        config
    }

    async fn add_product(state: &AppState, name: &str) {
        state
            .db
            .products()
            .insert(&NewProduct {
                name: name.into(),
                purchase_price_cents: 100_000,
                sale_price_cents: 200_000,
                stock: 1,
                ..Default::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_now_list_restore() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(config(dir.path())).await.unwrap();
        add_product(&state, "Pantalla A10").await;

        let stored = match run(&state, BackupCommand::Now).await.unwrap() {
            Output::Json(value) => value,
            Output::Text(_) => panic!("expected JSON"),
        };
        assert_eq!(stored["result"], "stored");
        let name = stored["entry"]["name"].as_str().unwrap().to_string();

        let listed = match run(&state, BackupCommand::List).await.unwrap() {
            Output::Json(value) => value,
            Output::Text(_) => panic!("expected JSON"),
        };
        assert_eq!(listed[0]["name"], name.as_str());

        // Written after the backup, so the restore drops it
        add_product(&state, "Batería J7").await;

        run(
            &state,
            BackupCommand::Restore {
                name: Some(name),
                file: None,
            },
        )
        .await
        .unwrap();
        assert!(dir.path().join("celumax.db.pre-restore").exists());

        let reopened = AppState::open(config(dir.path())).await.unwrap();
        assert_eq!(reopened.db.products().count().await.unwrap(), 1);
        assert!(reopened
            .db
            .products()
            .get_by_name("Batería J7")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_restore_rejects_non_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(config(dir.path())).await.unwrap();
        let bogus = dir.path().join("notes.txt");
        std::fs::write(&bogus, "not a database").unwrap();

        let err = run(
            &state,
            BackupCommand::Restore {
                name: None,
                file: Some(bogus),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BackupError);
    }

    #[tokio::test]
    async fn test_restore_needs_a_file_database() {
        let state = AppState::in_memory(AppConfig::default()).await.unwrap();
        let err = run(
            &state,
            BackupCommand::Restore {
                name: Some("backup_auto_1.db".into()),
                file: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
