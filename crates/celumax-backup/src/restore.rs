//! # Restore
//!
//! Replaces the live database file with a backup.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. backup starts with "SQLite format 3\0"   else NotASqliteFile        │
//! │  2. celumax.db → celumax.db.pre-restore      (if the database exists)   │
//! │  3. backup     → celumax.db                                             │
//! │  4. rm celumax.db-wal celumax.db-shm         (stale sidecars)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The caller must close every connection to the database first
//! ([`Database::close`](celumax_db::Database::close)) and reopen it after.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{BackupError, BackupResult};
use crate::sink::BackupSink;

/// First 16 bytes of every SQLite 3 database file.
pub const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// What a restore did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub database: PathBuf,
    pub restored_from: String,
    /// Copy of the database as it was before the restore.
    pub pre_restore: Option<PathBuf>,
}

/// Checks the SQLite header of `path`.
pub fn is_sqlite_file(path: &Path) -> BackupResult<bool> {
    let mut header = [0u8; 16];
    let mut file = File::open(path)?;
    match file.read_exact(&mut header) {
        Ok(()) => Ok(&header == SQLITE_MAGIC),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// `celumax.db` → `celumax.db<suffix>`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

pub fn pre_restore_path(db_path: &Path) -> PathBuf {
    with_suffix(db_path, ".pre-restore")
}

/// Copies `backup` over `db_path`.
pub fn restore_file(backup: &Path, db_path: &Path) -> BackupResult<RestoreReport> {
    if !backup.is_file() {
        return Err(BackupError::BackupNotFound(backup.display().to_string()));
    }
    if !is_sqlite_file(backup)? {
        return Err(BackupError::NotASqliteFile(backup.to_path_buf()));
    }

    let pre_restore = if db_path.exists() {
        let copy = pre_restore_path(db_path);
        fs::copy(db_path, &copy)?;
        Some(copy)
    } else {
        None
    };

    fs::copy(backup, db_path)?;

    for suffix in ["-wal", "-shm"] {
        let sidecar = with_suffix(db_path, suffix);
        match fs::remove_file(&sidecar) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %sidecar.display(), error = %e, "Could not remove sidecar"),
        }
    }

    info!(
        database = %db_path.display(),
        backup = %backup.display(),
        "Database restored"
    );

    Ok(RestoreReport {
        database: db_path.to_path_buf(),
        restored_from: backup.display().to_string(),
        pre_restore,
    })
}

/// Fetches `name` from `sink` and restores it over `db_path`.
pub fn restore_from_sink(
    sink: &dyn BackupSink,
    name: &str,
    db_path: &Path,
) -> BackupResult<RestoreReport> {
    let staging = tempfile::Builder::new()
        .prefix("celumax-restore")
        .tempdir()?;
    let fetched = staging.path().join("fetched.db");
    sink.fetch(name, &fetched)?;

    let mut report = restore_file(&fetched, db_path)?;
    report.restored_from = name.to_string();
    Ok(report)
}
