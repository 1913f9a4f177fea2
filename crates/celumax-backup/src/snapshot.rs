//! # Snapshots
//!
//! A snapshot is a single self-contained SQLite file written with
//! `VACUUM INTO` after a WAL checkpoint, so no `-wal`/`-shm` sidecars are
//! needed to open it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use celumax_db::Database;
use tracing::{debug, info};

use crate::error::BackupResult;

/// Extension of every snapshot file.
pub const SNAPSHOT_EXTENSION: &str = "db";

/// A snapshot file waiting to be handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// `<prefix>_<unix millis>.db`
pub fn snapshot_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{prefix}_{}.{SNAPSHOT_EXTENSION}", at.timestamp_millis())
}

/// Reads the timestamp back out of a name built by [`snapshot_name`].
pub fn parse_snapshot_name(prefix: &str, name: &str) -> Option<DateTime<Utc>> {
    let millis = name
        .strip_prefix(prefix)?
        .strip_prefix('_')?
        .strip_suffix(SNAPSHOT_EXTENSION)?
        .strip_suffix('.')?;
    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Utc.timestamp_millis_opt(millis.parse().ok()?).single()
}

/// Writes a snapshot of `db` into `dir`.
pub async fn create_snapshot(db: &Database, dir: &Path, prefix: &str) -> BackupResult<Snapshot> {
    std::fs::create_dir_all(dir)?;

    let created_at = Utc::now();
    let name = snapshot_name(prefix, created_at);
    let path = dir.join(&name);

    debug!(path = %path.display(), "Creating snapshot");
    db.snapshot_to(&path).await?;

    let size_bytes = std::fs::metadata(&path)?.len();
    info!(name = %name, size_bytes, "Snapshot created");

    Ok(Snapshot {
        name,
        path,
        size_bytes,
        created_at,
    })
}
