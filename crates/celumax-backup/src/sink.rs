//! # Backup Sinks
//!
//! Where finished snapshots go.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Snapshot (staging dir)                                                 │
//! │       │  store(path, name)                                              │
//! │       ▼                                                                 │
//! │  ┌─────────────────────┐      list()   newest first                     │
//! │  │  dyn BackupSink     │ ───► fetch()  copy one back for restore        │
//! │  │  DirectorySink      │      prune()  keep the newest N                │
//! │  └─────────────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sinks are synchronous; async callers go through `spawn_blocking`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{BackupError, BackupResult};
use crate::snapshot::parse_snapshot_name;

/// One stored backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    pub name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Destination for backups.
pub trait BackupSink: Send + Sync {
    /// Short label for logs.
    fn label(&self) -> String;

    /// Copies `snapshot` into the sink under `name`.
    fn store(&self, snapshot: &Path, name: &str) -> BackupResult<BackupEntry>;

    /// Stored backups, newest first.
    fn list(&self) -> BackupResult<Vec<BackupEntry>>;

    /// Copies the backup called `name` to `dest`.
    fn fetch(&self, name: &str, dest: &Path) -> BackupResult<()>;

    /// Deletes all but the newest `keep_last` backups; returns the removed names.
    fn prune(&self, keep_last: usize) -> BackupResult<Vec<String>> {
        let mut removed = Vec::new();
        for entry in self.list()?.into_iter().skip(keep_last) {
            self.remove(&entry.name)?;
            removed.push(entry.name);
        }
        Ok(removed)
    }

    fn remove(&self, name: &str) -> BackupResult<()>;
}

// =============================================================================
// Directory Sink
// =============================================================================

/// Keeps backups as plain files in a local directory.
///
/// Only files named `<prefix>_<millis>.db` are considered backups; anything
/// else in the directory is left alone.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    prefix: String,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        DirectorySink {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> BackupResult<PathBuf> {
        let plain = !name.is_empty()
            && !name.contains(|c: char| c == '/' || c == '\\')
            && name != "."
            && name != "..";
        if !plain {
            return Err(BackupError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

impl BackupSink for DirectorySink {
    fn label(&self) -> String {
        format!("dir:{}", self.root.display())
    }

    fn store(&self, snapshot: &Path, name: &str) -> BackupResult<BackupEntry> {
        let created_at = parse_snapshot_name(&self.prefix, name)
            .ok_or_else(|| BackupError::InvalidName(name.to_string()))?;
        let target = self.path_of(name)?;

        fs::create_dir_all(&self.root)?;
        let size_bytes = fs::copy(snapshot, &target)?;

        info!(target = %target.display(), size_bytes, "Backup stored");
        Ok(BackupEntry {
            name: name.to_string(),
            size_bytes,
            created_at,
        })
    }

    fn list(&self) -> BackupResult<Vec<BackupEntry>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for item in fs::read_dir(&self.root)? {
            let item = item?;
            let name = item.file_name().to_string_lossy().into_owned();
            let Some(created_at) = parse_snapshot_name(&self.prefix, &name) else {
                continue;
            };
            let metadata = item.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(BackupEntry {
                name,
                size_bytes: metadata.len(),
                created_at,
            });
        }

        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        debug!(count = entries.len(), root = %self.root.display(), "Listed backups");
        Ok(entries)
    }

    fn fetch(&self, name: &str, dest: &Path) -> BackupResult<()> {
        let source = self.path_of(name)?;
        if !source.is_file() {
            return Err(BackupError::BackupNotFound(name.to_string()));
        }
        fs::copy(&source, dest)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> BackupResult<()> {
        let path = self.path_of(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Backup removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(name = %name, "Backup already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::snapshot_name;
    use chrono::TimeZone;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).single().unwrap()
    }

    fn seed(sink: &DirectorySink, staging: &Path, millis: &[i64]) {
        let source = staging.join("source.db");
        fs::write(&source, b"SQLite format 3\0payload").unwrap();
        for &m in millis {
            sink.store(&source, &snapshot_name("backup_auto", at(m))).unwrap();
        }
    }

    #[test]
    fn test_store_and_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("backups"), "backup_auto");
        assert!(sink.list().unwrap().is_empty());

        seed(&sink, dir.path(), &[2_000, 1_000, 3_000]);
        fs::write(sink.root().join("notes.txt"), b"keep me").unwrap();

        let names: Vec<_> = sink.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            vec![
                "backup_auto_3000.db",
                "backup_auto_2000.db",
                "backup_auto_1000.db"
            ]
        );
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("backups"), "backup_auto");
        seed(&sink, dir.path(), &[1_000, 2_000, 3_000, 4_000]);
        fs::write(sink.root().join("notes.txt"), b"keep me").unwrap();

        let removed = sink.prune(2).unwrap();
        assert_eq!(removed, vec!["backup_auto_2000.db", "backup_auto_1000.db"]);
        assert_eq!(sink.list().unwrap().len(), 2);
        assert!(sink.root().join("notes.txt").exists());

        assert!(sink.prune(5).unwrap().is_empty());
    }

    #[test]
    fn test_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("backups"), "backup_auto");
        seed(&sink, dir.path(), &[1_000]);

        let dest = dir.path().join("fetched.db");
        sink.fetch("backup_auto_1000.db", &dest).unwrap();
        assert!(fs::read(&dest).unwrap().starts_with(b"SQLite format 3\0"));

        assert!(matches!(
            sink.fetch("backup_auto_9000.db", &dest),
            Err(BackupError::BackupNotFound(_))
        ));
        assert!(matches!(
            sink.fetch("../shop.db", &dest),
            Err(BackupError::InvalidName(_))
        ));
    }

    #[test]
    fn test_store_rejects_foreign_names() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path(), "backup_auto");
        let source = dir.path().join("source.db");
        fs::write(&source, b"x").unwrap();
        assert!(sink.store(&source, "other.db").is_err());
    }
}
