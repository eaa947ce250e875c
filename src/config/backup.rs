//! Bounded backup rotation for configuration files.
//!
//! Backups of `<dir>/<name>` live in `<dir>/.opencode-backups/` as
//! `<name>.backup.<timestamp>`, where the timestamp is UTC RFC 3339 with
//! microsecond precision and `:`/`.` replaced by `-`. After each copy the
//! set is pruned to the newest `retention` files by modification time.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, ServerError};

/// Hidden directory beside the config file holding its backups.
pub const BACKUP_DIR_NAME: &str = ".opencode-backups";

/// Number of backups kept per file by default.
pub const DEFAULT_BACKUP_RETENTION: usize = 5;

const BACKUP_MARKER: &str = ".backup.";

/// One backup file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    pub name: String,
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

/// Creates and prunes backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupRotator {
    retention: usize,
}

impl Default for BackupRotator {
    fn default() -> Self {
        Self::new(DEFAULT_BACKUP_RETENTION)
    }
}

impl BackupRotator {
    /// Create a rotator keeping `retention` backups. At least one is kept.
    #[must_use]
    pub fn new(retention: usize) -> Self {
        Self {
            retention: retention.max(1),
        }
    }

    #[must_use]
    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Directory holding backups of `target`.
    #[must_use]
    pub fn backup_dir(target: &Path) -> PathBuf {
        target
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(BACKUP_DIR_NAME)
    }

    /// Copy `target` into the backup directory, then prune old backups.
    ///
    /// Pruning failures are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory cannot be created or the
    /// copy fails.
    pub async fn rotate(&self, target: &Path) -> Result<PathBuf> {
        let file_name = file_name_of(target)?;
        let dir = Self::backup_dir(target);
        tokio::fs::create_dir_all(&dir).await?;

        let backup_path = unique_backup_path(&dir, &file_name, Utc::now()).await;
        tokio::fs::copy(target, &backup_path).await?;
        info!("Backed up {} to {}", target.display(), backup_path.display());

        self.prune_quietly(&dir, &file_name).await;
        Ok(backup_path)
    }

    /// Backups of `target`, newest first. A missing directory yields none.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory exists but cannot be read.
    pub async fn list(target: &Path) -> Result<Vec<BackupEntry>> {
        let file_name = file_name_of(target)?;
        let dir = Self::backup_dir(target);
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut entries = scan(&dir, &file_name).await?;
        sort_newest_first(&mut entries);
        Ok(entries
            .into_iter()
            .map(|(name, path, modified)| BackupEntry {
                name,
                path,
                modified: DateTime::<Utc>::from(modified),
            })
            .collect())
    }

    /// Prune, logging any failure. Returns the number of backups removed.
    async fn prune_quietly(&self, dir: &Path, file_name: &str) -> usize {
        match self.prune(dir, file_name).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Failed to prune backups in {}: {}", dir.display(), e);
                0
            }
        }
    }

    async fn prune(&self, dir: &Path, file_name: &str) -> Result<usize> {
        let mut entries = scan(dir, file_name).await?;
        sort_newest_first(&mut entries);

        let mut removed = 0;
        for (name, path, _) in entries.into_iter().skip(self.retention) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Removed old backup {}", name);
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove old backup {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }
}

fn file_name_of(target: &Path) -> Result<String> {
    target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ServerError::invalid_argument("path", format!("{} has no file name", target.display()))
        })
}

/// Timestamp suffix with filesystem-unsafe characters replaced.
fn timestamp_suffix(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
        .replace([':', '.'], "-")
}

async fn unique_backup_path(dir: &Path, file_name: &str, now: DateTime<Utc>) -> PathBuf {
    let base = format!("{}{}{}", file_name, BACKUP_MARKER, timestamp_suffix(now));
    let mut candidate = dir.join(&base);
    let mut n = 1;
    while tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        candidate = dir.join(format!("{}-{}", base, n));
        n += 1;
    }
    candidate
}

async fn scan(dir: &Path, file_name: &str) -> Result<Vec<(String, PathBuf, SystemTime)>> {
    let prefix = format!("{}{}", file_name, BACKUP_MARKER);
    let mut found = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&prefix) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        found.push((name, entry.path(), modified));
    }
    Ok(found)
}

fn sort_newest_first(entries: &mut [(String, PathBuf, SystemTime)]) {
    // Names embed the creation time, so they break mtime ties
    entries.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| b.0.cmp(&a.0)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("opencode.json");
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();
        path
    }

    #[test]
    fn test_timestamp_suffix_is_filesystem_safe() {
        let t = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(timestamp_suffix(t), "2025-03-04T05-06-07-000000Z");
    }

    #[test]
    fn test_zero_retention_keeps_one() {
        assert_eq!(BackupRotator::new(0).retention(), 1);
    }

    #[tokio::test]
    async fn test_rotate_copies_into_hidden_dir() {
        let dir = TempDir::new().unwrap();
        let target = config_in(&dir);

        let backup = BackupRotator::default().rotate(&target).await.unwrap();

        assert_eq!(backup.parent().unwrap(), dir.path().join(BACKUP_DIR_NAME));
        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("opencode.json.backup."));
        assert_eq!(
            std::fs::read_to_string(&backup).unwrap(),
            r#"{"theme": "dark"}"#
        );
    }

    #[tokio::test]
    async fn test_same_instant_backups_get_unique_names() {
        let dir = TempDir::new().unwrap();
        let backups = dir.path().join(BACKUP_DIR_NAME);
        std::fs::create_dir_all(&backups).unwrap();
        let now = Utc::now();

        let first = unique_backup_path(&backups, "opencode.json", now).await;
        std::fs::write(&first, "{}").unwrap();
        let second = unique_backup_path(&backups, "opencode.json", now).await;

        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("-1"));
    }

    #[tokio::test]
    async fn test_retention_keeps_newest() {
        let dir = TempDir::new().unwrap();
        let target = config_in(&dir);
        let rotator = BackupRotator::new(5);

        let mut created = Vec::new();
        for i in 0..8 {
            std::fs::write(&target, format!(r#"{{"n": {}}}"#, i)).unwrap();
            created.push(rotator.rotate(&target).await.unwrap());
        }

        let listed = BackupRotator::list(&target).await.unwrap();
        assert_eq!(listed.len(), 5);

        let newest: Vec<PathBuf> = created.iter().rev().take(5).cloned().collect();
        let listed_paths: Vec<PathBuf> = listed.iter().map(|e| e.path.clone()).collect();
        assert_eq!(listed_paths, newest);
    }

    #[tokio::test]
    async fn test_fewer_writes_than_retention() {
        let dir = TempDir::new().unwrap();
        let target = config_in(&dir);
        let rotator = BackupRotator::new(5);

        rotator.rotate(&target).await.unwrap();
        rotator.rotate(&target).await.unwrap();

        assert_eq!(BackupRotator::list(&target).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_other_files_are_left_alone() {
        let dir = TempDir::new().unwrap();
        let target = config_in(&dir);
        let backups = dir.path().join(BACKUP_DIR_NAME);
        std::fs::create_dir_all(&backups).unwrap();
        std::fs::write(backups.join("notes.txt"), "keep").unwrap();
        std::fs::write(backups.join("opencode.jsonc.backup.old"), "{}").unwrap();

        let rotator = BackupRotator::new(1);
        rotator.rotate(&target).await.unwrap();
        rotator.rotate(&target).await.unwrap();

        assert!(backups.join("notes.txt").exists());
        assert!(backups.join("opencode.jsonc.backup.old").exists());
        assert_eq!(BackupRotator::list(&target).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_prune_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        // A regular file where the backup directory should be
        let not_a_dir = config_in(&dir);
        let rotator = BackupRotator::new(1);

        assert!(rotator.prune(&not_a_dir, "opencode.json").await.is_err());
        assert_eq!(rotator.prune_quietly(&not_a_dir, "opencode.json").await, 0);
    }

    #[tokio::test]
    async fn test_prune_reports_removed_count() {
        let dir = TempDir::new().unwrap();
        let target = config_in(&dir);
        let backups = dir.path().join(BACKUP_DIR_NAME);
        std::fs::create_dir_all(&backups).unwrap();
        for i in 0..3 {
            std::fs::write(backups.join(format!("opencode.json.backup.{}", i)), "{}").unwrap();
        }

        let removed = BackupRotator::new(1)
            .prune_quietly(&backups, "opencode.json")
            .await;
        assert_eq!(removed, 2);
        assert_eq!(BackupRotator::list(&target).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_without_backup_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("opencode.json");
        assert!(BackupRotator::list(&target).await.unwrap().is_empty());
    }
}
