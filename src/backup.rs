//! Backup management: point-in-time copies of the database file.
//!
//! Automatic backups are taken at most once per day and rotated. Manual backups are taken on
//! request and kept until the user removes them.

use crate::error::Context;
use crate::{utils, Config, Db, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix for automatic backup files.
pub const AUTO: &str = "auto";

/// Prefix for manual backup files.
pub const MANUAL: &str = "manual";

/// Extension of the live database and of every backup of it.
pub const EXTENSION: &str = "db";

/// Suffix of a backup that is still being written.
const PARTIAL: &str = ".partial";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    Auto,
    Manual,
}

serde_plain::derive_display_from_serialize!(BackupKind);

/// A backup file found in one of the backup directories.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct BackupFile {
    pub kind: BackupKind,
    pub name: String,
    pub path: PathBuf,
    pub modified: DateTime<Local>,
    pub size: u64,
}

/// Manages backup file creation, rotation and listing.
///
/// The `Backup` struct is immutable and owns copies of the paths and settings it needs.
/// Create a new instance via `Config::backup()` or `Backup::new()`.
#[derive(Debug, Clone)]
pub struct Backup {
    auto_dir: PathBuf,
    manual_dir: PathBuf,
    backup_copies: u32,
    auto_enabled: bool,
}

impl Backup {
    /// Creates a new `Backup` instance from a `Config`.
    pub fn new(config: &Config) -> Self {
        Self {
            auto_dir: config.auto_backups().to_path_buf(),
            manual_dir: config.manual_backups().to_path_buf(),
            backup_copies: config.backup_copies(),
            auto_enabled: config.auto_backup(),
        }
    }

    /// Copies the live database into the manual backups directory.
    ///
    /// The filename format is `manual.YYYY-MM-DD-HHMMSS-NNN.db`. Manual backups are not rotated.
    ///
    /// Returns the path to the created backup file.
    pub async fn create_manual(&self, db: &Db) -> Result<PathBuf> {
        let stamp = Local::now().format("%Y-%m-%d-%H%M%S").to_string();
        let seq = next_sequence_number(&self.manual_dir, MANUAL, &stamp, EXTENSION).await?;
        let path = self
            .manual_dir
            .join(format!("{MANUAL}.{stamp}-{seq:03}.{EXTENSION}"));
        snapshot(db, &path).await?;
        info!("Created backup {}", path.display());
        Ok(path)
    }

    /// Copies the live database into the automatic backups directory unless one was already
    /// taken today or automatic backups are disabled.
    ///
    /// The filename format is `auto.YYYY-MM-DD-NNN.db`. Automatically rotates old backups,
    /// keeping only `backup_copies` files.
    ///
    /// Returns the path to the created backup file, if one was created.
    pub async fn create_auto(&self, db: &Db) -> Result<Option<PathBuf>> {
        if !self.auto_enabled {
            debug!("Automatic backups are disabled");
            return Ok(None);
        }
        let date = today();
        let seq = next_sequence_number(&self.auto_dir, AUTO, &date, EXTENSION).await?;
        if seq > 1 {
            debug!("An automatic backup was already taken on {date}");
            return Ok(None);
        }
        let path = self
            .auto_dir
            .join(format!("{AUTO}.{date}-{seq:03}.{EXTENSION}"));
        snapshot(db, &path).await?;
        debug!("Created automatic backup {}", path.display());

        self.rotate(AUTO, EXTENSION).await?;

        Ok(Some(path))
    }

    /// Lists the backups of both kinds, newest first.
    pub async fn list(&self) -> Result<Vec<BackupFile>> {
        let mut files = list_dir(&self.auto_dir, BackupKind::Auto).await?;
        files.extend(list_dir(&self.manual_dir, BackupKind::Manual).await?);
        files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
        Ok(files)
    }

    /// Rotates old automatic backup files, keeping only `backup_copies` files with the given
    /// prefix.
    async fn rotate(&self, prefix: &str, extension: &str) -> Result<()> {
        let mut files: Vec<(PathBuf, String)> = Vec::new();

        let mut dir = utils::read_dir(&self.auto_dir).await?;
        while let Some(entry) = next_entry(&mut dir, &self.auto_dir).await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_backup_file(&name, prefix, extension) {
                files.push((entry.path(), name));
            }
        }

        // Sort by filename (which sorts by date and sequence number due to format)
        files.sort_by(|a, b| a.1.cmp(&b.1));

        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for (path, _) in files.into_iter().take(to_delete) {
            debug!("Rotating out {}", path.display());
            utils::remove(&path).await?;
        }

        Ok(())
    }
}

/// Writes a copy of the database to `destination`. The copy is made under a temporary name and
/// renamed into place, so `destination` never names a partial file.
async fn snapshot(db: &Db, destination: &Path) -> Result<()> {
    let partial = utils::with_suffix(destination, PARTIAL);
    if let Err(e) = db.copy_file_to(&partial).await {
        if utils::exists(&partial).await.unwrap_or(false) {
            let _ = utils::remove(&partial).await;
        }
        return Err(e);
    }
    utils::rename(&partial, destination).await
}

async fn list_dir(dir: &Path, kind: BackupKind) -> Result<Vec<BackupFile>> {
    let mut files = Vec::new();
    if !utils::exists(dir).await? {
        return Ok(files);
    }
    let mut entries = utils::read_dir(dir).await?;
    while let Some(entry) = next_entry(&mut entries, dir).await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            continue;
        }
        let metadata = tokio::fs::metadata(&path).await;
        let Ok(metadata) = metadata else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata
            .modified()
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());
        files.push(BackupFile {
            kind,
            name: entry.file_name().to_string_lossy().to_string(),
            path,
            modified,
            size: metadata.len(),
        });
    }
    Ok(files)
}

async fn next_entry(
    dir: &mut tokio::fs::ReadDir,
    path: &Path,
) -> Result<Option<tokio::fs::DirEntry>> {
    dir.next_entry()
        .await
        .with_context(|| format!("Failed to read directory entry in '{}'", path.display()))
}

/// Scans `dir` for existing files with the given prefix and date, and returns the next sequence
/// number.
pub(crate) async fn next_sequence_number(
    dir: &Path,
    prefix: &str,
    date: &str,
    extension: &str,
) -> Result<u32> {
    let pattern_start = format!("{prefix}.{date}-");
    let mut max_seq: u32 = 0;

    let mut entries = utils::read_dir(dir).await?;
    while let Some(entry) = next_entry(&mut entries, dir).await? {
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        if name.starts_with(&pattern_start) {
            if let Some(seq) = parse_sequence_number(&name, prefix, date, extension) {
                max_seq = max_seq.max(seq);
            }
        }
    }

    Ok(max_seq + 1)
}

/// Returns today's date in YYYY-MM-DD format.
pub(crate) fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses the sequence number from a backup filename.
/// Returns None if the filename doesn't match the expected pattern.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str, extension: &str) -> Option<u32> {
    // Pattern: {prefix}.{date}-{NNN}.{ext} or {prefix}.{date}-{NNN} (no extension)
    let expected_start = format!("{prefix}.{date}-");
    let remainder = filename.strip_prefix(&expected_start)?;

    let seq_str = if extension.is_empty() {
        remainder
    } else {
        let expected_suffix = format!(".{extension}");
        remainder.strip_suffix(&expected_suffix)?
    };

    seq_str.parse().ok()
}

/// Checks if a filename is a backup file with the given prefix and extension.
fn is_backup_file(filename: &str, prefix: &str, extension: &str) -> bool {
    filename.starts_with(&format!("{prefix}.")) && filename.ends_with(&format!(".{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, DailyRecord};
    use crate::test::TestEnv;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number("auto.2025-12-14-001.db", "auto", "2025-12-14", "db"),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number(
                "manual.2025-12-14-093000-042.db",
                "manual",
                "2025-12-14-093000",
                "db"
            ),
            Some(42)
        );
        assert_eq!(
            parse_sequence_number(
                "tillbook.db.previous.2025-12-14-003",
                "tillbook.db.previous",
                "2025-12-14",
                ""
            ),
            Some(3)
        );
        // Wrong prefix
        assert_eq!(
            parse_sequence_number("manual.2025-12-14-001.db", "auto", "2025-12-14", "db"),
            None
        );
        // Wrong date
        assert_eq!(
            parse_sequence_number("auto.2025-12-13-001.db", "auto", "2025-12-14", "db"),
            None
        );
        // Still being written
        assert_eq!(
            parse_sequence_number("auto.2025-12-14-001.db.partial", "auto", "2025-12-14", "db"),
            None
        );
    }

    #[test]
    fn test_is_backup_file() {
        assert!(is_backup_file("auto.2025-12-14-001.db", "auto", "db"));
        assert!(!is_backup_file("manual.2025-12-14-001.db", "auto", "db"));
        assert!(!is_backup_file("auto.2025-12-14-001.db.partial", "auto", "db"));
    }

    #[tokio::test]
    async fn test_manual_backup_is_byte_identical() {
        let env = TestEnv::new().await;
        let db = env.db();
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        db.save_daily_record(&DailyRecord::new(
            date,
            Amount::cents(50000),
            Amount::cents(20000),
            Amount::cents(30000),
            Amount::cents(35000),
        ))
        .await
        .unwrap();

        let path = env.config().backup().create_manual(&db).await.unwrap();
        assert!(path.starts_with(env.config().manual_backups()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("manual.") && name.ends_with("-001.db"));

        let live = tokio::fs::read(db.path()).await.unwrap();
        let copy = tokio::fs::read(&path).await.unwrap();
        assert_eq!(live, copy);

        // The copy is a working database with the same contents
        let restored = Db::load(&path).await.unwrap();
        assert!(restored.get_daily_record(date).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_two_manual_backups_do_not_collide() {
        let env = TestEnv::new().await;
        let backup = env.config().backup();
        let a = backup.create_manual(&env.db()).await.unwrap();
        let b = backup.create_manual(&env.db()).await.unwrap();
        assert_ne!(a, b);
        assert!(a.is_file() && b.is_file());
    }

    #[tokio::test]
    async fn test_auto_backup_once_per_day() {
        let env = TestEnv::new().await;
        let backup = env.config().backup();
        let first = backup.create_auto(&env.db()).await.unwrap();
        assert!(first.is_some());
        let second = backup.create_auto(&env.db()).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_rotation_keeps_backup_copies() {
        let env = TestEnv::new().await;
        let config = env.config();
        let dir = config.auto_backups();
        for day in 1..=7 {
            let name = format!("auto.2020-01-{day:02}-001.db");
            utils::write(dir.join(name), "x").await.unwrap();
        }
        config.backup().create_auto(&env.db()).await.unwrap();

        let list = config.backup().list().await.unwrap();
        let autos: Vec<_> = list
            .iter()
            .filter(|f| f.kind == BackupKind::Auto)
            .collect();
        assert_eq!(autos.len(), config.backup_copies() as usize);
        // The oldest ones went first
        assert!(!dir.join("auto.2020-01-01-001.db").exists());
        assert!(dir.join("auto.2020-01-07-001.db").exists());
    }

    #[tokio::test]
    async fn test_list_finds_both_kinds() {
        let env = TestEnv::new().await;
        let backup = env.config().backup();
        backup.create_auto(&env.db()).await.unwrap();
        backup.create_manual(&env.db()).await.unwrap();
        utils::write(env.config().manual_backups().join("notes.txt"), "x")
            .await
            .unwrap();

        let list = backup.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().any(|f| f.kind == BackupKind::Auto));
        assert!(list.iter().any(|f| f.kind == BackupKind::Manual));
        assert!(list.iter().all(|f| f.size > 0));
    }

    #[tokio::test]
    async fn test_backup_of_retired_handle_fails() {
        let env = TestEnv::new().await;
        let db = env.db();
        db.retire().await.unwrap();
        let err = env.config().backup().create_manual(&db).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Conflict);
        let names: Vec<_> = std::fs::read_dir(env.config().manual_backups())
            .unwrap()
            .collect();
        assert!(names.is_empty());
    }

    async fn integrity(path: &Path) -> (String, i64) {
        let copy = Db::load(path).await.unwrap();
        let check: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(copy.pool())
            .await
            .unwrap();
        let days: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_records")
            .fetch_one(copy.pool())
            .await
            .unwrap();
        copy.close().await;
        (check, days)
    }

    fn takings(day: u32) -> DailyRecord {
        DailyRecord::new(
            NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            Amount::cents(50000),
            Amount::cents(20000),
            Amount::cents(30000),
            Amount::cents(35000),
        )
    }

    #[tokio::test]
    async fn test_backup_waits_for_row_write() {
        let env = TestEnv::new().await;
        let db = env.db();
        let backup = env.config().backup();

        let write = db.write_access().await.unwrap();
        let task = tokio::spawn({
            let db = db.clone();
            let backup = backup.clone();
            async move { backup.create_manual(&db).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(!task.is_finished());
        let written: Vec<_> = std::fs::read_dir(env.config().manual_backups())
            .unwrap()
            .collect();
        assert!(written.is_empty());

        drop(write);
        let path = task.await.unwrap().unwrap();
        assert_eq!(integrity(&path).await.0, "ok");
    }

    #[tokio::test]
    async fn test_backups_during_writes_are_consistent() {
        let env = TestEnv::new().await;
        let db = env.db();
        let backup = env.config().backup();

        let writer = tokio::spawn({
            let db = db.clone();
            async move {
                for day in 1..=28 {
                    db.save_daily_record(&takings(day)).await.unwrap();
                    tokio::task::yield_now().await;
                }
            }
        });
        let mut paths = Vec::new();
        for _ in 0..5 {
            paths.push(backup.create_manual(&db).await.unwrap());
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();

        let mut last = 0;
        for path in &paths {
            let (check, days) = integrity(path).await;
            assert_eq!(check, "ok");
            // Each snapshot holds whole writes, and later ones never hold fewer
            assert!((0..=28).contains(&days));
            assert!(days >= last);
            last = days;
        }
    }
}
