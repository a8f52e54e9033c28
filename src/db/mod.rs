//! This module is responsible for reading, writing and managing the SQLite database.
//!
//! A `Db` is an explicitly owned handle. Clones share one connection pool and one gate:
//! - row writes and file copies of the database are serialized by the gate's writer lock, so a
//!   backup can never capture a half-applied write
//! - a restore takes the gate exclusively (failing fast if anything is in flight) and retires
//!   it, after which every clone refuses further operations and a new `Db` must be opened

mod daily;
mod expenses;
mod migrations;
mod periods;

use crate::error::Context;
use crate::model::Amount;
use crate::{utils, Error, Result};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use tracing::{debug, info};

/// The schema version this build reads and writes.
const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
    pool: SqlitePool,
    gate: Arc<Gate>,
}

#[derive(Debug, Default)]
struct Gate {
    /// Held shared by every operation and exclusively by a restore. `true` once retired.
    file: RwLock<bool>,
    /// Serializes row writes against each other and against file copies.
    writer: Mutex<()>,
}

/// Held for the duration of a row write or a file copy.
pub(crate) struct WriteAccess<'a> {
    _file: RwLockReadGuard<'a, bool>,
    _writer: MutexGuard<'a, ()>,
}

impl Db {
    /// - Validates that there is a SQLite file at `path`
    /// - Creates a SQLite client
    /// - Updates the database schema with migrations if it is out-of-date
    /// - Returns a constructed `Db` object for further operations
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !utils::exists(path).await? {
            return Err(Error::not_found("Database", path.display()));
        }
        Self::open(path, false).await
    }

    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    /// - Returns a constructed `Db` object for further operations
    pub async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if utils::exists(path).await? {
            return Err(Error::Conflict(format!(
                "A database already exists at '{}'",
                path.display()
            )));
        }
        Self::open(path, true).await
    }

    /// Opens a fresh handle to the same file. This is how a process picks up a restored database.
    pub async fn reopen(&self) -> Result<Self> {
        Self::load(&self.path).await
    }

    async fn open(path: &Path, create: bool) -> Result<Self> {
        // Rollback-journal mode keeps every committed write in the main file, which is what
        // makes a plain file copy a complete snapshot.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Delete)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Unable to open SQLite database '{}'", path.display()))?;

        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .context("Failed to create schema_version table")?;

        let current: Option<i32> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(&pool)
            .await
            .context("Failed to query schema version")?;
        let current = current.unwrap_or(0);

        if current > SCHEMA_VERSION {
            pool.close().await;
            return Err(Error::validation(format!(
                "Database '{}' has schema version {current}, newer than the supported version \
                {SCHEMA_VERSION}",
                path.display()
            )));
        }
        migrations::run(&pool, current, SCHEMA_VERSION).await?;

        debug!("Opened database {} at schema version {SCHEMA_VERSION}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            pool,
            gate: Arc::new(Gate::default()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the connection pool. Clones of this handle are closed too.
    pub async fn close(self) {
        self.pool.close().await;
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Shared access for a read. Fails if the handle has been retired.
    pub(crate) async fn read_access(&self) -> Result<RwLockReadGuard<'_, bool>> {
        let file = self.gate.file.read().await;
        if *file {
            return Err(Error::Retired);
        }
        Ok(file)
    }

    /// Exclusive-among-writers access for a row write or a file copy.
    pub(crate) async fn write_access(&self) -> Result<WriteAccess<'_>> {
        let file = self.read_access().await?;
        let writer = self.gate.writer.lock().await;
        Ok(WriteAccess {
            _file: file,
            _writer: writer,
        })
    }

    /// Copies the database file to `destination` while no row write is in flight.
    pub(crate) async fn copy_file_to(&self, destination: &Path) -> Result<u64> {
        let _access = self.write_access().await?;
        utils::copy(&self.path, destination).await
    }

    /// Permanently retires this handle and all of its clones, then closes the pool. Fails with a
    /// conflict, and leaves the handle usable, if any operation is in flight.
    pub(crate) async fn retire(&self) -> Result<()> {
        let mut retired = self.gate.file.try_write().map_err(|_| {
            Error::Conflict("Another database operation is in progress".to_string())
        })?;
        if *retired {
            return Err(Error::Retired);
        }
        *retired = true;
        drop(retired);
        self.pool.close().await;
        info!("Retired the database handle for {}", self.path.display());
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn hold_read_for_test(&self) -> RwLockReadGuard<'_, bool> {
        self.gate.file.read().await
    }
}

// Column encodings, stated once. Booleans are INTEGER 0/1, amounts are TEXT with exactly two
// fractional digits, dates are TEXT `YYYY-MM-DD`, periods are TEXT `YYYY-MM`.

pub(crate) fn encode_bool(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn decode_bool(column: &str, value: i64) -> Result<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::validation(format!(
            "Column '{column}' holds {other}, expected 0 or 1"
        ))),
    }
}

pub(crate) fn encode_amount(value: Amount) -> String {
    value.to_string()
}

pub(crate) fn decode_amount(column: &str, value: &str) -> Result<Amount> {
    Amount::from_str(value)
        .map_err(|e| Error::validation(format!("Column '{column}' holds a bad amount: {e}")))
}

const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn encode_date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub(crate) fn decode_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| Error::validation(format!("'{value}' is not a YYYY-MM-DD date: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bool_encoding() {
        assert_eq!(encode_bool(true), 1);
        assert_eq!(encode_bool(false), 0);
        assert!(decode_bool("is_paid", encode_bool(true)).unwrap());
        assert!(!decode_bool("is_paid", encode_bool(false)).unwrap());
        assert!(decode_bool("is_paid", 2).is_err());
    }

    #[test]
    fn test_amount_encoding() {
        let amount = Amount::cents(45075);
        let encoded = encode_amount(amount);
        assert_eq!(encoded, "450.75");
        assert_eq!(decode_amount("amount", &encoded).unwrap(), amount);
        assert!(decode_amount("amount", "four").is_err());
    }

    #[test]
    fn test_date_encoding() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(encode_date(date), "2026-01-05");
        assert_eq!(decode_date("2026-01-05").unwrap(), date);
        assert!(decode_date("05/01/2026").is_err());
    }

    #[tokio::test]
    async fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tillbook.db");
        let db = Db::init(&path).await.unwrap();
        db.close().await;
        assert!(path.is_file());

        // A second init refuses to clobber the file
        let err = Db::init(&path).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Conflict);

        let db = Db::load(&path).await.unwrap();
        assert_eq!(db.path(), path);
    }

    #[tokio::test]
    async fn test_load_missing() {
        let dir = TempDir::new().unwrap();
        let err = Db::load(dir.path().join("missing.db")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_load_newer_schema_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tillbook.db");
        let db = Db::init(&path).await.unwrap();
        sqlx::query("INSERT INTO schema_version (version) VALUES (99)")
            .execute(db.pool())
            .await
            .unwrap();
        db.close().await;

        let err = Db::load(&path).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_retire_blocks_clones() {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("tillbook.db")).await.unwrap();
        let clone = db.clone();
        db.retire().await.unwrap();
        assert!(matches!(clone.read_access().await, Err(Error::Retired)));
        assert!(matches!(db.retire().await, Err(Error::Retired)));
    }

    #[tokio::test]
    async fn test_retire_fails_fast_when_busy() {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("tillbook.db")).await.unwrap();
        let guard = db.hold_read_for_test().await;
        let err = db.retire().await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Conflict);
        drop(guard);
        // Still usable after the failed attempt
        assert!(db.read_access().await.is_ok());
    }
}
