//! Replacing the live database with a backup.
//!
//! The swap is rename based. The backup is first copied next to the live file, then the live file
//! (with any journal sidecars) is renamed to a `previous` name, and finally the staged copy is
//! renamed onto the live path. Renames within one directory are atomic, so there is no moment
//! at which a half-copied file sits at the live path. The previous file is never deleted.
//!
//! A successful restore retires the `Db` handle it was given, and all of its clones. Use
//! [`Restored::reopen`] to get a handle on the restored data.

use crate::backup::{next_sequence_number, today, EXTENSION};
use crate::error::Context;
use crate::prompt::Prompt;
use crate::{utils, Db, Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// The first 16 bytes of every SQLite database file.
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Journal files SQLite may keep next to a database. They belong to the file they sit beside.
const SIDECARS: [&str; 3] = ["-journal", "-wal", "-shm"];

/// Proof that the user agreed to a restore. A restore cannot be started without one.
#[derive(Debug)]
pub struct Confirmed(());

impl Confirmed {
    /// Asks for confirmation to restore `backup`. Returns `None` unless the answer is yes.
    pub async fn ask(prompt: &dyn Prompt, backup: &Path) -> Result<Option<Confirmed>> {
        let message = format!(
            "Restoring '{}' replaces all current data. The current database will be kept as a \
            previous copy. Continue?",
            backup.display()
        );
        Ok(prompt.confirm(&message).await?.then_some(Confirmed(())))
    }

    /// For callers where the user already confirmed up front, e.g. with `--yes`.
    pub fn assume_yes() -> Confirmed {
        Confirmed(())
    }
}

/// The outcome of a successful restore.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Restored {
    /// The backup that was restored.
    pub source: PathBuf,
    /// The live database path, now holding a copy of `source`.
    pub live: PathBuf,
    /// Where the database that was live before the restore now lives.
    pub previous: PathBuf,
}

impl Restored {
    /// Opens a handle on the restored database.
    pub async fn reopen(&self) -> Result<Db> {
        Db::load(&self.live).await
    }
}

/// Replaces the database behind `db` with a copy of `backup`.
///
/// Every error except [`Error::RestoreIncomplete`] leaves the live database as it was. Errors
/// raised after the handle was retired still require the caller to reopen it.
pub async fn restore(db: &Db, backup: &Path, _confirmed: Confirmed) -> Result<Restored> {
    let live = db.path().to_path_buf();
    verify_backup(backup, &live).await?;

    let staged = utils::with_suffix(&live, ".restoring");
    if let Err(e) = utils::copy(backup, &staged).await {
        discard(&staged).await;
        return Err(e);
    }
    debug!("Staged {} at {}", backup.display(), staged.display());

    if let Err(e) = db.retire().await {
        discard(&staged).await;
        return Err(e);
    }

    let previous = match previous_path(&live).await {
        Ok(p) => p,
        Err(e) => {
            warn!("Restore aborted before the live database was touched");
            discard(&staged).await;
            return Err(e);
        }
    };

    let moved = match set_aside(&live, &previous).await {
        Ok(moved) => moved,
        Err(e) => {
            discard(&staged).await;
            return Err(e);
        }
    };

    swap_in(&staged, &live, &previous, &moved).await?;

    info!(
        "Restored {} into {}, the previous database is at {}",
        backup.display(),
        live.display(),
        previous.display()
    );
    Ok(Restored {
        source: backup.to_path_buf(),
        live,
        previous,
    })
}

/// Checks that `backup` exists, is readable, is not the live file and looks like a database.
async fn verify_backup(backup: &Path, live: &Path) -> Result<()> {
    let metadata = match tokio::fs::metadata(backup).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::not_found("Backup", backup.display()));
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Unable to read '{}'", backup.display()));
        }
    };
    if !metadata.is_file() {
        return Err(Error::validation(format!(
            "'{}' is not a file",
            backup.display()
        )));
    }
    if backup.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
        return Err(Error::validation(format!(
            "'{}' is not a .{EXTENSION} file",
            backup.display()
        )));
    }
    if utils::canonicalize(backup).await? == utils::canonicalize(live).await? {
        return Err(Error::validation(
            "The chosen file is the live database itself",
        ));
    }

    let mut header = [0u8; 16];
    let mut file = tokio::fs::File::open(backup)
        .await
        .with_context(|| format!("Unable to open '{}'", backup.display()))?;
    let read = file.read_exact(&mut header).await;
    if read.is_err() || &header != SQLITE_HEADER {
        return Err(Error::validation(format!(
            "'{}' is not a SQLite database",
            backup.display()
        )));
    }
    Ok(())
}

/// The first unused `<live>.previous.YYYY-MM-DD-NNN` name beside the live file.
async fn previous_path(live: &Path) -> Result<PathBuf> {
    let dir = live.parent().unwrap_or_else(|| Path::new("."));
    let name = live
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| Error::validation(format!("'{}' has no file name", live.display())))?;
    let prefix = format!("{name}.previous");
    let date = today();
    let seq = next_sequence_number(dir, &prefix, &date, "").await?;
    Ok(dir.join(format!("{prefix}.{date}-{seq:03}")))
}

/// Renames the live file and its sidecars to the previous name. On failure, whatever was already
/// moved is moved back. Returns the `(from, to)` pairs that were moved.
async fn set_aside(live: &Path, previous: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut candidates = vec![(live.to_path_buf(), previous.to_path_buf())];
    for suffix in SIDECARS {
        candidates.push((
            utils::with_suffix(live, suffix),
            utils::with_suffix(previous, suffix),
        ));
    }

    let mut moved = Vec::new();
    for (i, (from, to)) in candidates.into_iter().enumerate() {
        // The database itself must exist. Sidecars usually do not.
        if i > 0 && !utils::exists(&from).await? {
            continue;
        }
        if let Err(e) = utils::rename(&from, &to).await {
            if roll_back(&moved).await.is_err() {
                warn!("Unable to undo a partial set-aside of {}", live.display());
            }
            return Err(e);
        }
        debug!("Moved {} to {}", from.display(), to.display());
        moved.push((from, to));
    }
    Ok(moved)
}

/// Renames `staged` onto `live`. If that fails, the `moved` files are put back and the staged
/// copy is removed. Only if putting them back fails too is the restore incomplete.
async fn swap_in(
    staged: &Path,
    live: &Path,
    previous: &Path,
    moved: &[(PathBuf, PathBuf)],
) -> Result<()> {
    let Err(e) = utils::rename(staged, live).await else {
        return Ok(());
    };
    let source = match e {
        Error::Io { source, .. } => source,
        other => std::io::Error::other(other.to_string()),
    };
    match roll_back(moved).await {
        Ok(()) => {
            discard(staged).await;
            Err(Error::Io {
                context: format!(
                    "Unable to move the restored file into place, the original database was put \
                    back at '{}'",
                    live.display()
                ),
                source,
            })
        }
        Err(_) => Err(Error::RestoreIncomplete {
            previous: previous.to_path_buf(),
            staged: staged.to_path_buf(),
            source,
        }),
    }
}

/// Moves every `(from, to)` pair back, last first.
async fn roll_back(moved: &[(PathBuf, PathBuf)]) -> Result<()> {
    for (from, to) in moved.iter().rev() {
        utils::rename(to, from).await?;
        debug!("Moved {} back to {}", to.display(), from.display());
    }
    Ok(())
}

/// Best-effort removal of a staged copy that will not be used.
async fn discard(path: &Path) {
    if let Ok(true) = utils::exists(path).await {
        if let Err(e) = utils::remove(path).await {
            warn!("{e}");
        }
    }
}
