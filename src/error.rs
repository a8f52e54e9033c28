//! The classified error type returned by every public operation.
//!
//! Failures fall into four classes (see [`ErrorKind`]). Restore failures additionally say whether
//! the live database is still intact, because that decides what the user is told.

use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// The class of a failure, as seen by a caller deciding what to do next.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// A referenced id, date, period or file does not exist.
    NotFound,
    /// A required field is missing or a value could not be parsed or is out of range.
    Validation,
    /// The filesystem or database could not be read or written.
    Io,
    /// Another file-level operation is in progress, or the handle was retired by a restore.
    Conflict,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Database {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("The database handle was retired by a restore and must be reopened")]
    Retired,

    /// The only failure after which the live database path may be empty or wrong.
    #[error(
        "Restore failed and could not be rolled back, the previous database is at '{}' and the \
        backup that was being restored is at '{}': {source}",
        previous.display(),
        staged.display()
    )]
    RestoreIncomplete {
        previous: PathBuf,
        staged: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, key: impl Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Io { .. } | Error::Database { .. } | Error::RestoreIncomplete { .. } => {
                ErrorKind::Io
            }
            Error::Conflict(_) | Error::Retired => ErrorKind::Conflict,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns `false` only when a restore left the live database missing or unverified. Every
    /// other error, including other restore failures, leaves the live database as it was.
    pub fn live_database_intact(&self) -> bool {
        !matches!(self, Error::RestoreIncomplete { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attaches a human-readable context to I/O and database failures, in the manner of
/// `anyhow::Context`.
pub(crate) trait Context<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> Context<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|source| Error::Io {
            context: context.into(),
            source,
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| Error::Io {
            context: f().into(),
            source,
        })
    }
}

impl<T> Context<T> for std::result::Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|source| Error::Database {
            context: context.into(),
            source,
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| Error::Database {
            context: f().into(),
            source,
        })
    }
}
