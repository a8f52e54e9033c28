//! tillbook: daily till reconciliation and monthly expense bookkeeping, kept in one local SQLite
//! file with file-level backups and restore.

pub mod args;
pub mod backup;
pub mod commands;
mod config;
mod db;
mod error;
pub mod model;
pub mod prompt;
pub mod reconcile;
pub mod restore;
pub mod summary;
mod utils;


pub use config::Config;
pub use db::Db;
pub use error::{Error, ErrorKind, Result};
pub use model::Amount;
