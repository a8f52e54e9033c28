//! Configuration file handling for tillbook.
//!
//! The configuration file is stored at `$TILLBOOK_HOME/config.json` and contains the backup
//! settings. Everything else lives at a fixed location inside the home directory:
//!
//! ```text
//! $TILLBOOK_HOME/
//!   config.json
//!   tillbook.db
//!   backups/
//!     auto/
//!     manual/
//! ```

use crate::backup::Backup;
use crate::db::Db;
use crate::error::Context;
use crate::{utils, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const APP_NAME: &str = "tillbook";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const BACKUPS: &str = "backups";
const AUTO: &str = "auto";
const MANUAL: &str = "manual";
const CONFIG_JSON: &str = "config.json";
const DB_FILE: &str = "tillbook.db";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$TILLBOOK_HOME` and from there it loads `$TILLBOOK_HOME/config.json`. It provides
/// the paths of the database and the backup directories.
///
/// `Config` does not hold a database handle. A restore replaces the database underneath any
/// handle, so handles are opened from `db_path()` and passed around separately.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db_path: PathBuf,
    auto_backups: PathBuf,
    manual_backups: PathBuf,
}

impl Config {
    /// Creates the home directory, its subdirectories, an initial `config.json` with default
    /// settings and an empty database.
    ///
    /// # Errors
    /// - Returns a conflict if a database already exists in `dir`.
    /// - Returns an error if any file operations fail.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative).await?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let db_path = root.join(DB_FILE);
        if utils::exists(&db_path).await? {
            return Err(Error::Conflict(format!(
                "'{}' is already initialized",
                root.display()
            )));
        }

        let auto_backups = root.join(BACKUPS).join(AUTO);
        utils::make_dir(&auto_backups).await?;
        let manual_backups = root.join(BACKUPS).join(MANUAL);
        utils::make_dir(&manual_backups).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile::default();
        config_file.save(&config_path).await?;

        Db::init(&db_path).await?.close().await;
        info!("Initialized {}", root.display());

        Ok(Self {
            root,
            config_path,
            config_file,
            db_path,
            auto_backups,
            manual_backups,
        })
    }

    /// This will
    /// - validate that the home directory exists and that the config file exists
    /// - load the config file
    /// - validate that the backup directories exist
    /// - return the loaded configuration object
    ///
    /// The database file itself is checked when it is opened.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        if !utils::exists(&maybe_relative).await? {
            return Err(Error::not_found(
                "Home directory",
                maybe_relative.display(),
            ));
        }
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if !utils::exists(&config_path).await? {
            return Err(Error::not_found("Config file", config_path.display()));
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            db_path: root.join(DB_FILE),
            auto_backups: root.join(BACKUPS).join(AUTO),
            manual_backups: root.join(BACKUPS).join(MANUAL),
            root,
            config_path,
            config_file,
        };
        for dir in [&config.auto_backups, &config.manual_backups] {
            if !dir.is_dir() {
                return Err(Error::not_found("Backup directory", dir.display()));
            }
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The live database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn auto_backups(&self) -> &Path {
        &self.auto_backups
    }

    pub fn manual_backups(&self) -> &Path {
        &self.manual_backups
    }

    /// Number of automatic backups to keep.
    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    pub fn auto_backup(&self) -> bool {
        self.config_file.auto_backup
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "tillbook",
///   "config_version": 1,
///   "backup_copies": 5,
///   "auto_backup": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "tillbook"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Number of automatic backup copies to keep
    backup_copies: u32,

    /// Whether to take an automatic backup on the first run of each day
    #[serde(default = "default_auto_backup")]
    auto_backup: bool,
}

fn default_auto_backup() -> bool {
    true
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backup_copies: BACKUP_COPIES,
            auto_backup: true,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it belongs to another app.
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;

        let config: ConfigFile = serde_json::from_str(&content).map_err(|e| {
            Error::validation(format!(
                "Failed to parse config file at {}: {e}",
                path.display()
            ))
        })?;

        if config.app_name != APP_NAME {
            return Err(Error::validation(format!(
                "Invalid app_name in config file: expected '{}', got '{}'",
                APP_NAME, config.app_name
            )));
        }
        if config.backup_copies == 0 {
            return Err(Error::validation(
                "backup_copies in config file must be at least 1",
            ));
        }

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self)
            .map_err(std::io::Error::from)
            .context("Unable to serialize config")?;
        utils::write(p, data).await
    }

    #[cfg(test)]
    fn new(backup_copies: u32, auto_backup: bool) -> Self {
        Self {
            backup_copies,
            auto_backup,
            ..Self::default()
        }
    }
}
