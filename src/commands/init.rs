use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the data directory, its subdirectories, an initial `config.json` file with default
/// settings and an empty database.
///
/// # Arguments
/// - `home` - The directory that will be the root of data directory, e.g. `$HOME/tillbook`
///
/// # Errors
/// - Returns a conflict if the directory already holds a database.
/// - Returns an error if any file operations fail.
pub async fn init(home: &Path) -> Result<Out<()>> {
    let config = Config::create(home).await?;
    Ok(format!(
        "Successfully created the tillbook directory at {}",
        config.root().display()
    )
    .into())
}
