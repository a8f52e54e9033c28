use crate::backup::BackupFile;
use crate::commands::Out;
use crate::prompt::Prompt;
use crate::restore::{self, Confirmed, Restored};
use crate::{Config, Db, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub async fn backup_create(config: &Config, db: &Db) -> Result<Out<PathBuf>> {
    let path = config.backup().create_manual(db).await?;
    Ok(Out::new(
        format!("Created backup {}", path.display()),
        path,
    ))
}

pub async fn backup_list(config: &Config) -> Result<Out<Vec<BackupFile>>> {
    let files = config.backup().list().await?;
    if files.is_empty() {
        return Ok(Out::new("No backups found", files));
    }
    let mut message = String::from("Backups, newest first");
    for f in &files {
        message.push_str(&format!(
            "\n  [{:<6}] {}  {}  {} bytes",
            f.kind.to_string(),
            f.modified.format("%Y-%m-%d %H:%M:%S"),
            f.path.display(),
            f.size
        ));
    }
    Ok(Out::new(message, files))
}

/// Restores a backup over the live database.
///
/// When `path` is `None` the user picks one of the known backups through `prompt`. Unless `yes`
/// is set, the user must also confirm. A cancelled restore returns `None` and changes nothing.
///
/// On success `db` and its clones are retired. The restored database is opened once to bring its
/// schema up to date before this returns.
pub async fn backup_restore(
    config: &Config,
    db: &Db,
    path: Option<&Path>,
    yes: bool,
    prompt: &dyn Prompt,
) -> Result<Out<Option<Restored>>> {
    let source = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let candidates = config.backup().list().await?;
            match prompt.select_backup(&candidates).await? {
                Some(p) => p,
                None => return Ok(Out::new("Restore cancelled, nothing was changed", None)),
            }
        }
    };

    let confirmed = if yes {
        Confirmed::assume_yes()
    } else {
        match Confirmed::ask(prompt, &source).await? {
            Some(c) => c,
            None => return Ok(Out::new("Restore cancelled, nothing was changed", None)),
        }
    };

    let restored = restore::restore(db, &source, confirmed).await?;
    restored.reopen().await?.close().await;
    debug!("The restored database at {} opens cleanly", restored.live.display());

    Ok(Out::new(
        format!(
            "Restored {}. The database that was replaced is kept at {}",
            restored.source.display(),
            restored.previous.display()
        ),
        Some(restored),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, NewExpense, Period};
    use crate::test::{ScriptedPrompt, TestEnv};
    use crate::Amount;
    use std::str::FromStr;

    async fn add_one(db: &Db) {
        db.add_expense(NewExpense::new(
            Period::from_str("2026-03").unwrap(),
            Category::Internet,
            "Fiber",
            Amount::cents(3000),
        ))
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let env = TestEnv::new().await;
        let created = backup_create(&env.config(), &env.db()).await.unwrap();
        let path = created.structure().unwrap().clone();
        let listed = backup_list(&env.config()).await.unwrap();
        assert_eq!(listed.structure().unwrap().len(), 1);
        assert_eq!(listed.structure().unwrap()[0].path, path);
    }

    #[tokio::test]
    async fn test_restore_declined_changes_nothing() {
        let env = TestEnv::new().await;
        let db = env.db();
        let backup = env.config().backup().create_manual(&db).await.unwrap();
        add_one(&db).await;

        let prompt = ScriptedPrompt::new(Some(backup), false);
        let out = backup_restore(&env.config(), &db, None, false, &prompt)
            .await
            .unwrap();
        assert!(out.structure().unwrap().is_none());
        assert_eq!(prompt.asked().len(), 1);
        // Still usable, still holds the expense added after the backup
        let period = Period::from_str("2026-03").unwrap();
        assert_eq!(db.list_expenses_in_period(period).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_nothing_selected() {
        let env = TestEnv::new().await;
        let prompt = ScriptedPrompt::new(None, true);
        let out = backup_restore(&env.config(), &env.db(), None, false, &prompt)
            .await
            .unwrap();
        assert!(out.structure().unwrap().is_none());
        assert!(prompt.asked().is_empty());
    }

    #[tokio::test]
    async fn test_restore_selected_and_confirmed() {
        let env = TestEnv::new().await;
        let db = env.db();
        let backup = env.config().backup().create_manual(&db).await.unwrap();
        add_one(&db).await;

        let prompt = ScriptedPrompt::new(Some(backup.clone()), true);
        let out = backup_restore(&env.config(), &db, None, false, &prompt)
            .await
            .unwrap();
        let restored = out.structure().unwrap().clone().unwrap();
        assert_eq!(restored.source, backup);

        let db = Db::load(env.config().db_path()).await.unwrap();
        let period = Period::from_str("2026-03").unwrap();
        assert!(db.list_expenses_in_period(period).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_with_yes_skips_prompt() {
        let env = TestEnv::new().await;
        let db = env.db();
        let backup = env.config().backup().create_manual(&db).await.unwrap();
        let prompt = ScriptedPrompt::new(None, false);
        let out = backup_restore(&env.config(), &db, Some(&backup), true, &prompt)
            .await
            .unwrap();
        assert!(out.structure().unwrap().is_some());
        assert!(prompt.asked().is_empty());
    }
}
