//! The user-facing collaborators that destructive operations depend on: choosing a backup file
//! and confirming an action. The binary implements them on the terminal.

use crate::backup::BackupFile;
use crate::error::Context;
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stderr, Stdin,
};
use tokio::sync::Mutex;

#[async_trait]
pub trait Prompt: Send + Sync {
    /// Lets the user pick one of `candidates`, or any other file. `None` means nothing was chosen.
    async fn select_backup(&self, candidates: &[BackupFile]) -> Result<Option<PathBuf>>;

    /// Asks the user to confirm `message`. Only an explicit yes returns `true`.
    async fn confirm(&self, message: &str) -> Result<bool>;
}

/// Prompts on stderr and reads answers from stdin.
///
/// One buffered reader serves every question, so answers piped in ahead of time are read in
/// order instead of being dropped with the buffer of an earlier question.
pub struct TerminalPrompt<R = BufReader<Stdin>, W = Stderr> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stderr())
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> TerminalPrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Prompts on `output` and reads answers from `input`.
    pub fn with_io(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output.into_inner()
    }

    async fn say(&self, text: &str) -> Result<()> {
        let mut output = self.output.lock().await;
        output
            .write_all(text.as_bytes())
            .await
            .context("Unable to write the prompt")?;
        output.flush().await.context("Unable to write the prompt")
    }

    /// Writes `question` and reads one line. `None` when the input is exhausted.
    async fn ask(&self, question: &str) -> Result<Option<String>> {
        self.say(question).await?;
        let mut line = String::new();
        let read = self
            .input
            .lock()
            .await
            .read_line(&mut line)
            .await
            .context("Unable to read the answer")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[async_trait]
impl<R, W> Prompt for TerminalPrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn select_backup(&self, candidates: &[BackupFile]) -> Result<Option<PathBuf>> {
        let mut menu = String::from("Available backups:\n");
        for (i, file) in candidates.iter().enumerate() {
            menu.push_str(&format!(
                "  {:>2}) [{}] {}  ({})\n",
                i + 1,
                file.kind,
                file.name,
                file.modified.format("%Y-%m-%d %H:%M")
            ));
        }
        let question = "Enter a number or a path to a .db file (empty to cancel): ";
        menu.push_str(question);

        let mut answer = self.ask(&menu).await?;
        loop {
            let text = match answer {
                Some(text) if !text.is_empty() => text,
                _ => return Ok(None),
            };
            let n = match text.parse::<usize>() {
                Ok(n) => n,
                Err(_) => return Ok(Some(PathBuf::from(text))),
            };
            if let Some(file) = n.checked_sub(1).and_then(|i| candidates.get(i)) {
                return Ok(Some(file.path.clone()));
            }
            let retry = match candidates.len() {
                0 => format!("There are no numbered backups.\n{question}"),
                len => format!("There is no backup numbered {n}, choose 1 to {len}.\n{question}"),
            };
            answer = self.ask(&retry).await?;
        }
    }

    async fn confirm(&self, message: &str) -> Result<bool> {
        let answer = self.ask(&format!("{message} [y/N]: ")).await?;
        Ok(matches!(
            answer.map(|a| a.to_lowercase()).as_deref(),
            Some("y" | "yes")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupKind;
    use chrono::Local;

    fn scripted(answers: &'static str) -> TerminalPrompt<&'static [u8], Vec<u8>> {
        TerminalPrompt::with_io(answers.as_bytes(), Vec::new())
    }

    fn candidates() -> Vec<BackupFile> {
        ["tillbook.2026-01-15-001.db", "tillbook.2026-01-14-001.db"]
            .into_iter()
            .map(|name| BackupFile {
                kind: BackupKind::Manual,
                name: name.to_string(),
                path: PathBuf::from("/backups").join(name),
                modified: Local::now(),
                size: 4096,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_answers_are_read_in_order() {
        // Both answers arrive in one read, as they do when piped in
        let prompt = scripted("1\ny\n");
        let files = candidates();
        let chosen = prompt.select_backup(&files).await.unwrap();
        assert_eq!(chosen, Some(files[0].path.clone()));
        assert!(prompt.confirm("Restore?").await.unwrap());
    }

    #[tokio::test]
    async fn test_number_out_of_range_asks_again() {
        let prompt = scripted("9\n0\n2\n");
        let files = candidates();
        let chosen = prompt.select_backup(&files).await.unwrap();
        assert_eq!(chosen, Some(files[1].path.clone()));
        let output = String::from_utf8(prompt.into_output()).unwrap();
        assert!(output.contains("There is no backup numbered 9, choose 1 to 2."));
        assert!(output.contains("There is no backup numbered 0, choose 1 to 2."));
    }

    #[tokio::test]
    async fn test_cancel_and_end_of_input() {
        assert_eq!(scripted("\n").select_backup(&candidates()).await.unwrap(), None);
        assert_eq!(scripted("").select_backup(&candidates()).await.unwrap(), None);
        // Running out of answers after a bad number is a cancel, not a loop
        assert_eq!(scripted("7\n").select_backup(&candidates()).await.unwrap(), None);
        assert!(!scripted("").confirm("Restore?").await.unwrap());
    }

    #[tokio::test]
    async fn test_path_and_confirmation_answers() {
        let prompt = scripted("/elsewhere/old.db\nYES\nn\n");
        let chosen = prompt.select_backup(&[]).await.unwrap();
        assert_eq!(chosen, Some(PathBuf::from("/elsewhere/old.db")));
        assert!(prompt.confirm("Restore?").await.unwrap());
        assert!(!prompt.confirm("Restore?").await.unwrap());
    }
}
