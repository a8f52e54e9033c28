//! Command handlers for the tillbook CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod backup;
mod day;
mod expense;
mod init;
mod period;

use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use backup::{backup_create, backup_list, backup_restore};
pub use day::{day_save, day_show, DayReport};
pub use expense::{expense_add, expense_delete, expense_list, expense_paid, expense_toggle};
pub use init::init;
pub use period::{period_market, period_set_status, period_status, period_summary, period_year};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Right-aligns an amount for the tables printed by the commands.
fn column(amount: impl std::fmt::Display) -> String {
    format!("{:>12}", amount.to_string())
}
