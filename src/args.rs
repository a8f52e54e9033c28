//! These structs provide the CLI interface for the tillbook CLI.

use crate::model::{Amount, Category, ExpenseId, Period};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// tillbook: daily till reconciliation and monthly expense bookkeeping.
///
/// Each day, record the cash and card takings of till A and till B and see whether they agree.
/// Each month, record the bills that fall due (electricity, internet, natural gas, ...) and the
/// market purchases, mark them paid as you pay them, and review the totals.
///
/// Everything is kept in a single SQLite file under --home. An automatic backup is taken on the
/// first run of each day, and manual backups can be taken and restored with `tillbook backup`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and an empty database.
    ///
    /// This is the first command you should run. By default the data directory is
    /// $HOME/tillbook. If you want it somewhere else, pass --home or set TILLBOOK_HOME.
    Init,
    /// Show or record the till takings of a day.
    Day(DayArgs),
    /// List, add, pay and delete the expenses of a month.
    Expense(ExpenseArgs),
    /// Monthly totals and the month's "fully paid" status.
    Period(PeriodArgs),
    /// Create, list and restore backups of the database.
    Backup(BackupArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where tillbook data and configuration is held. Defaults to ~/tillbook
    #[arg(long, env = "TILLBOOK_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// (Not shown): Args for the `tillbook day` command.
#[derive(Debug, Parser, Clone)]
pub struct DayArgs {
    #[command(subcommand)]
    action: DaySubcommand,
}

impl DayArgs {
    pub fn action(&self) -> &DaySubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum DaySubcommand {
    /// Show the takings of a day and how the two tills compare.
    Show(DayShowArgs),
    /// Record the takings of a day. All four amounts are replaced; omitted ones are saved as 0.
    Save(DaySaveArgs),
}

/// (Not shown): Args for the `tillbook day show` command.
#[derive(Debug, Parser, Clone)]
pub struct DayShowArgs {
    /// The day, as YYYY-MM-DD.
    date: NaiveDate,
}

impl DayShowArgs {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

/// (Not shown): Args for the `tillbook day save` command.
#[derive(Debug, Parser, Clone)]
pub struct DaySaveArgs {
    /// The day, as YYYY-MM-DD.
    date: NaiveDate,

    /// Cash taken at till A.
    #[arg(long, default_value = "0")]
    till_a_cash: Amount,

    /// Card payments taken at till A.
    #[arg(long, default_value = "0")]
    till_a_card: Amount,

    /// Cash taken at till B.
    #[arg(long, default_value = "0")]
    till_b_cash: Amount,

    /// Card payments taken at till B.
    #[arg(long, default_value = "0")]
    till_b_card: Amount,
}

impl DaySaveArgs {
    pub fn new(
        date: NaiveDate,
        till_a_cash: Amount,
        till_a_card: Amount,
        till_b_cash: Amount,
        till_b_card: Amount,
    ) -> Self {
        Self {
            date,
            till_a_cash,
            till_a_card,
            till_b_cash,
            till_b_card,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn till_a_cash(&self) -> Amount {
        self.till_a_cash
    }

    pub fn till_a_card(&self) -> Amount {
        self.till_a_card
    }

    pub fn till_b_cash(&self) -> Amount {
        self.till_b_cash
    }

    pub fn till_b_card(&self) -> Amount {
        self.till_b_card
    }
}

/// (Not shown): Args for the `tillbook expense` command.
#[derive(Debug, Parser, Clone)]
pub struct ExpenseArgs {
    #[command(subcommand)]
    action: ExpenseSubcommand,
}

impl ExpenseArgs {
    pub fn action(&self) -> &ExpenseSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExpenseSubcommand {
    /// List the expenses of a month, optionally only those of one category.
    List(ExpenseListArgs),
    /// Add an expense.
    Add(ExpenseAddArgs),
    /// Mark an expense as paid, or as unpaid with --unpaid.
    Paid(ExpensePaidArgs),
    /// Flip the paid flag of an expense.
    Toggle(ExpenseIdArgs),
    /// Permanently delete an expense.
    Delete(ExpenseIdArgs),
}

/// (Not shown): Args for the `tillbook expense list` command.
#[derive(Debug, Parser, Clone)]
pub struct ExpenseListArgs {
    /// The month, as YYYY-MM.
    period: Period,

    /// Only list expenses of this category.
    #[arg(long, value_enum)]
    category: Option<Category>,
}

impl ExpenseListArgs {
    pub fn new(period: Period, category: Option<Category>) -> Self {
        Self { period, category }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }
}

/// (Not shown): Args for the `tillbook expense add` command.
#[derive(Debug, Parser, Clone)]
pub struct ExpenseAddArgs {
    /// The month the expense belongs to, as YYYY-MM.
    period: Period,

    /// The category of the expense.
    #[arg(value_enum)]
    category: Category,

    /// A short description, e.g. "Main Meter".
    title: String,

    /// The amount, with at most two decimal places.
    amount: Amount,

    /// A free-form grouping within the category, e.g. a building or line name.
    #[arg(long)]
    sub_category: Option<String>,

    /// The subscriber or account number the bill refers to. Not accepted for
    /// self-employment-contribution.
    #[arg(long)]
    reference_number: Option<String>,

    /// Record the expense as already paid.
    #[arg(long)]
    paid: bool,
}

impl ExpenseAddArgs {
    pub fn new(period: Period, category: Category, title: impl Into<String>, amount: Amount) -> Self {
        Self {
            period,
            category,
            title: title.into(),
            amount,
            sub_category: None,
            reference_number: None,
            paid: false,
        }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn sub_category(&self) -> Option<&str> {
        self.sub_category.as_deref()
    }

    pub fn reference_number(&self) -> Option<&str> {
        self.reference_number.as_deref()
    }

    pub fn paid(&self) -> bool {
        self.paid
    }
}

/// (Not shown): Args for the `tillbook expense paid` command.
#[derive(Debug, Parser, Clone)]
pub struct ExpensePaidArgs {
    /// The id of the expense.
    id: ExpenseId,

    /// Mark the expense as unpaid instead.
    #[arg(long)]
    unpaid: bool,
}

impl ExpensePaidArgs {
    pub fn new(id: ExpenseId, paid: bool) -> Self {
        Self { id, unpaid: !paid }
    }

    pub fn id(&self) -> ExpenseId {
        self.id
    }

    pub fn paid(&self) -> bool {
        !self.unpaid
    }
}

/// (Not shown): Args for commands that act on a single expense.
#[derive(Debug, Parser, Clone)]
pub struct ExpenseIdArgs {
    /// The id of the expense.
    id: ExpenseId,
}

impl ExpenseIdArgs {
    pub fn new(id: ExpenseId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ExpenseId {
        self.id
    }
}

/// (Not shown): Args for the `tillbook period` command.
#[derive(Debug, Parser, Clone)]
pub struct PeriodArgs {
    #[command(subcommand)]
    action: PeriodSubcommand,
}

impl PeriodArgs {
    pub fn action(&self) -> &PeriodSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum PeriodSubcommand {
    /// Show the total of each category and the gross total of a month.
    Summary(PeriodOnlyArgs),
    /// Show the market expense items of a month next to the other category totals.
    Market(PeriodOnlyArgs),
    /// Show whether a month is marked as fully paid.
    Status(PeriodOnlyArgs),
    /// Mark a month as fully paid, or as not fully paid with --unpaid.
    SetStatus(PeriodSetStatusArgs),
    /// Show the fully paid status of every month of a year.
    Year(YearArgs),
}

/// (Not shown): Args for commands that act on a single month.
#[derive(Debug, Parser, Clone)]
pub struct PeriodOnlyArgs {
    /// The month, as YYYY-MM.
    period: Period,
}

impl PeriodOnlyArgs {
    pub fn new(period: Period) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Period {
        self.period
    }
}

/// (Not shown): Args for the `tillbook period set-status` command.
#[derive(Debug, Parser, Clone)]
pub struct PeriodSetStatusArgs {
    /// The month, as YYYY-MM.
    period: Period,

    /// Mark the month as not fully paid.
    #[arg(long)]
    unpaid: bool,
}

impl PeriodSetStatusArgs {
    pub fn new(period: Period, paid: bool) -> Self {
        Self {
            period,
            unpaid: !paid,
        }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn paid(&self) -> bool {
        !self.unpaid
    }
}

/// (Not shown): Args for the `tillbook period year` command.
#[derive(Debug, Parser, Clone)]
pub struct YearArgs {
    /// The four-digit year.
    year: i32,
}

impl YearArgs {
    pub fn new(year: i32) -> Self {
        Self { year }
    }

    pub fn year(&self) -> i32 {
        self.year
    }
}

/// (Not shown): Args for the `tillbook backup` command.
#[derive(Debug, Parser, Clone)]
pub struct BackupArgs {
    #[command(subcommand)]
    action: BackupSubcommand,
}

impl BackupArgs {
    pub fn action(&self) -> &BackupSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum BackupSubcommand {
    /// Copy the database into the manual backups directory.
    Create,
    /// List the automatic and manual backups, newest first.
    List,
    /// Replace the database with a backup. The current database is kept beside it as a
    /// `.previous` copy.
    Restore(RestoreArgs),
}

/// (Not shown): Args for the `tillbook backup restore` command.
#[derive(Debug, Parser, Clone)]
pub struct RestoreArgs {
    /// The backup file to restore. When omitted, you are asked to choose one.
    path: Option<PathBuf>,

    /// Do not ask for confirmation.
    #[arg(long)]
    yes: bool,
}

impl RestoreArgs {
    pub fn new(path: Option<PathBuf>, yes: bool) -> Self {
        Self { path, yes }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn yes(&self) -> bool {
        self.yes
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("tillbook"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or TILLBOOK_HOME instead of relying on the default \
                home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("tillbook")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
