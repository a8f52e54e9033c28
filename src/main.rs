use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tillbook::args::{
    Args, BackupSubcommand, Command, DaySubcommand, ExpenseSubcommand, PeriodSubcommand,
};
use tillbook::model::{DailyRecord, NewExpense};
use tillbook::prompt::TerminalPrompt;
use tillbook::{commands, Config, Db};
use tracing::{debug, error, trace, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            if let Some(e) = e.downcast_ref::<tillbook::Error>() {
                if !e.live_database_intact() {
                    error!(
                        "The live database may be missing. Nothing was deleted; move the previous \
                        copy back into place by hand."
                    );
                }
            }
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> anyhow::Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    if let Command::Init = args.command() {
        commands::init(home).await?.print();
        return Ok(());
    }

    let config = Config::load(home)
        .await
        .context("Unable to load the tillbook home, did you run `tillbook init`?")?;
    let db = Db::load(config.db_path()).await?;

    // The first run of each day takes a copy before anything is changed.
    if let Err(e) = config.backup().create_auto(&db).await {
        warn!("Unable to take the automatic backup: {e}");
    }

    // Route to appropriate command handler
    let _: () = match args.command() {
        // Handled before the config is loaded
        Command::Init => (),

        Command::Day(day_args) => match day_args.action() {
            DaySubcommand::Show(a) => commands::day_show(&db, a.date()).await?.print(),
            DaySubcommand::Save(a) => {
                let record = DailyRecord::new(
                    a.date(),
                    a.till_a_cash(),
                    a.till_a_card(),
                    a.till_b_cash(),
                    a.till_b_card(),
                );
                commands::day_save(&db, record).await?.print()
            }
        },

        Command::Expense(expense_args) => match expense_args.action() {
            ExpenseSubcommand::List(a) => commands::expense_list(&db, a.period(), a.category())
                .await?
                .print(),
            ExpenseSubcommand::Add(a) => {
                let mut expense = NewExpense::new(a.period(), a.category(), a.title(), a.amount())
                    .paid(a.paid());
                if let Some(sub) = a.sub_category() {
                    expense = expense.with_sub_category(sub);
                }
                if let Some(reference) = a.reference_number() {
                    expense = expense.with_reference_number(reference);
                }
                commands::expense_add(&db, expense).await?.print()
            }
            ExpenseSubcommand::Paid(a) => commands::expense_paid(&db, a.id(), a.paid())
                .await?
                .print(),
            ExpenseSubcommand::Toggle(a) => commands::expense_toggle(&db, a.id()).await?.print(),
            ExpenseSubcommand::Delete(a) => commands::expense_delete(&db, a.id()).await?.print(),
        },

        Command::Period(period_args) => match period_args.action() {
            PeriodSubcommand::Summary(a) => commands::period_summary(&db, a.period())
                .await?
                .print(),
            PeriodSubcommand::Market(a) => commands::period_market(&db, a.period())
                .await?
                .print(),
            PeriodSubcommand::Status(a) => commands::period_status(&db, a.period())
                .await?
                .print(),
            PeriodSubcommand::SetStatus(a) => {
                commands::period_set_status(&db, a.period(), a.paid())
                    .await?
                    .print()
            }
            PeriodSubcommand::Year(a) => commands::period_year(&db, a.year()).await?.print(),
        },

        Command::Backup(backup_args) => match backup_args.action() {
            BackupSubcommand::Create => commands::backup_create(&config, &db).await?.print(),
            BackupSubcommand::List => commands::backup_list(&config).await?.print(),
            BackupSubcommand::Restore(a) => {
                let prompt = TerminalPrompt::new();
                commands::backup_restore(&config, &db, a.path(), a.yes(), &prompt)
                    .await?
                    .print()
            }
        },
    };

    db.close().await;
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
