//! Command-line front end over [`FinanceManager`].

pub mod output;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::{
    config::{app_data_dir, Config, ConfigManager, HOME_ENV},
    core::{
        clock::{Clock, FixedClock, SystemClock},
        errors::{FinanceError, Result},
        finance_manager::FinanceManager,
        ledger_store::ListOrder,
        roll_forward::RollForwardReport,
    },
    ledger::{
        parse_amount, parse_date, BudgetReport, NewRecurringRule, NewTransaction, RecurringRule,
        Transaction, DATE_FORMAT,
    },
};

#[derive(Parser, Debug)]
#[command(name = "finance_cli")]
#[command(about = "Personal income/expense ledger with recurring payments")]
pub struct Cli {
    /// Directory holding the data files (also read from `FINANCE_CORE_HOME`).
    #[arg(long, global = true, env = HOME_ENV)]
    data_dir: Option<PathBuf>,

    /// Path to a config file. Defaults to `config.json` in the data directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretend today is this date (YYYY-MM-DD).
    #[arg(long, global = true, value_parser = parse_day)]
    today: Option<NaiveDate>,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a single transaction.
    Add(AddArgs),
    /// Print the current balance.
    Balance,
    /// List transactions, newest first.
    List {
        /// Keep insertion order.
        #[arg(long)]
        unsorted: bool,
    },
    /// List transactions dated between START and END, inclusive.
    Range { start: String, end: String },
    /// Delete a transaction by id.
    Remove { id: String },
    /// Delete every transaction.
    Clear,
    /// Manage recurring rules.
    Recurring(Recurring),
    /// Materialize every recurring occurrence due up to today.
    RollForward,
    /// Import transactions from a semicolon separated file.
    Import { file: PathBuf },
    /// Export transactions to a semicolon separated file.
    Export { file: PathBuf },
    /// Show spending against budgets.
    Report {
        /// Budget limit for a category, as CATEGORY=LIMIT. May be repeated.
        #[arg(long = "budget", value_parser = parse_budget)]
        budgets: Vec<(String, f64)>,
    },
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    amount: String,
    #[arg(long)]
    category: String,
    /// Income or Expense.
    #[arg(long = "type")]
    kind: String,
    #[arg(long, default_value = "")]
    description: String,
    /// Defaults to today.
    #[arg(long)]
    date: Option<String>,
}

#[derive(Args, Debug)]
struct Recurring {
    #[command(subcommand)]
    command: RecurringCommand,
}

#[derive(Subcommand, Debug)]
enum RecurringCommand {
    /// Add a rule; any backlog since its start date is generated at once.
    Add(RecurringAddArgs),
    List,
    Remove { id: String },
}

#[derive(Args, Debug)]
struct RecurringAddArgs {
    #[arg(long)]
    description: String,
    #[arg(long)]
    amount: String,
    #[arg(long)]
    category: String,
    #[arg(long = "type")]
    kind: String,
    /// First due date. Defaults to today.
    #[arg(long)]
    start: Option<String>,
    #[arg(long, default_value = "Monthly")]
    frequency: String,
}

fn parse_day(raw: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(raw).map_err(|err| err.to_string())
}

fn parse_budget(raw: &str) -> std::result::Result<(String, f64), String> {
    let (category, limit) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=LIMIT, got `{raw}`"))?;
    let limit = parse_amount(limit).map_err(|err| err.to_string())?;
    Ok((category.trim().to_string(), limit))
}

/// Parses process arguments and runs the selected command.
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    if cli.plain {
        colored::control::set_override(false);
    }

    let config = load_config(&cli)?;
    crate::init_with_filter(&config.log_filter);

    let clock: Box<dyn Clock> = match cli.today {
        Some(day) => Box::new(FixedClock(day)),
        None => Box::new(SystemClock),
    };
    let mut manager = FinanceManager::from_config(&config, clock)?;
    for warning in manager.warnings() {
        output::warning(warning);
    }
    if let Some(startup) = manager.startup_report() {
        report_failures(startup);
        if !startup.generated.is_empty() {
            output::info(format!(
                "Generated {} recurring transaction(s).",
                startup.generated.len()
            ));
        }
    }

    match cli.command {
        Command::Add(args) => {
            let date = match args.date {
                Some(raw) => raw,
                None => manager.today().format(DATE_FORMAT).to_string(),
            };
            let draft = NewTransaction::parse(
                &args.amount,
                &args.category,
                &args.kind,
                &args.description,
                &date,
            )?;
            let txn = manager.ledger_mut().add(draft)?;
            output::success(format!("Added transaction {}", txn.id));
        }
        Command::Balance => {
            println!("Balance: {}", output::money(manager.ledger().balance()));
        }
        Command::List { unsorted } => {
            let order = if unsorted {
                ListOrder::Stored
            } else {
                ListOrder::NewestFirst
            };
            print_transactions(&manager.ledger().list(order));
        }
        Command::Range { start, end } => {
            let start = parse_date(&start)?;
            let end = parse_date(&end)?;
            print_transactions(&manager.ledger().list_in_range(start, end)?);
        }
        Command::Remove { id } => {
            if !manager.ledger_mut().remove(&id)? {
                return Err(FinanceError::NotFound(format!("transaction {id}")));
            }
            output::success(format!("Removed transaction {id}"));
        }
        Command::Clear => {
            let removed = manager.ledger_mut().remove_all()?;
            output::success(format!("Removed {removed} transaction(s)"));
        }
        Command::Recurring(recurring) => run_recurring(&mut manager, recurring.command)?,
        Command::RollForward => {
            let today = manager.today();
            let report = manager.roll_forward(today)?;
            report_failures(&report);
            output::success(format!(
                "Generated {} transaction(s) up to {}",
                report.generated.len(),
                today.format(DATE_FORMAT)
            ));
        }
        Command::Import { file } => {
            let report = manager.import_csv(&file)?;
            if report.has_errors() {
                output::warning(report.summary());
            } else {
                output::success(report.summary());
            }
        }
        Command::Export { file } => {
            let written = manager.export_csv(&file)?;
            output::success(format!(
                "Exported {written} transaction(s) to {}",
                file.display()
            ));
        }
        Command::Report { budgets } => {
            for (category, limit) in budgets {
                manager.budgets_mut().set(&category, limit)?;
            }
            print_budget_report(&manager.budget_report());
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let base = cli.data_dir.clone().unwrap_or_else(app_data_dir);
    let manager = match &cli.config {
        Some(path) => ConfigManager::new(path.clone()),
        None => ConfigManager::with_base_dir(&base),
    };
    let mut config = manager.load()?;
    if cli.data_dir.is_some() || config.data_dir.is_none() {
        config.data_dir = Some(base);
    }
    Ok(config)
}

fn run_recurring(manager: &mut FinanceManager, command: RecurringCommand) -> Result<()> {
    match command {
        RecurringCommand::Add(args) => {
            let start = match args.start {
                Some(raw) => raw,
                None => manager.today().format(DATE_FORMAT).to_string(),
            };
            let draft = NewRecurringRule::parse(
                &args.description,
                &args.amount,
                &args.category,
                &args.kind,
                &start,
                &args.frequency,
            )?;
            let (rule, report) = manager.add_recurring(draft)?;
            output::success(format!(
                "Added recurring rule {} ({} transaction(s) generated)",
                rule.id,
                report.generated.len()
            ));
        }
        RecurringCommand::List => print_rules(&manager.rules().list()),
        RecurringCommand::Remove { id } => {
            if !manager.remove_recurring(&id)? {
                return Err(FinanceError::NotFound(format!("recurring rule {id}")));
            }
            output::success(format!("Removed recurring rule {id}"));
        }
    }
    Ok(())
}

fn report_failures(report: &RollForwardReport) {
    for failure in &report.failures {
        output::warning(format!(
            "rule {} has unsupported frequency `{}`; left at {}",
            failure.rule_id,
            failure.frequency,
            failure.cursor.format(DATE_FORMAT)
        ));
    }
}

fn print_transactions(transactions: &[&Transaction]) {
    if transactions.is_empty() {
        output::info("No transactions.");
        return;
    }
    for txn in transactions {
        println!(
            "{}  {:<7}  {:>10}  {:<16}  {}  [{}]",
            txn.date.format(DATE_FORMAT),
            txn.kind.label(),
            output::money(txn.signed_amount()),
            txn.category,
            txn.description,
            txn.id
        );
    }
}

fn print_rules(rules: &[&RecurringRule]) {
    if rules.is_empty() {
        output::info("No recurring rules.");
        return;
    }
    for rule in rules {
        let next = rule
            .next_due_date
            .map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{}  {:<7}  {:>10.2}  {:<16}  {}  next {}  [{}]",
            rule.frequency,
            rule.kind.label(),
            rule.amount,
            rule.category,
            rule.description,
            next,
            rule.id
        );
    }
}

fn print_budget_report(report: &BudgetReport) {
    output::section("Budget report");
    if report.is_empty() {
        output::info("No expenses or budgets.");
        return;
    }
    for line in &report.lines {
        let budget = line
            .budget
            .map(|value| format!("{:.2}", value))
            .unwrap_or_else(|| "-".into());
        let remaining = line
            .remaining()
            .map(output::money)
            .unwrap_or_else(|| "-".into());
        let flag = if line.is_over_budget() { "  OVER" } else { "" };
        println!(
            "{:<16}  budget {:>10}  spent {:>10.2}  remaining {:>10}{}",
            line.category, budget, line.spent, remaining, flag
        );
    }
    let totals = &report.totals;
    println!(
        "Total budget {:.2}, spent in budgeted categories {:.2}, spent overall {:.2}",
        totals.budget, totals.spent_budgeted, totals.spent_all
    );
    if let Some(remaining) = totals.remaining() {
        println!("Remaining overall: {}", output::money(remaining));
    }
}
