use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use pocketbook_core::calendar::year_options;
use pocketbook_core::{MonthCursor, TransactionType};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pocketbook", version, about = "Personal finance from the terminal")]
pub struct Cli {
    /// Path to a pocketbook.yaml, overriding the usual search locations.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and show who the backend will see.
    Whoami,
    /// End the provider session.
    Signout,
    /// Balance, totals, expenses by category and monthly history.
    Dashboard(PeriodArgs),
    #[command(subcommand)]
    Transactions(TransactionsCommand),
    /// List categories, optionally only those of one type.
    Categories {
        #[arg(long = "type")]
        kind: Option<TransactionType>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TransactionsCommand {
    List {
        #[command(flatten)]
        period: PeriodArgs,
        /// Only show rows whose description contains this text.
        #[arg(long)]
        search: Option<String>,
        /// Only fetch rows of this category id.
        #[arg(long)]
        category: Option<String>,
    },
    Add {
        #[arg(long = "type", default_value = "expense")]
        kind: TransactionType,
        #[arg(long)]
        description: String,
        #[arg(long)]
        amount: String,
        /// Day of the transaction, YYYY-MM-DD.
        #[arg(long)]
        date: String,
        #[arg(long)]
        category: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct PeriodArgs {
    #[arg(long)]
    pub month: Option<u32>,
    #[arg(long)]
    pub year: Option<i32>,
}

impl PeriodArgs {
    /// Resolve against `today`, defaulting missing parts to the current month/year.
    /// Years are limited to the ones the period picker offers.
    pub fn resolve(&self, today: MonthCursor) -> Result<MonthCursor> {
        let year = self.year.unwrap_or(today.year());
        let offered = year_options(today.year());
        if !offered.contains(&year) {
            bail!(
                "year must be between {} and {}, got {year}",
                offered[0],
                offered[offered.len() - 1]
            );
        }
        let cursor = match self.month {
            Some(month) => MonthCursor::new(month, year)?,
            None => today.with_year(year),
        };
        Ok(cursor)
    }
}
