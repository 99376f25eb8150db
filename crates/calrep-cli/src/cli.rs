//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Calendar time report generator.
///
/// Fetches events from Google Calendar, caches them per period in SQLite
/// and aggregates them into categorized time reports.
#[derive(Debug, Parser)]
#[command(name = "calrep", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Period selection shared by report and fetch.
#[derive(Debug, Clone, Args)]
pub struct PeriodArgs {
    /// Period to cover: last_month, current_year, last_year, month_1..month_12
    /// or custom (with --start/--end).
    #[arg(short, long, default_value = "last_month")]
    pub period: String,

    /// Start date for a custom period (YYYY-MM-DD, inclusive).
    #[arg(long, requires = "end")]
    pub start: Option<NaiveDate>,

    /// End date for a custom period (YYYY-MM-DD, inclusive).
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a time report for a period, fetching events on a cache miss.
    Report {
        #[command(flatten)]
        period: PeriodArgs,

        /// Output the report as JSON.
        #[arg(long)]
        json: bool,

        /// Fetch fresh events even if the period is cached.
        #[arg(long)]
        refresh: bool,
    },

    /// Fetch and cache a period's events without producing a report.
    Fetch {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Show cached periods.
    Status,
}
