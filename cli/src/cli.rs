//! # CLI Interface
//!
//! Defines the command-line argument structure for `shareledger` using
//! `clap` derive. Supports three subcommands: `simulate`, `quote`, and
//! `version`.

use clap::{Parser, Subcommand, ValueEnum};
use shareledger_core::Rounding;
use std::path::PathBuf;

use crate::logging::LogFormat;

/// ShareLedger proportional share accounting toolkit.
///
/// Replays ledger scenarios against the rebasing and vault tokens, and
/// quotes single conversions between value and shares.
#[derive(Parser, Debug)]
#[command(
    name = "shareledger",
    about = "ShareLedger scenario runner and conversion calculator",
    version,
    propagate_version = true
)]
pub struct ShareLedgerCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the `shareledger` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a JSON scenario and print the events it produces.
    Simulate(SimulateArgs),
    /// Convert one amount against a given pool state.
    Quote(QuoteArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Path to the scenario file (JSON).
    #[arg(long, short = 's', env = "SHARELEDGER_SCENARIO")]
    pub scenario: PathBuf,

    /// Print the Prometheus text exposition after the summary.
    #[arg(long)]
    pub metrics: bool,

    /// Log output format. Logs go to stderr.
    #[arg(
        long,
        env = "SHARELEDGER_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// Abort on the first rejected step instead of logging and continuing.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the `quote` subcommand.
#[derive(Parser, Debug)]
pub struct QuoteArgs {
    /// Shares outstanding in the pool.
    #[arg(long)]
    pub total_shares: u64,

    /// Value (or assets) backing those shares.
    #[arg(long)]
    pub total_value: u64,

    /// Virtual offset exponent. Omit for a plain rebasing-style pool.
    #[arg(long)]
    pub offset: Option<u8>,

    /// Amount to convert.
    #[arg(long)]
    pub amount: u64,

    /// What to convert the amount into.
    #[arg(long, value_enum)]
    pub to: QuoteTarget,

    /// Rounding direction.
    #[arg(long, value_enum, default_value_t = RoundingArg::Down)]
    pub rounding: RoundingArg,
}

/// Target unit of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QuoteTarget {
    /// The amount is value; report shares.
    Shares,
    /// The amount is shares; report value.
    Value,
}

/// Command-line spelling of [`Rounding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoundingArg {
    Down,
    Up,
}

impl From<RoundingArg> for Rounding {
    fn from(arg: RoundingArg) -> Self {
        match arg {
            RoundingArg::Down => Rounding::Down,
            RoundingArg::Up => Rounding::Up,
        }
    }
}
