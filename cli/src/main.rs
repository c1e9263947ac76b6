// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # ShareLedger CLI
//!
//! Entry point for the `shareledger` binary. Parses CLI arguments,
//! initializes logging and metrics, and dispatches to a subcommand:
//!
//! - `simulate` replays a JSON scenario against a rebasing or vault token
//! - `quote` converts one amount against a given pool state
//! - `version` prints build version information

mod cli;
mod logging;
mod metrics;
mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use shareledger_core::config::{CORE_VERSION, MAX_OFFSET_EXPONENT};
use shareledger_core::{Pool, Rounding, VirtualOffset};
use std::io::Write;

use cli::{Commands, QuoteArgs, QuoteTarget, ShareLedgerCli, SimulateArgs};
use metrics::LedgerMetrics;
use scenario::Scenario;

/// Default `tracing` filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "shareledger=info,shareledger_core=info,shareledger_tokens=info";

fn main() -> Result<()> {
    let cli = ShareLedgerCli::parse();

    match cli.command {
        Commands::Simulate(args) => simulate(args),
        Commands::Quote(args) => {
            println!("{}", quote(&args)?);
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Replays a scenario, streaming events then the summary to stdout.
fn simulate(args: SimulateArgs) -> Result<()> {
    logging::init_logging(DEFAULT_LOG_FILTER, args.log_format);

    let scenario = Scenario::load(&args.scenario)?;
    let metrics = LedgerMetrics::new().context("failed to create metrics registry")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = scenario::run(&scenario, &metrics, args.strict, &mut out)?;
    writeln!(out, "{}", serde_json::to_string(&summary)?)?;

    if args.metrics {
        let text = metrics.encode().context("failed to encode metrics")?;
        write!(out, "{text}")?;
    }

    tracing::info!(
        applied = summary.applied,
        rejected = summary.rejected,
        "simulation finished"
    );
    Ok(())
}

/// Converts `args.amount` against the pool described by `args`.
fn quote(args: &QuoteArgs) -> Result<u64> {
    let pool = match args.offset {
        Some(exponent) => {
            let offset = VirtualOffset::new(exponent).with_context(|| {
                format!("offset exponent {exponent} exceeds {MAX_OFFSET_EXPONENT}")
            })?;
            Pool::with_offset(args.total_shares, args.total_value, offset)
        }
        None => Pool::plain(args.total_shares, args.total_value),
    };

    let rounding = Rounding::from(args.rounding);
    let result = match args.to {
        QuoteTarget::Shares => pool.shares_for(args.amount, rounding),
        QuoteTarget::Value => pool.value_for(args.amount, rounding),
    };
    result.context("conversion failed")
}

/// Prints version information for the binary and the core crate.
fn print_version() {
    println!("shareledger {}", env!("CARGO_PKG_VERSION"));
    println!("core        {}", CORE_VERSION);
    println!("rustc       {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cli::RoundingArg;

    fn args(offset: Option<u8>, amount: u64, to: QuoteTarget, rounding: RoundingArg) -> QuoteArgs {
        QuoteArgs {
            total_shares: 1_000_000,
            total_value: 1_100_000,
            offset,
            amount,
            to,
            rounding,
        }
    }

    #[test]
    fn quotes_plain_pool_in_both_directions() {
        assert_eq!(
            quote(&args(None, 100_000, QuoteTarget::Shares, RoundingArg::Down)).unwrap(),
            90_909
        );
        assert_eq!(
            quote(&args(None, 100_000, QuoteTarget::Shares, RoundingArg::Up)).unwrap(),
            90_910
        );
        assert_eq!(
            quote(&args(None, 90_909, QuoteTarget::Value, RoundingArg::Down)).unwrap(),
            99_999
        );
    }

    #[test]
    fn quotes_empty_offset_pool() {
        let q = QuoteArgs {
            total_shares: 0,
            total_value: 0,
            offset: Some(6),
            amount: 1_000_000,
            to: QuoteTarget::Shares,
            rounding: RoundingArg::Down,
        };
        assert_eq!(quote(&q).unwrap(), 1_000_000_000_000);
    }

    #[test]
    fn rejects_oversized_offset() {
        let err = quote(&args(Some(19), 1, QuoteTarget::Shares, RoundingArg::Down)).unwrap_err();
        assert!(err.to_string().contains("exceeds 18"));
    }

    #[test]
    fn division_by_zero_surfaces_as_error() {
        // Plain pool with shares but no value cannot price value -> shares.
        let q = QuoteArgs {
            total_shares: 10,
            total_value: 0,
            offset: None,
            amount: 5,
            to: QuoteTarget::Shares,
            rounding: RoundingArg::Down,
        };
        assert!(quote(&q).is_err());
    }
}
