//! # Logging
//!
//! `tracing` subscriber setup for the `shareledger` binary. Logs always go
//! to stderr: stdout carries the event stream and run summary of
//! `simulate`, and must stay parseable line by line.
//!
//! `RUST_LOG` wins over the filter passed in by `main`.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Colored, one event per line with its target.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Installs the global subscriber. Returns `false` if one was already set,
/// which happens when tests in the same process initialize logging twice.
pub fn init_logging(default_filter: &str, format: LogFormat) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let base = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry.with(base.json()).try_init(),
        LogFormat::Pretty => registry
            .with(base.with_file(false).with_line_number(false))
            .try_init(),
    }
    .is_ok();

    if installed {
        tracing::debug!(?format, "logging ready");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_by_name() {
        assert_eq!(LogFormat::from_str("json", true), Ok(LogFormat::Json));
        assert_eq!(LogFormat::from_str("Pretty", true), Ok(LogFormat::Pretty));
        assert!(LogFormat::from_str("yaml", true).is_err());
    }

    #[test]
    fn second_init_is_ignored() {
        init_logging("off", LogFormat::Pretty);
        assert!(!init_logging("off", LogFormat::Json));
    }
}
