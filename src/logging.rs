//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set. Otherwise the level comes from the CLI:
//! `-q` shows errors only, no flag shows warnings, `-v` info, `-vv` debug
//! and `-vvv` trace. Output goes to stderr so stdout stays clean for JSON.

use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Filter directive for the given verbosity flags.
#[must_use]
pub fn level_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// With `log_file` set, events are appended to that file without ANSI
/// colors instead of being written to stderr.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a global
/// subscriber is already installed.
pub fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(verbose, quiet)));

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .try_init()
            .context("installing tracing subscriber")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("installing tracing subscriber")?;
    }

    Ok(())
}

/// Subscriber for tests: captured by the test harness, `RUST_LOG` or
/// `debug`. Safe to call repeatedly.
pub fn init_test_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
