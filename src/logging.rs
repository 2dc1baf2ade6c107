//! Logging initialization: `tracing` + `tracing-subscriber`, with a
//! `--log-format {pretty,json}` choice and repeatable `-v` verbosity.
//!
//! Structured, leveled logging via `tracing` is carried as an ambient
//! concern regardless of which features are in or out of scope for a
//! given run.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogFormat;

/// Initialize the global tracing subscriber. `verbosity` is the number
/// of repeated `-v` flags; 0 maps to `info`, 1 to `debug`, 2+ to `trace`.
/// `RUST_LOG` overrides this when set.
pub fn init(format: LogFormat, verbosity: u8) -> Result<()> {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = match format {
        LogFormat::Pretty => fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("{e}")).context("failed to initialize logging")
}
