//! Immutable per-run configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

/// Configuration for one invocation of the orchestrator.
///
/// Invariant: `max_concurrency > 0` and `request_timeout > 0`, checked by
/// [`RunOptions::validate`] and enforced by the orchestrator before any
/// request is issued.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_root: PathBuf,
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    pub download_assets: bool,
    pub include_third_party_assets: bool,
}

impl RunOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            bail!("max_concurrency must be greater than zero");
        }
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than zero");
        }
        Ok(())
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        let cpu = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            output_root: PathBuf::from("./mirror"),
            max_concurrency: cpu.clamp(1, 64),
            request_timeout: Duration::from_secs(30),
            download_assets: false,
            include_third_party_assets: false,
        }
    }
}
