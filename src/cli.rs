//! Command-line surface: a structured `clap::Parser` derive, since this
//! crate's flag set is small and purpose-built.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use url::Url;

use crate::options::RunOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// `webmirror [OPTIONS] [URLS...]`
#[derive(Debug, Parser)]
#[command(name = "webmirror", version, about = "Concurrent web-page downloader and offline mirroring engine")]
pub struct Cli {
    /// Absolute URLs to fetch.
    pub urls: Vec<String>,

    /// Output root directory.
    #[arg(short, long, value_name = "DIR", default_value = "./mirror")]
    pub output: PathBuf,

    /// Max concurrent fetches.
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Enable asset mirroring for HTML pages.
    #[arg(long)]
    pub mirror: bool,

    /// Allow cross-origin asset fetches while mirroring.
    #[arg(long)]
    pub include_third_party: bool,

    /// Read additional URLs from a file (one per line).
    #[arg(long, value_name = "PATH")]
    pub url_file: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Build the run configuration and URL list this invocation
    /// requests. Fails with a configuration error (exit code 2) before
    /// any network activity.
    pub fn into_run(self) -> Result<(Vec<Url>, RunOptions)> {
        let mut urls = parse_urls(&self.urls)?;
        if let Some(path) = &self.url_file {
            urls.extend(parse_url_file(path)?);
        }
        if urls.is_empty() {
            bail!("no URLs given: pass one or more positionally or via --url-file");
        }

        let default = RunOptions::default();
        let options = RunOptions {
            output_root: self.output,
            max_concurrency: self.concurrency.unwrap_or(default.max_concurrency),
            request_timeout: Duration::from_secs(self.timeout),
            download_assets: self.mirror,
            include_third_party_assets: self.include_third_party,
        };
        options.validate()?;
        Ok((urls, options))
    }
}

fn parse_urls(raw: &[String]) -> Result<Vec<Url>> {
    raw.iter()
        .map(|s| Url::parse(s).with_context(|| format!("invalid URL: {s}")))
        .collect()
}

/// Parse one absolute URL per line; `#`-prefixed and blank lines are
/// skipped.
fn parse_url_file(path: &Path) -> Result<Vec<Url>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read URL file: {}", path.display()))?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| Url::parse(line).with_context(|| format!("invalid URL in {}: {line}", path.display())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_urls() {
        let urls = parse_urls(&["https://example.com/".to_string()]).unwrap();
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(parse_urls(&["not a url".to_string()]).is_err());
    }

    #[test]
    fn url_file_skips_comments_and_blanks() {
        let dir = std::env::temp_dir().join(format!("webmirror-cli-test-{}", std::process::id()));
        std::fs::write(&dir, "# comment\n\nhttps://example.com/\n   \nhttps://example.org/\n").unwrap();
        let urls = parse_url_file(&dir).unwrap();
        std::fs::remove_file(&dir).unwrap();
        assert_eq!(urls.len(), 2);
    }
}
