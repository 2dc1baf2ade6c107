use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use webmirror::cli::Cli;
use webmirror::logging;
use webmirror::orchestrator;
use webmirror::summary::{RunSummary, EXIT_CANCELED, EXIT_CONFIG_ERROR};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_format, cli.verbose) {
        eprintln!("failed to initialize logging: {e:#}");
        return ExitCode::from(EXIT_CONFIG_ERROR as u8);
    }

    let (urls, options) = match cli.into_run() {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("configuration error: {e:#}");
            return ExitCode::from(EXIT_CONFIG_ERROR as u8);
        }
    };

    let cancellation = CancellationToken::new();
    let ctrlc_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrlc_token.cancel();
        }
    });

    let total = urls.len();
    match orchestrator::run(urls, options, cancellation.clone()).await {
        Ok(results) => {
            let summary = RunSummary::from_results(&results);
            info!(succeeded = summary.succeeded, failed = summary.failed, total, "run complete");
            if cancellation.is_cancelled() {
                ExitCode::from(EXIT_CANCELED as u8)
            } else {
                ExitCode::from(summary.exit_code() as u8)
            }
        }
        Err(e) => {
            error!("run failed: {e:#}");
            ExitCode::from(EXIT_CONFIG_ERROR as u8)
        }
    }
}
