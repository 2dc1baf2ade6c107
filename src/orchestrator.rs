//! Top-level entry point composing the worker pool with either the
//! plain content writer or the mirror coordinator, per URL.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::fetch::{self, Canceled};
use crate::mirror::{self, MirrorRunContext};
use crate::model::DownloadResult;
use crate::options::RunOptions;
use crate::pool::run_pool;
use crate::writer;

/// Run the downloader/mirror engine over `urls`, returning one
/// [`DownloadResult`] per URL. Fails synchronously, before any request
/// is issued, if `options` is invalid.
pub async fn run(urls: Vec<Url>, options: RunOptions, cancellation: CancellationToken) -> Result<Vec<DownloadResult>> {
    options.validate().context("invalid run configuration")?;

    tokio::fs::create_dir_all(&options.output_root)
        .await
        .with_context(|| format!("failed to create output directory: {}", options.output_root.display()))?;

    let client = fetch::build_client()?;
    let options = Arc::new(options);
    let context = if options.download_assets {
        Some(Arc::new(MirrorRunContext::new()))
    } else {
        None
    };

    let client_cl = client.clone();
    let options_cl = options.clone();
    let context_cl = context.clone();
    let cancellation_cl = cancellation.clone();

    let results = run_pool(urls, options.max_concurrency, move |url| {
        let client = client_cl.clone();
        let options = options_cl.clone();
        let context = context_cl.clone();
        let cancellation = cancellation_cl.clone();
        async move { process_one(url, &client, &options, context.as_ref(), &cancellation).await }
    })
    .await;

    Ok(results)
}

/// Fetch one URL and save it (or mirror it), never propagating a
/// per-URL failure out of this function — every outcome becomes a
/// [`DownloadResult`] instead.
async fn process_one(
    url: Url,
    client: &Client,
    options: &Arc<RunOptions>,
    context: Option<&Arc<MirrorRunContext>>,
    cancellation: &CancellationToken,
) -> DownloadResult {
    let per_request = cancellation.child_token();
    let timeout = options.request_timeout;
    let timer = {
        let per_request = per_request.clone();
        tokio::spawn(async move {
            time::sleep(timeout).await;
            per_request.cancel();
        })
    };

    debug!(%url, "fetch starting");
    let outcome = run_one(&url, client, options, context, &per_request).await;
    timer.abort();

    match &outcome {
        Ok(result) if result.success => debug!(%url, status = ?result.status, "fetch complete"),
        Ok(result) => warn!(%url, error = ?result.error, "fetch failed"),
        Err(_) => warn!(%url, "fetch canceled or timed out"),
    }

    match outcome {
        Ok(result) => result,
        Err(_) => {
            let text = if cancellation.is_cancelled() {
                "Canceled".to_string()
            } else {
                format!("Timeout after {}s", timeout.as_secs())
            };
            DownloadResult::failed(url, text)
        }
    }
}

async fn run_one(
    url: &Url,
    client: &Client,
    options: &Arc<RunOptions>,
    context: Option<&Arc<MirrorRunContext>>,
    per_request: &CancellationToken,
) -> std::result::Result<DownloadResult, Canceled> {
    let response = match fetch::fetch(client, url.clone(), per_request).await {
        Ok(response) => response,
        Err(e) => {
            return if e.downcast_ref::<Canceled>().is_some() {
                Err(Canceled)
            } else {
                Ok(DownloadResult::failed(url.clone(), e.to_string()))
            };
        }
    };

    let status = response.status();
    if !status.is_success() {
        return Ok(DownloadResult::http_error(
            url.clone(),
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown"),
        ));
    }

    let save_result = if let Some(context) = context {
        mirror::mirror(url, response, client, options, context, per_request).await
    } else {
        writer::save(url, response, &options.output_root, per_request).await
    };

    match save_result {
        Ok(path) => Ok(DownloadResult::success(url.clone(), status.as_u16(), path)),
        Err(e) => {
            if e.downcast_ref::<Canceled>().is_some() {
                Err(Canceled)
            } else {
                Ok(DownloadResult::failed(url.clone(), e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_invalid_concurrency_before_any_request() {
        let mut opts = RunOptions::default();
        opts.max_concurrency = 0;
        let result = run(vec![], opts, CancellationToken::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_url_list_yields_empty_results() {
        let dir = tempdir();
        let opts = RunOptions {
            output_root: dir.clone(),
            ..RunOptions::default()
        };
        let results = run(vec![], opts, CancellationToken::new()).await.unwrap();
        assert!(results.is_empty());
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    fn tempdir() -> std::path::PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("webmirror-test-{}", std::process::id()));
        dir
    }
}
