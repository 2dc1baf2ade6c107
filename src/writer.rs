//! Stream a response body to a file at a materialized path.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use reqwest::Response;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

use crate::fetch::{Canceled, MAX_BODY_BYTES};
use crate::pathmap::output_path;

/// Compute the output path for `response`, create its parent directories,
/// and stream the body into a newly created file without fully buffering
/// it in memory. Returns the absolute path written.
///
/// Cancellation mid-stream aborts the copy and leaves the partial file on
/// disk; there is no atomicity guarantee.
pub async fn save(
    url: &Url,
    response: Response,
    output_root: &Path,
    cancellation: &CancellationToken,
) -> Result<PathBuf> {
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let path = output_path(output_root, url, content_type.as_deref());
    write_stream(response, &path, cancellation).await?;
    Ok(path)
}

/// Write a response body to an explicit path (used by the mirror, which
/// forces `text/html` for the page itself rather than trusting the
/// server's declared content type).
pub async fn write_stream(response: Response, path: &Path, cancellation: &CancellationToken) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("failed to create file: {}", path.display()))?;

    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    loop {
        tokio::select! {
            biased;
            () = cancellation.cancelled() => return Err(Canceled.into()),
            chunk = stream.next() => {
                match chunk {
                    Some(chunk) => {
                        let chunk = chunk.context("failed while streaming response body")?;
                        written += chunk.len() as u64;
                        if written > MAX_BODY_BYTES {
                            warn!(path = %path.display(), limit = MAX_BODY_BYTES, "response body exceeds size ceiling, aborting");
                            bail!("response body exceeds maximum size of {MAX_BODY_BYTES} bytes");
                        }
                        file.write_all(&chunk)
                            .await
                            .with_context(|| format!("failed writing to {}", path.display()))?;
                    }
                    None => break,
                }
            }
        }
    }

    file.flush().await.context("failed to flush output file")?;
    Ok(())
}

/// Write an in-memory byte buffer to `path`, creating parent directories.
/// Used by the mirror to serialize the rewritten HTML/CSS documents.
pub async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    Ok(())
}
