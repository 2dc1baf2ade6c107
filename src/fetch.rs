//! Issue one HTTP GET, returning a streaming response with headers
//! parsed but the body left unread.

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;
use url::Url;

pub const USER_AGENT: &str = concat!("webmirror/", env!("CARGO_PKG_VERSION"));

/// Ceiling on a single response body, applied while streaming rather
/// than via a `Content-Length` check (a server can omit or lie about
/// it).
pub const MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

/// Build the shared HTTP client used for every fetch in a run.
///
/// Connection pooling, gzip/brotli/deflate decompression, and HTTP
/// version negotiation are left to `reqwest`'s defaults.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .context("failed to build HTTP client")
}

/// Error raised when the root cancellation token fires while a fetch is
/// in flight. Distinguished from transport errors so the caller can
/// classify the outcome separately.
#[derive(Debug)]
pub struct Canceled;

impl std::fmt::Display for Canceled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "canceled")
    }
}

impl std::error::Error for Canceled {}

/// Issue a GET request, returning as soon as headers arrive. The caller
/// is responsible for reading (or discarding) the body. Fails only on
/// transport errors or cancellation; non-2xx statuses are returned as a
/// successful `Response` for the caller to classify.
pub async fn fetch(client: &Client, url: Url, cancellation: &CancellationToken) -> Result<Response> {
    tokio::select! {
        biased;
        () = cancellation.cancelled() => Err(Canceled.into()),
        result = client.get(url.clone()).send() => {
            result.with_context(|| format!("request failed: {url}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds() {
        build_client().unwrap();
    }
}
