//! Save an HTML page plus its required assets and rewrite references so
//! the saved copy renders offline.
//!
//! Dedup across the run is owned by [`MirrorRunContext`], a `tokio`
//! `OnceCell`-per-URL table — the async-memoization idiom for
//! "run this factory at most once no matter how many callers race for
//! the same key", since two workers can legitimately race to resolve
//! the same asset URL here. `options` and `context` are `Arc`-shared
//! with every spawned worker rather than borrowed.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use reqwest::{Client, Response};
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

use crate::assets;
use crate::css;
use crate::fetch::{self, MAX_BODY_BYTES};
use crate::html_doc;
use crate::model::{AssetReference, DownloadedAsset};
use crate::options::RunOptions;
use crate::pathmap::output_path;
use crate::pool::run_pool;
use crate::writer;

/// Per-run dedup table: at most one fetch is ever performed per asset
/// URL, no matter how many pages or CSS files reference it.
#[derive(Default)]
pub struct MirrorRunContext {
    entries: Mutex<HashMap<Url, Arc<OnceCell<Option<DownloadedAsset>>>>>,
}

impl MirrorRunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `factory` for `url` at most once across the context's
    /// lifetime; concurrent callers for the same `url` await the same
    /// in-flight invocation instead of racing.
    pub async fn get_or_insert<F, Fut>(&self, url: Url, factory: F) -> Option<DownloadedAsset>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<DownloadedAsset>>,
    {
        let cell = {
            let mut guard = self.entries.lock().await;
            guard.entry(url).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };
        cell.get_or_init(factory).await.clone()
    }

    async fn lookup(&self, url: &Url) -> Option<DownloadedAsset> {
        let cell = {
            let guard = self.entries.lock().await;
            guard.get(url).cloned()?
        };
        cell.get().cloned().flatten()
    }
}

const SKIPPED_SCHEMES: &[&str] = &["data:", "mailto:", "javascript:", "about:", "blob:"];

/// Resolve a raw reference string against `base`, per the mirror's
/// resolution rules. Returns `None` for whitespace-only values,
/// excluded pseudo-schemes, and references that fail to parse.
fn resolve_reference(raw: &str, base: &Url) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let lower = raw.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return Url::parse(&format!("{}://{rest}", base.scheme())).ok();
    }
    base.join(raw).ok()
}

/// Whether `candidate` is an asset worth fetching: `http`/`https` scheme
/// and, unless third-party assets are allowed, same origin as `origin`.
fn is_eligible(candidate: &Url, origin: &Url, include_third_party: bool) -> bool {
    if candidate.scheme() != "http" && candidate.scheme() != "https" {
        return false;
    }
    if include_third_party {
        return true;
    }
    candidate.scheme() == origin.scheme()
        && candidate.host_str() == origin.host_str()
        && candidate.port_or_known_default() == origin.port_or_known_default()
}

/// Filesystem-relative path, `/`-separated, from `from_file`'s directory
/// to `to_file`.
fn relative_path(from_file: &Path, to_file: &Path) -> Option<String> {
    let from_dir = from_file.parent()?;
    let diff = pathdiff::diff_paths(to_file, from_dir)?;
    Some(
        diff.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
    )
}

/// Read a full response body, enforcing [`MAX_BODY_BYTES`] while
/// streaming rather than trusting `Content-Length`, the same safety net
/// the Content Writer applies to its own streamed copy.
async fn read_body_capped(response: Response, url: &Url) -> Result<Vec<u8>> {
    let mut stream = response.bytes_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("failed while streaming HTML response body")?;
        buf.extend_from_slice(&chunk);
        if buf.len() as u64 > MAX_BODY_BYTES {
            warn!(%url, limit = MAX_BODY_BYTES, "HTML response body exceeds size ceiling, aborting");
            bail!("response body exceeds maximum size of {MAX_BODY_BYTES} bytes");
        }
    }
    Ok(buf)
}

async fn fetch_and_save(
    client: &Client,
    url: Url,
    output_root: &Path,
    cancellation: &CancellationToken,
) -> Option<DownloadedAsset> {
    let response = fetch::fetch(client, url.clone(), cancellation).await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let path = writer::save(&url, response, output_root, cancellation).await.ok()?;
    Some(DownloadedAsset { url, path, content_type })
}

fn is_css_asset(asset: &DownloadedAsset) -> bool {
    let by_type = asset
        .content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case("text/css"))
        .unwrap_or(false);
    let by_ext = asset
        .path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("css"))
        .unwrap_or(false);
    by_type || by_ext
}

/// One level of `url(...)` dependency resolution for a freshly-saved CSS
/// file: fetch every same-origin (unless third-party is allowed)
/// dependency it references and rewrite the file in place. Dependencies
/// of dependencies are not followed.
async fn css_dependency_stage(
    css_path: PathBuf,
    css_url: Url,
    page_url: Url,
    client: Client,
    options: Arc<RunOptions>,
    context: Arc<MirrorRunContext>,
    cancellation: CancellationToken,
) -> Result<()> {
    let text = tokio::fs::read_to_string(&css_path)
        .await
        .with_context(|| format!("failed to read CSS file: {}", css_path.display()))?;

    let matches = css::find_urls(&text);
    if matches.is_empty() {
        return Ok(());
    }

    let mut resolved: HashMap<String, Url> = HashMap::new();
    for m in &matches {
        if let Some(url) = resolve_reference(&m.value, &css_url) {
            if is_eligible(&url, &page_url, options.include_third_party_assets) {
                resolved.insert(m.value.clone(), url);
            }
        }
    }

    let unique: Vec<Url> = resolved.values().cloned().collect::<HashSet<_>>().into_iter().collect();
    if !unique.is_empty() {
        let output_root = options.output_root.clone();
        let client_cl = client.clone();
        let cancellation_cl = cancellation.clone();
        let context_cl = context.clone();
        run_pool(unique, options.max_concurrency, move |url| {
            let client = client_cl.clone();
            let output_root = output_root.clone();
            let cancellation = cancellation_cl.clone();
            let context = context_cl.clone();
            async move { context.get_or_insert(url.clone(), || fetch_and_save(&client, url, &output_root, &cancellation)).await }
        })
        .await;
    }

    let mut lookups: HashMap<String, Option<DownloadedAsset>> = HashMap::with_capacity(resolved.len());
    for (raw, url) in &resolved {
        lookups.insert(raw.clone(), context.lookup(url).await);
    }

    let rewritten = css::rewrite(&text, &matches, |value| {
        let asset = lookups.get(value)?.as_ref()?;
        relative_path(&css_path, &asset.path)
    });

    writer::write_bytes(&css_path, rewritten.as_bytes()).await
}

/// Save an HTML page plus its referenced assets and rewrite references
/// so the saved copy renders offline.
pub async fn mirror(
    page_url: &Url,
    response: Response,
    client: &Client,
    options: &Arc<RunOptions>,
    context: &Arc<MirrorRunContext>,
    cancellation: &CancellationToken,
) -> Result<PathBuf> {
    let html_path = output_path(&options.output_root, page_url, Some("text/html"));

    let body = read_body_capped(response, page_url).await?;
    let html = String::from_utf8(body).context("invalid UTF-8 in HTML body")?;

    let mut refs: Vec<AssetReference> = assets::extract(&html);
    if refs.is_empty() {
        writer::write_bytes(&html_path, html.as_bytes()).await?;
        return Ok(html_path);
    }

    // Map each reference to its resolved, eligible asset URL (if any).
    let mut ref_targets: Vec<Option<Url>> = Vec::with_capacity(refs.len());
    let mut unique_targets: HashSet<Url> = HashSet::new();
    for r in &refs {
        let representative = if r.is_srcset {
            assets::parse_srcset_urls(&r.raw_value).first().copied().unwrap_or("")
        } else {
            r.raw_value.as_str()
        };
        let resolved = resolve_reference(representative, page_url)
            .filter(|u| is_eligible(u, page_url, options.include_third_party_assets));
        if let Some(u) = &resolved {
            unique_targets.insert(u.clone());
        }
        ref_targets.push(resolved);
    }

    let targets: Vec<Url> = unique_targets.into_iter().collect();
    let page_url_owned = page_url.clone();
    let client_owned = client.clone();
    let options_cl = options.clone();
    let context_cl = context.clone();
    let cancellation_owned = cancellation.clone();
    let max_concurrency = options.max_concurrency;

    run_pool(targets, max_concurrency, move |url| {
        let client = client_owned.clone();
        let options = options_cl.clone();
        let context = context_cl.clone();
        let cancellation = cancellation_owned.clone();
        let page_url = page_url_owned.clone();
        async move {
            let output_root = options.output_root.clone();
            let asset = context
                .get_or_insert(url.clone(), || fetch_and_save(&client, url.clone(), &output_root, &cancellation))
                .await;
            if let Some(asset) = asset {
                if is_css_asset(&asset) {
                    let _ = css_dependency_stage(
                        asset.path.clone(),
                        asset.url.clone(),
                        page_url,
                        client,
                        options,
                        context,
                        cancellation,
                    )
                    .await;
                }
            }
        }
    })
    .await;

    for (r, target) in refs.iter_mut().zip(ref_targets.iter()) {
        let Some(url) = target else { continue };
        let Some(asset) = context.lookup(url).await else { continue };
        if let Some(rel) = relative_path(&html_path, &asset.path) {
            r.apply_replacement(rel);
        }
    }

    let rewritten = html_doc::rewrite_document(&html, &refs)?;
    writer::write_bytes(&html_path, rewritten.as_bytes()).await?;
    Ok(html_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_protocol_relative_reference() {
        let base = Url::parse("https://example.com/a/").unwrap();
        let resolved = resolve_reference("//cdn.example.com/x.png", &base).unwrap();
        assert_eq!(resolved.as_str(), "https://cdn.example.com/x.png");
    }

    #[test]
    fn resolves_relative_reference() {
        let base = Url::parse("https://example.com/a/b.html").unwrap();
        let resolved = resolve_reference("style.css", &base).unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/a/style.css");
    }

    #[test]
    fn skips_data_uri() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(resolve_reference("data:image/png;base64,AAA", &base).is_none());
    }

    #[test]
    fn skips_whitespace_only() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(resolve_reference("   ", &base).is_none());
    }

    #[test]
    fn same_origin_check_respects_port() {
        let origin = Url::parse("https://example.com/").unwrap();
        let same = Url::parse("https://example.com/x.png").unwrap();
        let different_port = Url::parse("https://example.com:8443/x.png").unwrap();
        assert!(is_eligible(&same, &origin, false));
        assert!(!is_eligible(&different_port, &origin, false));
    }

    #[test]
    fn third_party_allowed_when_flag_set() {
        let origin = Url::parse("https://example.com/").unwrap();
        let other = Url::parse("https://cdn.other.com/x.png").unwrap();
        assert!(!is_eligible(&other, &origin, false));
        assert!(is_eligible(&other, &origin, true));
    }

    #[test]
    fn relative_path_is_slash_separated() {
        let from = Path::new("/root/example.com/a/index.html");
        let to = Path::new("/root/example.com/img/x.png");
        let rel = relative_path(from, to).unwrap();
        assert_eq!(rel, "../img/x.png");
    }
}
