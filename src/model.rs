//! Shared data types for the downloader and mirror engine.

use std::path::PathBuf;

use url::Url;

/// Outcome of fetching and saving a single requested URL.
///
/// Exactly one `DownloadResult` is produced per URL handed to
/// [`crate::orchestrator::run`], regardless of success or failure.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub url: Url,
    pub success: bool,
    pub status: Option<u16>,
    pub path: Option<PathBuf>,
    pub error: Option<String>,
}

impl DownloadResult {
    pub fn success(url: Url, status: u16, path: PathBuf) -> Self {
        Self {
            url,
            success: true,
            status: Some(status),
            path: Some(path),
            error: None,
        }
    }

    pub fn http_error(url: Url, status: u16, reason: &str) -> Self {
        Self {
            url,
            success: false,
            status: Some(status),
            path: None,
            error: Some(format!("HTTP {status} {reason}")),
        }
    }

    pub fn failed(url: Url, error: impl Into<String>) -> Self {
        Self {
            url,
            success: false,
            status: None,
            path: None,
            error: Some(error.into()),
        }
    }
}

/// A handle back to a single asset-bearing attribute inside a parsed HTML
/// document. Mutable only through [`AssetReference::apply_replacement`].
#[derive(Debug, Clone)]
pub struct AssetReference {
    /// Sequential position among elements matched by the extractor, in
    /// document order. Used to correlate this reference with the same
    /// element during the later rewrite pass (see `html_doc`).
    pub element_id: usize,
    pub attribute: &'static str,
    pub is_srcset: bool,
    pub raw_value: String,
    replacement: Option<String>,
}

impl AssetReference {
    pub fn new(element_id: usize, attribute: &'static str, is_srcset: bool, raw_value: String) -> Self {
        Self {
            element_id,
            attribute,
            is_srcset,
            raw_value,
            replacement: None,
        }
    }

    /// Record the relative path that should replace this reference's
    /// attribute value once the rewrite pass runs. A reference with no
    /// replacement is left untouched in the output document.
    pub fn apply_replacement(&mut self, relative_path: String) {
        self.replacement = Some(relative_path);
    }

    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }
}

/// A successfully fetched and saved asset.
#[derive(Debug, Clone)]
pub struct DownloadedAsset {
    pub url: Url,
    pub path: PathBuf,
    pub content_type: Option<String>,
}
