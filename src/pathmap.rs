//! Pure URL + content-type → on-disk path mapping.
//!
//! `output_path` never fails: every input, however degenerate, maps to
//! some path under `output_root`.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use url::Url;

/// Map `(output_root, url, content_type)` to a deterministic file path.
///
/// Identical inputs always yield byte-identical output paths on the same
/// platform.
pub fn output_path(output_root: &Path, url: &Url, content_type: Option<&str>) -> PathBuf {
    let host = host_segment(url);
    let path = url.path();
    let trailing = path.ends_with('/');
    let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let (dir_segs, bare_name, path_ext): (Vec<&str>, String, Option<String>) = if segs.is_empty() {
        (Vec::new(), "index".to_string(), None)
    } else if trailing {
        (segs.clone(), "index".to_string(), None)
    } else {
        let last = segs[segs.len() - 1];
        if has_extension(last) {
            let ext = extension_of(last);
            (segs[..segs.len() - 1].to_vec(), strip_extension(last), Some(ext))
        } else {
            (segs.clone(), "index".to_string(), None)
        }
    };

    let sanitized_dir: Vec<String> = dir_segs.iter().map(|s| sanitize_segment(s)).collect();
    let mut bare_name = sanitize_segment(&bare_name);

    let extension = match path_ext {
        Some(ext) if ext != "." => ext,
        Some(_) => ".html".to_string(),
        None => extension_from_content_type(content_type),
    };

    if let Some(query) = url.query() {
        if !query.is_empty() {
            bare_name.push_str("__");
            bare_name.push_str(&query_hash(query));
        }
    }

    let mut out = output_root.join(&host);
    for seg in &sanitized_dir {
        out.push(seg);
    }
    out.push(format!("{bare_name}{extension}"));
    out
}

fn host_segment(url: &Url) -> String {
    match url.host_str() {
        Some(h) if !h.trim().is_empty() => h.to_string(),
        _ => "unknown-host".to_string(),
    }
}

fn has_extension(segment: &str) -> bool {
    segment.contains('.')
}

/// Case-preserving dot-suffix of a path segment, e.g. `"a.tar.gz"` → `".gz"`.
fn extension_of(segment: &str) -> String {
    match segment.rfind('.') {
        Some(idx) => segment[idx..].to_string(),
        None => String::new(),
    }
}

fn strip_extension(segment: &str) -> String {
    match segment.rfind('.') {
        Some(idx) => segment[..idx].to_string(),
        None => segment.to_string(),
    }
}

/// Replace characters reserved by common host file systems with `_`.
/// An all-whitespace or empty result becomes `_`.
fn sanitize_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => out.push('_'),
            c if c.is_control() => out.push('_'),
            c => out.push(c),
        }
    }
    if out.trim().is_empty() {
        "_".to_string()
    } else {
        out
    }
}

fn extension_from_content_type(content_type: Option<&str>) -> String {
    let Some(ct) = content_type else {
        return ".html".to_string();
    };
    let base = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match base.as_str() {
        "text/html" => ".html",
        "application/json" => ".json",
        "application/xml" => ".xml",
        "text/xml" => ".xml",
        "text/plain" => ".txt",
        "" => ".html",
        _ => ".bin",
    }
    .to_string()
}

/// First 8 bytes of SHA-256 over the raw query string, as 16 lowercase
/// hex characters.
fn query_hash(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_for(url: &str, content_type: Option<&str>) -> PathBuf {
        let url = Url::parse(url).unwrap();
        output_path(Path::new("/root"), &url, content_type)
    }

    #[test]
    fn trailing_slash_yields_index() {
        let p = path_for("https://example.com/a/b/", None);
        assert_eq!(p, PathBuf::from("/root/example.com/a/b/index.html"));
    }

    #[test]
    fn extensionless_segment_becomes_directory() {
        let p = path_for("https://example.com/docs/intro", Some("text/html"));
        assert_eq!(p, PathBuf::from("/root/example.com/docs/intro/index.html"));
    }

    #[test]
    fn extensioned_segment_is_file() {
        let p = path_for("https://example.com/img/a.png", Some("image/png"));
        assert_eq!(p, PathBuf::from("/root/example.com/img/a.png"));
    }

    #[test]
    fn empty_path_is_index() {
        let p = path_for("https://example.com/", None);
        assert_eq!(p, PathBuf::from("/root/example.com/index.html"));
    }

    #[test]
    fn missing_host_substitutes_placeholder() {
        let url = Url::parse("file:///a/b").unwrap();
        let p = output_path(Path::new("/root"), &url, None);
        assert!(p.starts_with("/root/unknown-host"));
    }

    #[test]
    fn content_type_charset_is_stripped() {
        let ext = extension_from_content_type(Some("text/html; charset=utf-8"));
        assert_eq!(ext, ".html");
    }

    #[test]
    fn unknown_content_type_maps_to_bin() {
        let ext = extension_from_content_type(Some("application/octet-stream"));
        assert_eq!(ext, ".bin");
    }

    #[test]
    fn query_adds_disambiguating_suffix() {
        let a = path_for("https://example.com/search?q=a", Some("text/html"));
        let b = path_for("https://example.com/search?q=b", Some("text/html"));
        assert_ne!(a, b);
    }

    #[test]
    fn identical_query_yields_identical_suffix() {
        let a = path_for("https://example.com/search?q=a", Some("text/html"));
        let b = path_for("https://example.com/search?q=a", Some("text/html"));
        assert_eq!(a, b);
    }

    #[test]
    fn determinism_across_repeated_calls() {
        let url = Url::parse("https://example.com/a/b.json?x=1").unwrap();
        let p1 = output_path(Path::new("/root"), &url, Some("application/json"));
        let p2 = output_path(Path::new("/root"), &url, Some("application/json"));
        assert_eq!(p1, p2);
    }

    #[test]
    fn reserved_characters_are_sanitized() {
        assert_eq!(sanitize_segment("a:b"), "a_b");
        assert_eq!(sanitize_segment("  "), "_");
        assert_eq!(sanitize_segment(""), "_");
    }

    #[test]
    fn multi_dot_extension_uses_final_suffix() {
        let p = path_for("https://example.com/archive.tar.gz", None);
        assert_eq!(p, PathBuf::from("/root/example.com/archive.tar.gz"));
    }

    #[test]
    fn bare_trailing_dot_falls_back_to_html() {
        let p = path_for("https://example.com/file.", None);
        assert_eq!(p, PathBuf::from("/root/example.com/file.html"));
    }
}
