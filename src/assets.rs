//! Parse HTML and enumerate asset references with a stable,
//! document-order sequential id.
//!
//! Read-only extraction uses `scraper`; the `element_id` assigned here
//! must be reproducible by the rewrite pass in `html_doc`, which walks
//! the same selector list in the same order against `lol_html`.

use scraper::{Html, Selector};

use crate::model::AssetReference;

/// `(css selector, attribute, is_srcset)`, in the exact order the
/// rewrite pass in `html_doc` must replicate to keep `element_id`
/// correlated across the two passes.
pub const SELECTORS: &[(&str, &str, bool)] = &[
    ("img[src]", "src", false),
    ("script[src]", "src", false),
    ("link[href]", "href", false),
    ("source[src]", "src", false),
    ("video[src]", "src", false),
    ("audio[src]", "src", false),
    ("img[srcset]", "srcset", true),
    ("source[srcset]", "srcset", true),
];

/// Parse `html` and return one [`AssetReference`] per matching attribute,
/// in document order across the selector table above. References with
/// an empty raw value are discarded, but still consume an `element_id`
/// slot so the rewrite pass's counter stays aligned.
pub fn extract(html: &str) -> Vec<AssetReference> {
    let document = Html::parse_document(html);
    let mut refs = Vec::new();
    let mut element_id = 0usize;

    for (selector_str, attribute, is_srcset) in SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let raw = element.value().attr(attribute).unwrap_or("").to_string();
            let id = element_id;
            element_id += 1;
            if raw.trim().is_empty() {
                continue;
            }
            refs.push(AssetReference::new(id, attribute, *is_srcset, raw));
        }
    }

    refs
}

/// Split a `srcset` attribute value into `(url, descriptor_suffix)`
/// pairs, preserving each candidate's original comma/whitespace
/// separation is the caller's job (see [`rewrite_srcset`]); this just
/// identifies the leading URL token per candidate.
pub fn parse_srcset_urls(value: &str) -> Vec<&str> {
    value
        .split(',')
        .filter_map(|candidate| candidate.trim().split_whitespace().next())
        .collect()
}

/// Rewrite every candidate's leading URL token in a `srcset` value to
/// `replacement`, preserving descriptors and comma separation. A lossy
/// simplification: all candidates collapse to the same replacement URL
/// rather than each getting its own fetched variant.
pub fn rewrite_srcset(value: &str, replacement: &str) -> String {
    value
        .split(',')
        .map(|candidate| {
            let trimmed = candidate.trim();
            if trimmed.is_empty() {
                return candidate.to_string();
            }
            let mut parts = trimmed.split_whitespace();
            let _url = parts.next();
            let descriptors: Vec<&str> = parts.collect();
            if descriptors.is_empty() {
                replacement.to_string()
            } else {
                format!("{replacement} {}", descriptors.join(" "))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_image_src() {
        let refs = extract(r#"<html><body><img src="a.png"></body></html>"#);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].attribute, "src");
        assert_eq!(refs[0].raw_value, "a.png");
        assert!(!refs[0].is_srcset);
    }

    #[test]
    fn empty_attribute_values_are_discarded() {
        let refs = extract(r#"<html><body><img src=""></body></html>"#);
        assert!(refs.is_empty());
    }

    #[test]
    fn element_ids_are_sequential_in_document_order() {
        let html = r#"<html><body>
            <img src="a.png">
            <script src="b.js"></script>
            <link href="c.css">
        </body></html>"#;
        let refs = extract(html);
        let ids: Vec<usize> = refs.iter().map(|r| r.element_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn srcset_is_flagged_and_kept_whole() {
        let refs = extract(r#"<img srcset="a.png 1x, b.png 2x">"#);
        assert_eq!(refs.len(), 1);
        assert!(refs[0].is_srcset);
        assert_eq!(refs[0].raw_value, "a.png 1x, b.png 2x");
    }

    #[test]
    fn parse_srcset_urls_extracts_leading_tokens() {
        let urls = parse_srcset_urls("a.png 1x, b.png 2x, c.png");
        assert_eq!(urls, vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn rewrite_srcset_preserves_descriptors() {
        let out = rewrite_srcset("a.png 1x, b.png 2x", "local/x.png");
        assert_eq!(out, "local/x.png 1x, local/x.png 2x");
    }

    #[test]
    fn rewrite_srcset_handles_bare_candidate_without_descriptor() {
        let out = rewrite_srcset("a.png", "local/x.png");
        assert_eq!(out, "local/x.png");
    }
}
