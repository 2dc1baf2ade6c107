//! Scan CSS text for `url(...)` references and rewrite them, without a
//! full CSS parser.
//!
//! Uses `regex` applied to the narrow `url(...)` grammar, rather than
//! pulling in a CSS AST crate for a single construct.

use std::sync::OnceLock;

use regex::Regex;

/// One `url(...)` occurrence found in a CSS text: its byte span in the
/// original text and the inner value, trimmed of surrounding whitespace
/// and quotes.
#[derive(Debug, Clone)]
pub struct CssUrlMatch {
    pub start: usize,
    pub end: usize,
    pub value: String,
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"]*?))\s*\)"#).unwrap()
    })
}

/// Locate every `url(...)` in `css`, bare, single-, or double-quoted,
/// case-insensitive `URL(`. References whose inner value starts with
/// `data:` (case-insensitive) are excluded entirely.
pub fn find_urls(css: &str) -> Vec<CssUrlMatch> {
    url_regex()
        .captures_iter(css)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let value = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            if value.to_ascii_lowercase().starts_with("data:") {
                return None;
            }
            Some(CssUrlMatch {
                start: whole.start(),
                end: whole.end(),
                value,
            })
        })
        .collect()
}

/// Replace each matched `url(...)` span in `css` whose inner value has a
/// replacement in `replacements` (matched by original, untrimmed-quote
/// value) with `url(<replacement>)`. Matches with no entry are left
/// untouched. `replacements` maps a [`CssUrlMatch::value`] to its
/// replacement path.
pub fn rewrite(css: &str, matches: &[CssUrlMatch], replacements: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(css.len());
    let mut cursor = 0usize;

    for m in matches {
        out.push_str(&css[cursor..m.start]);
        match replacements(&m.value) {
            Some(replacement) => {
                out.push_str("url(");
                out.push_str(&replacement);
                out.push(')');
            }
            None => out.push_str(&css[m.start..m.end]),
        }
        cursor = m.end;
    }
    out.push_str(&css[cursor..]);
    out
}
