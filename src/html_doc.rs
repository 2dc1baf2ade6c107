//! Shared document rewrite pass, used by the mirror coordinator to
//! apply the replacements computed after the asset fan-out.
//!
//! `lol_html` has no element iterator (unlike `scraper`), so correlating
//! a replacement back to the element the asset extractor found it on
//! requires reproducing the same sequential `element_id` assignment
//! during this second, independent selection pass. Here each selector
//! gets its own counter, offset by the total match count of every
//! earlier selector in [`crate::assets::SELECTORS`], which keeps ids
//! aligned with [`crate::assets::extract`] without needing a
//! combined-selector streaming counter.

use std::cell::Cell;
use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use lol_html::{element, HtmlRewriter, Settings};
use scraper::{Html, Selector};

use crate::assets::{rewrite_srcset, SELECTORS};
use crate::model::AssetReference;

fn selector_group_counts(html: &str) -> Vec<usize> {
    let document = Html::parse_document(html);
    SELECTORS
        .iter()
        .map(|(selector_str, _, _)| {
            Selector::parse(selector_str)
                .map(|selector| document.select(&selector).count())
                .unwrap_or(0)
        })
        .collect()
}

/// Rewrite `html`, replacing each attribute the extractor found a
/// pending replacement for. References with no replacement are left
/// untouched. Returns the rewritten document as UTF-8 text.
pub fn rewrite_document(html: &str, assets: &[AssetReference]) -> Result<String> {
    let replacements: HashMap<usize, &AssetReference> = assets
        .iter()
        .filter(|r| r.replacement().is_some())
        .map(|r| (r.element_id, r))
        .collect();

    let counts = selector_group_counts(html);
    let mut base_offset = 0usize;
    let mut output = Vec::with_capacity(html.len());

    let mut handlers = Vec::with_capacity(SELECTORS.len());
    for (idx, (selector_str, attribute, is_srcset)) in SELECTORS.iter().enumerate() {
        let offset = base_offset;
        base_offset += counts[idx];
        let counter = Cell::new(0usize);
        let attribute = *attribute;
        let is_srcset = *is_srcset;
        let replacements = &replacements;

        handlers.push(element!(*selector_str, move |el| {
            let id = offset + counter.get();
            counter.set(counter.get() + 1);

            if let Some(asset_ref) = replacements.get(&id) {
                if let Some(replacement) = asset_ref.replacement() {
                    if is_srcset {
                        if let Some(current) = el.get_attribute(attribute) {
                            let rewritten = rewrite_srcset(&current, replacement);
                            el.set_attribute(attribute, &rewritten)?;
                        }
                    } else {
                        el.set_attribute(attribute, replacement)?;
                    }
                }
            }
            Ok(())
        }));
    }

    {
        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: handlers,
                ..Settings::default()
            },
            |chunk: &[u8]| output.extend_from_slice(chunk),
        );
        rewriter
            .write(html.as_bytes())
            .map_err(|e| anyhow!("HTML rewrite error: {e}"))?;
        rewriter
            .end()
            .map_err(|e| anyhow!("HTML rewrite finalization error: {e}"))?;
    }

    String::from_utf8(output).context("rewritten HTML was not valid UTF-8")
}
