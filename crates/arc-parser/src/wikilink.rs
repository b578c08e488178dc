//! Wiki-link extraction.

use arc_core::slug;
use regex::Regex;
use std::sync::OnceLock;

/// A single `[[...]]` reference found in a note body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    /// Normalized index key (see `arc_core::slug::normalize`).
    pub target: String,
    /// The target exactly as written, before normalization.
    pub display: String,
    pub alias: Option<String>,
    pub heading_ref: Option<String>,
    pub block_ref: Option<String>,
    pub is_transclusion: bool,
}

fn wikilink_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(!?)\[\[([^\]#|]+)(?:#(\^?[^\]|]+))?(?:\|([^\]]+))?\]\]")
            .expect("static wikilink regex is valid")
    })
}

/// Extract every wiki-link from `masked_body` (already passed through
/// [`crate::code_mask::mask`]). Order of discovery is preserved; duplicates
/// are not collapsed here — that is the Link Engine's job when it derives an
/// ordered-unique outgoing list.
pub fn extract(masked_body: &str) -> Vec<WikiLink> {
    wikilink_re()
        .captures_iter(masked_body)
        .map(|caps| {
            let is_transclusion = caps.get(1).map(|m| m.as_str() == "!").unwrap_or(false);
            let display = caps[2].trim().to_string();
            let target = slug::normalize(&display);

            let (heading_ref, block_ref) = match caps.get(3) {
                Some(m) => {
                    let raw = m.as_str();
                    if let Some(stripped) = raw.strip_prefix('^') {
                        (None, Some(stripped.trim().to_string()))
                    } else {
                        (Some(raw.trim().to_string()), None)
                    }
                }
                None => (None, None),
            };

            let alias = caps.get(4).map(|m| m.as_str().trim().to_string());

            WikiLink {
                target,
                display,
                alias,
                heading_ref,
                block_ref,
                is_transclusion,
            }
        })
        .collect()
}
