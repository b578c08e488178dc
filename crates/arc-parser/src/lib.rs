//! Front-matter and wiki-link extraction for the Arcanum vault.
//!
//! Parsing never hard-fails: malformed front-matter degrades to an empty
//! `FrontMatter` (see [`front_matter::split`]) rather than returning an
//! error, matching the "Parse error" recovery behaviour described for the
//! Note Store's caller.

mod code_mask;
mod front_matter;
mod wikilink;

use arc_core::{FrontMatter, Note};

pub use wikilink::WikiLink;

/// The result of parsing one note's raw file contents.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNote {
    pub front_matter: FrontMatter,
    pub body: String,
    pub wikilinks: Vec<WikiLink>,
}

/// Parse a note's raw file contents into front-matter, body, and the
/// ordered list of wiki-links found in the body (duplicates retained; the
/// Link Engine is responsible for collapsing to an ordered-unique set).
pub fn parse(raw: &str) -> ParsedNote {
    let (front_matter, body) = front_matter::split(raw);
    let masked = code_mask::mask(body);
    let wikilinks = wikilink::extract(&masked);
    ParsedNote {
        front_matter,
        body: body.to_string(),
        wikilinks,
    }
}

/// Parse `raw` and assemble a [`Note`] for `slug`, with `outgoing` populated
/// as the ordered-unique list of link targets (dangling or not — resolving
/// against the vault is the Link Engine's concern).
pub fn parse_note(slug: impl Into<String>, raw: &str) -> Note {
    let parsed = parse(raw);
    let mut outgoing = Vec::with_capacity(parsed.wikilinks.len());
    for link in &parsed.wikilinks {
        if !outgoing.contains(&link.target) {
            outgoing.push(link.target.clone());
        }
    }
    let mut note = Note::new(slug, parsed.front_matter, parsed.body);
    note.outgoing = outgoing;
    note
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_note_collects_ordered_unique_targets() {
        let raw = "---\ntitle: Probability\n---\nSee [[markov_chain]] and [[Markov Chain]] and [[bayes]].";
        let note = parse_note("probability", raw);
        assert_eq!(note.outgoing, vec!["markov_chain".to_string(), "bayes".to_string()]);
        assert_eq!(note.title(), "Probability");
    }

    #[test]
    fn parse_note_without_front_matter() {
        let note = parse_note("orphan", "no fences here, just [[a_link]]");
        assert!(note.front_matter.is_empty());
        assert_eq!(note.outgoing, vec!["a_link".to_string()]);
    }
}
