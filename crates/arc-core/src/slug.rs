//! Canonical identity for notes and link targets.
//!
//! The vault is case- and whitespace-insensitive for the purpose of matching
//! `[[wiki-links]]` to notes, but the original display text a note or link
//! was written with is never discarded. `normalize` produces the index key;
//! callers keep the original string alongside it for rendering.

/// Normalize a display string (a file stem or a `[[link target]]`) into a
/// stable index key: lower-cased, with runs of whitespace collapsed to a
/// single underscore.
///
/// This is the one place the case-sensitivity / underscore-vs-space open
/// question from the spec is resolved; every other module calls through
/// here rather than reimplementing the rule.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push('_');
                last_was_space = true;
            }
        } else {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        }
    }
    out
}
