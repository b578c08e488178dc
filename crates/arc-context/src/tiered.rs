//! Tiered note inclusion (spec.md §4.5).
//!
//! Given a ranked list of `(slug, relevance)` pairs, renders a deterministic
//! block: a few notes in full, more as title+summary, still more as bare
//! titles. Tier membership is decided purely by the relevance score; within
//! a tier, slugs are rendered in sorted order so the block is byte-identical
//! given the same ranking — required by the KV-cache discipline for
//! everything *except* this section (this section is itself dynamic, but
//! its internal ordering must not introduce nondeterminism of its own).

use std::path::Path;

use arc_config::ContextConfig;
use arc_vault::NoteStore;

use crate::externalize;

#[derive(Debug, Clone, PartialEq)]
pub enum NoteEntry {
    Full { slug: String, title: String, body: String },
    FullExternalized { slug: String, title: String, summary: String, path: String },
    Summary { slug: String, title: String, summary: String, outgoing: Vec<String> },
    Title { slug: String, title: String, outgoing_sample: Vec<String> },
}

/// The tiered note block, grouped by tier, each tier internally sorted by
/// slug.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TieredBlock {
    pub full: Vec<NoteEntry>,
    pub summary: Vec<NoteEntry>,
    pub title: Vec<NoteEntry>,
}

impl TieredBlock {
    /// Render to the deterministic text form embedded in the prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.full {
            render_entry(&mut out, entry);
        }
        for entry in &self.summary {
            render_entry(&mut out, entry);
        }
        for entry in &self.title {
            render_entry(&mut out, entry);
        }
        out
    }
}

fn render_entry(out: &mut String, entry: &NoteEntry) {
    match entry {
        NoteEntry::Full { slug, title, body } => {
            out.push_str(&format!("## [full] {slug} — {title}\n{body}\n\n"));
        }
        NoteEntry::FullExternalized { slug, title, summary, path } => {
            out.push_str(&format!(
                "## [full-externalized] {slug} — {title}\nsummary: {summary}\ncontent: {path}\n\n"
            ));
        }
        NoteEntry::Summary { slug, title, summary, outgoing } => {
            out.push_str(&format!(
                "## [summary] {slug} — {title}\n{summary}\noutgoing: {}\n\n",
                outgoing.join(", ")
            ));
        }
        NoteEntry::Title { slug, title, outgoing_sample } => {
            out.push_str(&format!(
                "## [title] {slug} — {title}\noutgoing: {}\n\n",
                outgoing_sample.join(", ")
            ));
        }
    }
}

/// Build a tiered block from a ranked candidate list. `ranked` need not be
/// pre-sorted by relevance; this function sorts internally.
pub fn build(
    ranked: &[(String, f64)],
    store: &NoteStore,
    config: &ContextConfig,
    vault_root: &Path,
) -> TieredBlock {
    let mut candidates: Vec<(String, f64)> = ranked.to_vec();
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then_with(|| a.0.cmp(&b.0)));

    let mut full_slugs: Vec<String> = Vec::new();
    let mut summary_slugs: Vec<String> = Vec::new();
    let mut title_slugs: Vec<String> = Vec::new();

    for (slug, relevance) in &candidates {
        if *relevance >= config.threshold_full && full_slugs.len() < config.max_full_notes {
            full_slugs.push(slug.clone());
        } else if *relevance >= config.threshold_summary && summary_slugs.len() < config.max_summary_notes {
            summary_slugs.push(slug.clone());
        } else if *relevance >= config.threshold_title && title_slugs.len() < config.max_title_notes {
            title_slugs.push(slug.clone());
        }
    }

    full_slugs.sort();
    summary_slugs.sort();
    title_slugs.sort();

    let mut block = TieredBlock::default();

    for slug in &full_slugs {
        let Ok(note) = store.read(slug) else { continue };
        if note.body.len() > config.full_note_byte_cap {
            let path = externalize::externalize(vault_root, &note.body)
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            block.full.push(NoteEntry::FullExternalized {
                slug: slug.clone(),
                title: note.title().to_string(),
                summary: note.summary().unwrap_or_default().to_string(),
                path,
            });
        } else {
            block.full.push(NoteEntry::Full {
                slug: slug.clone(),
                title: note.title().to_string(),
                body: note.body.clone(),
            });
        }
    }

    for slug in &summary_slugs {
        let Ok(note) = store.read(slug) else { continue };
        block.summary.push(NoteEntry::Summary {
            slug: slug.clone(),
            title: note.title().to_string(),
            summary: note.summary().unwrap_or_default().to_string(),
            outgoing: note.outgoing.clone(),
        });
    }

    for slug in &title_slugs {
        let Ok(note) = store.read(slug) else { continue };
        block.title.push(NoteEntry::Title {
            slug: slug.clone(),
            title: note.title().to_string(),
            outgoing_sample: note.outgoing.iter().take(3).cloned().collect(),
        });
    }

    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_core::FrontMatter;

    fn store_with(dir: &tempfile::TempDir) -> NoteStore {
        NoteStore::open(dir.path()).unwrap()
    }

    #[test]
    fn tiers_respect_thresholds_and_caps_from_spec_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir);

        let mut ranked = Vec::new();
        for i in 0..2 {
            let slug = format!("full{i}");
            store.write(&slug, FrontMatter { title: Some(slug.clone()), ..Default::default() }, "body").unwrap();
            ranked.push((slug, 0.9));
        }
        for i in 0..6 {
            let slug = format!("summary{i}");
            store.write(&slug, FrontMatter { title: Some(slug.clone()), ..Default::default() }, "body").unwrap();
            ranked.push((slug, 0.6));
        }
        for i in 0..20 {
            let slug = format!("title{i}");
            store.write(&slug, FrontMatter { title: Some(slug.clone()), ..Default::default() }, "body").unwrap();
            ranked.push((slug, 0.3));
        }

        let config = ContextConfig::default();
        let block = build(&ranked, &store, &config, dir.path());

        assert_eq!(block.full.len(), 2);
        assert_eq!(block.summary.len(), 5);
        assert_eq!(block.title.len(), 10);
    }

    #[test]
    fn tiers_are_sorted_by_slug_within_tier() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir);
        store.write("zeta", FrontMatter::default(), "body").unwrap();
        store.write("alpha", FrontMatter::default(), "body").unwrap();

        let ranked = vec![("zeta".to_string(), 0.9), ("alpha".to_string(), 0.85)];
        let config = ContextConfig::default();
        let block = build(&ranked, &store, &config, dir.path());

        let slugs: Vec<&str> = block.full.iter().map(|e| match e {
            NoteEntry::Full { slug, .. } => slug.as_str(),
            _ => unreachable!(),
        }).collect();
        assert_eq!(slugs, vec!["alpha", "zeta"]);
    }

    #[test]
    fn oversized_body_is_externalized() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir);
        let big_body = "x".repeat(10);
        store.write("big", FrontMatter::default(), &big_body).unwrap();

        let mut config = ContextConfig::default();
        config.full_note_byte_cap = 5;
        let ranked = vec![("big".to_string(), 0.9)];
        let block = build(&ranked, &store, &config, dir.path());

        assert!(matches!(block.full[0], NoteEntry::FullExternalized { .. }));
    }

    #[test]
    fn below_title_threshold_is_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir);
        store.write("irrelevant", FrontMatter::default(), "body").unwrap();

        let ranked = vec![("irrelevant".to_string(), 0.05)];
        let config = ContextConfig::default();
        let block = build(&ranked, &store, &config, dir.path());

        assert!(block.full.is_empty() && block.summary.is_empty() && block.title.is_empty());
    }
}
