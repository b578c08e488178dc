//! The in-memory graph state: outgoing/incoming/tag maps, the dangling-link
//! index, and the density cache. All mutation goes through `rebuild` or
//! `apply_change`; callers never touch the maps directly.

use std::collections::{HashMap, HashSet};

use arc_core::Note;

use crate::density::DensityFormula;

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

fn remove_value(list: &mut Vec<String>, value: &str) {
    list.retain(|v| v != value);
}

fn token_count(body: &str) -> usize {
    body.split_whitespace().count()
}

#[derive(Debug, Default)]
pub struct GraphState {
    pub outgoing: HashMap<String, Vec<String>>,
    pub incoming: HashMap<String, Vec<String>>,
    pub tags: HashMap<String, HashSet<String>>,
    pub dangling: HashMap<String, Vec<String>>,
    pub known_slugs: HashSet<String>,
    /// Cached title per slug, kept for `keyword_match` scoring so queries
    /// don't need to round-trip through the Note Store.
    pub titles: HashMap<String, String>,
    /// Approximate body token count per slug, used as the lowest-weight
    /// `keyword_match` signal.
    pub body_token_counts: HashMap<String, usize>,
    density_cache: HashMap<String, f64>,
    formula: DensityFormula,
}

impl GraphState {
    pub fn new(formula: DensityFormula) -> Self {
        Self { formula, ..Default::default() }
    }

    pub fn density_formula(&self) -> DensityFormula {
        self.formula
    }

    pub fn set_density_formula(&mut self, formula: DensityFormula) {
        self.formula = formula;
        let slugs: Vec<String> = self.known_slugs.iter().cloned().collect();
        for slug in slugs {
            self.refresh_density(&slug);
        }
    }

    pub fn density(&self, slug: &str) -> f64 {
        self.density_cache.get(slug).copied().unwrap_or(0.0)
    }

    fn refresh_density(&mut self, slug: &str) {
        let in_degree = self.incoming.get(slug).map(|v| v.len()).unwrap_or(0);
        let out_degree = self.outgoing.get(slug).map(|v| v.len()).unwrap_or(0);
        self.density_cache.insert(slug.to_string(), self.formula.score(in_degree, out_degree));
    }

    /// Rebuild the entire graph from the full set of notes, clearing prior
    /// state.
    pub fn rebuild(&mut self, notes: &[Note]) {
        self.outgoing.clear();
        self.incoming.clear();
        self.tags.clear();
        self.dangling.clear();
        self.known_slugs.clear();
        self.titles.clear();
        self.body_token_counts.clear();
        self.density_cache.clear();

        for note in notes {
            self.known_slugs.insert(note.slug.clone());
            self.titles.insert(note.slug.clone(), note.title().to_string());
            self.body_token_counts.insert(note.slug.clone(), token_count(&note.body));
        }

        for note in notes {
            for tag in note.tags() {
                self.tags.entry(tag.clone()).or_default().insert(note.slug.clone());
            }
        }

        for note in notes {
            for target in &note.outgoing {
                self.add_edge_raw(&note.slug, target);
            }
        }

        let slugs: Vec<String> = self.known_slugs.iter().cloned().collect();
        for slug in slugs {
            self.refresh_density(&slug);
        }
    }

    /// Apply an incremental change: `old` is the note's previous state (None
    /// on creation), `new` is its state after the write (None on deletion).
    pub fn apply_change(&mut self, slug: &str, old: Option<&Note>, new: Option<&Note>) {
        let old_tags: Vec<String> = old.map(|n| n.tags().to_vec()).unwrap_or_default();
        let new_tags: Vec<String> = new.map(|n| n.tags().to_vec()).unwrap_or_default();
        let old_targets: Vec<String> = old.map(|n| n.outgoing.clone()).unwrap_or_default();
        let new_targets: Vec<String> = new.map(|n| n.outgoing.clone()).unwrap_or_default();

        let was_known = new.is_some();
        if was_known {
            self.known_slugs.insert(slug.to_string());
        }

        match new {
            Some(note) => {
                self.titles.insert(slug.to_string(), note.title().to_string());
                self.body_token_counts.insert(slug.to_string(), token_count(&note.body));
            }
            None => {
                self.titles.remove(slug);
                self.body_token_counts.remove(slug);
            }
        }

        for tag in &old_tags {
            if !new_tags.contains(tag) {
                self.remove_tag(tag, slug);
            }
        }
        for tag in &new_tags {
            if !old_tags.contains(tag) {
                self.tags.entry(tag.clone()).or_default().insert(slug.to_string());
            }
        }

        for target in &old_targets {
            if !new_targets.contains(target) {
                self.remove_edge(slug, target);
            }
        }
        for target in &new_targets {
            if !old_targets.contains(target) {
                self.add_edge_raw(slug, target);
            }
        }

        if old.is_none() && new.is_some() {
            self.resolve_dangling_into(slug);
        }
        if old.is_some() && new.is_none() {
            self.known_slugs.remove(slug);
            self.dangle_incoming_from(slug);
            self.density_cache.remove(slug);
        } else {
            self.refresh_density(slug);
        }

        for target in old_targets.iter().chain(new_targets.iter()) {
            if self.known_slugs.contains(target) {
                self.refresh_density(target);
            }
        }
    }

    fn add_edge_raw(&mut self, from: &str, target: &str) {
        if self.known_slugs.contains(target) {
            let out = self.outgoing.entry(from.to_string()).or_default();
            push_unique(out, target);
            let incoming = self.incoming.entry(target.to_string()).or_default();
            push_unique(incoming, from);
        } else {
            let referrers = self.dangling.entry(target.to_string()).or_default();
            push_unique(referrers, from);
        }
    }

    fn remove_edge(&mut self, from: &str, target: &str) {
        if self.known_slugs.contains(target) {
            if let Some(out) = self.outgoing.get_mut(from) {
                remove_value(out, target);
                if out.is_empty() {
                    self.outgoing.remove(from);
                }
            }
            if let Some(incoming) = self.incoming.get_mut(target) {
                remove_value(incoming, from);
                if incoming.is_empty() {
                    self.incoming.remove(target);
                }
            }
        } else if let Some(referrers) = self.dangling.get_mut(target) {
            remove_value(referrers, from);
            if referrers.is_empty() {
                self.dangling.remove(target);
            }
        }
    }

    fn remove_tag(&mut self, tag: &str, slug: &str) {
        if let Some(members) = self.tags.get_mut(tag) {
            members.remove(slug);
            if members.is_empty() {
                self.tags.remove(tag);
            }
        }
    }

    /// `slug` was just created; any notes that dangling-referenced it now
    /// resolve into real edges.
    fn resolve_dangling_into(&mut self, slug: &str) {
        let Some(referrers) = self.dangling.remove(slug) else { return };
        for referrer in referrers {
            let out = self.outgoing.entry(referrer.clone()).or_default();
            push_unique(out, slug);
            let incoming = self.incoming.entry(slug.to_string()).or_default();
            push_unique(incoming, &referrer);
        }
    }

    /// Sorted, deduplicated union of `outgoing(slug)` and `incoming(slug)` —
    /// the adjacency the path/neighborhood queries walk.
    pub fn undirected_neighbors(&self, slug: &str) -> Vec<String> {
        let mut set: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        if let Some(out) = self.outgoing.get(slug) {
            set.extend(out.iter().cloned());
        }
        if let Some(incoming) = self.incoming.get(slug) {
            set.extend(incoming.iter().cloned());
        }
        set.into_iter().collect()
    }

    /// `slug` was just deleted; everyone who pointed to it now dangles.
    fn dangle_incoming_from(&mut self, slug: &str) {
        let Some(referrers) = self.incoming.remove(slug) else { return };
        for referrer in &referrers {
            if let Some(out) = self.outgoing.get_mut(referrer) {
                remove_value(out, slug);
                if out.is_empty() {
                    self.outgoing.remove(referrer);
                }
            }
        }
        let entry = self.dangling.entry(slug.to_string()).or_default();
        for referrer in referrers {
            push_unique(entry, &referrer);
        }
    }
}
