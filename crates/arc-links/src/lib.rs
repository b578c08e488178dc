//! The Bidirectional Link Engine: process-wide shared graph state behind a
//! single owning `LinkEngine`, with readers/writer access via a
//! `tokio::sync::RwLock`. Readers (queries) take a read guard; the sole
//! writer path (`rebuild`, `apply_write`) takes a write guard for the
//! duration of the diff-apply, so callers always observe the pre-write or
//! post-write index, never a torn state.

pub mod density;
mod error;
mod graph;
pub mod queries;

use std::collections::BTreeSet;

use arc_core::Note;
use arc_vault::NoteStore;
use tokio::sync::RwLock;

pub use density::DensityFormula;
pub use error::{LinkEngineError, LinkEngineResult};
pub use queries::{Backbone, MatchScore};

use graph::GraphState;

/// A dangling-link diagnostic: a target slug with no backing note, and the
/// slugs that reference it.
#[derive(Debug, Clone, PartialEq)]
pub struct DanglingLink {
    pub target: String,
    pub referrers: Vec<String>,
}

/// The process-wide owner of the link graph. Cheap to clone-share via
/// `Arc<LinkEngine>`; internally it is just an `RwLock<GraphState>`.
pub struct LinkEngine {
    state: RwLock<GraphState>,
}

impl LinkEngine {
    pub fn new(formula: DensityFormula) -> Self {
        Self { state: RwLock::new(GraphState::new(formula)) }
    }

    /// Load every note currently in `store` and rebuild the index from
    /// scratch. Clears prior state.
    pub async fn rebuild_from_store(&self, store: &NoteStore) -> LinkEngineResult<()> {
        let slugs = store.list()?;
        let mut notes = Vec::with_capacity(slugs.len());
        for slug in &slugs {
            notes.push(store.read(slug)?);
        }
        self.rebuild(&notes).await;
        Ok(())
    }

    pub async fn rebuild(&self, notes: &[Note]) {
        let mut state = self.state.write().await;
        state.rebuild(notes);
    }

    /// Apply a single note's write (or deletion, if `new` is `None`) as an
    /// incremental diff against `old`. O(|Δ|).
    pub async fn apply_write(&self, slug: &str, old: Option<&Note>, new: Option<&Note>) {
        let mut state = self.state.write().await;
        state.apply_change(slug, old, new);
    }

    pub async fn density(&self, slug: &str) -> f64 {
        let state = self.state.read().await;
        state.density(slug)
    }

    pub async fn density_formula(&self) -> DensityFormula {
        let state = self.state.read().await;
        state.density_formula()
    }

    pub async fn set_density_formula(&self, formula: DensityFormula) {
        let mut state = self.state.write().await;
        state.set_density_formula(formula);
    }

    pub async fn outgoing(&self, slug: &str) -> Vec<String> {
        let state = self.state.read().await;
        state.outgoing.get(slug).cloned().unwrap_or_default()
    }

    pub async fn incoming(&self, slug: &str) -> Vec<String> {
        let state = self.state.read().await;
        state.incoming.get(slug).cloned().unwrap_or_default()
    }

    pub async fn neighbors(&self, slug: &str, radius: usize) -> Vec<(usize, Vec<String>)> {
        let state = self.state.read().await;
        queries::neighbors(&state, slug, radius)
    }

    pub async fn shortest_path(&self, a: &str, b: &str, max_depth: usize) -> Vec<String> {
        let state = self.state.read().await;
        queries::shortest_path(&state, a, b, max_depth)
    }

    pub async fn multi_shortest_paths(&self, slugs: &BTreeSet<String>, max_depth: usize) -> Backbone {
        let state = self.state.read().await;
        queries::multi_shortest_paths(&state, slugs, max_depth)
    }

    pub async fn keyword_match(&self, query: &str, limit: usize) -> Vec<MatchScore> {
        let state = self.state.read().await;
        queries::keyword_match(&state, query, limit)
    }

    /// Diagnostic view of dangling links: every referenced-but-missing slug
    /// and who referenced it. Never blocks normal operation.
    pub async fn dangling(&self) -> Vec<DanglingLink> {
        let state = self.state.read().await;
        let mut out: Vec<DanglingLink> = state
            .dangling
            .iter()
            .map(|(target, referrers)| DanglingLink {
                target: target.clone(),
                referrers: referrers.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.target.cmp(&b.target));
        out
    }

    pub async fn known_slugs(&self) -> BTreeSet<String> {
        let state = self.state.read().await;
        state.known_slugs.iter().cloned().collect()
    }
}
