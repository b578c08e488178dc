//! Append-only session history with lossless compaction.
//!
//! Modelled as an immutable ordered sequence with structural sharing
//! (`Arc<str>` bodies, per the REDESIGN FLAGS design note): compaction
//! produces a *new* `History` whose oldest turns have their observation
//! payload replaced by an externalised file reference, while the action
//! text (model output + tool requests) is preserved verbatim and every
//! turn's index is unchanged. The replacement is a cheap pointer swap, not
//! a deep copy, because the untouched turns are `Arc`-shared between the
//! old and new sequence.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::externalize;
use crate::token::TokenBudget;

#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Inline(Arc<str>),
    Externalized(PathBuf),
}

impl Observation {
    pub fn as_text_len(&self) -> usize {
        match self {
            Observation::Inline(text) => text.len(),
            Observation::Externalized(_) => 0,
        }
    }
}

/// One exchange in the tool-call loop: the model's action (text + any tool
/// requests) and the observation that followed it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTurn {
    pub action: Arc<str>,
    pub observation: Observation,
}

impl HistoryTurn {
    pub fn new(action: impl Into<Arc<str>>, observation: impl Into<Arc<str>>) -> Self {
        Self { action: action.into(), observation: Observation::Inline(observation.into()) }
    }
}

/// Append-only turn sequence. Prior turns are never rewritten or deleted —
/// `push` only ever grows the sequence, and `compact` returns a new,
/// independent `History` rather than mutating this one in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    turns: Vec<HistoryTurn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: HistoryTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[HistoryTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn estimated_tokens(&self, budget: &TokenBudget) -> usize {
        self.turns
            .iter()
            .map(|turn| budget.estimate_tokens(&turn.action) + turn.observation.as_text_len() / 4)
            .sum()
    }

    /// Externalise the oldest inline observations, in order, until the
    /// estimated token count of the resulting history fits `max_tokens` (or
    /// every observation has been externalised). Returns a new `History`;
    /// `self` is untouched.
    pub fn compact(&self, vault_root: &Path, max_tokens: usize) -> History {
        let budget = TokenBudget::new(max_tokens);
        if self.estimated_tokens(&budget) <= max_tokens {
            return self.clone();
        }

        let mut compacted = self.clone();
        for index in 0..compacted.turns.len() {
            if compacted.estimated_tokens(&budget) <= max_tokens {
                break;
            }
            let turn = &mut compacted.turns[index];
            if let Observation::Inline(text) = &turn.observation {
                if let Ok(path) = externalize::externalize(vault_root, text) {
                    turn.observation = Observation::Externalized(path);
                }
            }
        }
        compacted
    }
}

/// Render the history as the append-only section of a prompt: each turn's
/// action followed by its observation (inline text, or a path reference for
/// externalised ones).
pub fn render(history: &History) -> String {
    let mut out = String::new();
    for (index, turn) in history.turns().iter().enumerate() {
        out.push_str(&format!("### turn {index}\naction: {}\n", turn.action));
        match &turn.observation {
            Observation::Inline(text) => out.push_str(&format!("observation: {text}\n")),
            Observation::Externalized(path) => {
                out.push_str(&format!("observation (externalized): {}\n", path.display()))
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_is_append_only() {
        let mut history = History::new();
        history.push(HistoryTurn::new("a1", "o1"));
        history.push(HistoryTurn::new("a2", "o2"));
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0].action.as_ref(), "a1");
    }

    #[test]
    fn compaction_preserves_action_text_and_indices() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = History::new();
        history.push(HistoryTurn::new("action-1", "x".repeat(10000)));
        history.push(HistoryTurn::new("action-2", "y".repeat(10000)));

        let compacted = history.compact(dir.path(), 100);

        assert_eq!(compacted.len(), 2);
        assert_eq!(compacted.turns()[0].action, history.turns()[0].action);
        assert_eq!(compacted.turns()[1].action, history.turns()[1].action);
    }

    #[test]
    fn compaction_is_lossless_content_recoverable_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = History::new();
        let original_observation = "important detail".repeat(1000);
        history.push(HistoryTurn::new("action", original_observation.clone()));

        let compacted = history.compact(dir.path(), 10);
        match &compacted.turns()[0].observation {
            Observation::Externalized(path) => {
                let recovered = externalize::read_externalized(path).unwrap();
                assert_eq!(recovered, original_observation);
            }
            Observation::Inline(_) => panic!("expected externalisation under a tiny budget"),
        }
    }

    #[test]
    fn under_budget_history_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = History::new();
        history.push(HistoryTurn::new("a", "small"));
        let compacted = history.compact(dir.path(), 10_000);
        assert_eq!(compacted, history);
    }

    #[test]
    fn history_prefix_is_stable_across_appends() {
        let mut history = History::new();
        history.push(HistoryTurn::new("a1", "o1"));
        let snapshot_0 = history.turns()[0].clone();
        history.push(HistoryTurn::new("a2", "o2"));
        assert_eq!(history.turns()[0], snapshot_0);
    }
}
