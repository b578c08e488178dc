//! Hermit — path planning.
//!
//! Computes a learning-path "backbone" over `known ∪ {target}` with
//! `multi_shortest_paths`, orders it by BFS distance from the learner's
//! best-known concept, and rejects paths longer than `max_path_length`.
//! The LLM is only asked for the rationale narrative — the path itself is
//! computed deterministically from the graph, never trusted from model text.

use std::collections::BTreeSet;

use arc_context::{ContextManager, ToolDescriptor, ToolDispatcher};
use arc_core::ChatProvider;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentOpResult};
use crate::parse::extract_field;
use crate::priestess::PriestessOutcome;

pub const PROMPT_FRAGMENT: &str = "You are the Hermit: given a learning-path backbone already computed \
over the knowledge graph, explain the reasoning behind traversing it in this order. \
Respond with `RATIONALE: <free text>`.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HermitOutcome {
    pub path: Vec<String>,
    pub rationale: String,
}

pub async fn run(
    provider: &dyn ChatProvider,
    ctx: &ContextManager,
    dispatcher: &dyn ToolDispatcher,
    tools: &[ToolDescriptor],
    tool_loop_max_depth: u32,
    priestess: &PriestessOutcome,
    max_path_length: usize,
) -> AgentOpResult<HermitOutcome> {
    let known_anchor = priestess.known.first().cloned().ok_or(AgentError::NoKnownConcept)?;
    let target = priestess.unknown_relevant.first().cloned().ok_or(AgentError::NoKnownConcept)?;

    let mut seed: BTreeSet<String> = priestess.known.iter().cloned().collect();
    seed.insert(target.clone());

    let backbone = ctx.links().multi_shortest_paths(&seed, max_path_length).await;

    if backbone.slugs.len() > max_path_length {
        return Err(AgentError::PathTooLong { length: backbone.slugs.len(), max: max_path_length });
    }

    let distances = ctx.links().neighbors(&known_anchor, max_path_length.max(1)).await;
    let mut ordered = Vec::new();
    let remaining: BTreeSet<String> = backbone.slugs.iter().cloned().collect();
    let mut placed: BTreeSet<String> = BTreeSet::new();

    if remaining.contains(&known_anchor) {
        ordered.push(known_anchor.clone());
        placed.insert(known_anchor.clone());
    }
    for (_, slugs) in distances {
        for slug in slugs {
            if remaining.contains(&slug) && !placed.contains(&slug) {
                ordered.push(slug.clone());
                placed.insert(slug);
            }
        }
    }
    for slug in &remaining {
        if !placed.contains(slug) {
            ordered.push(slug.clone());
        }
    }

    let history = arc_context::History::new();
    let query = format!("plan a path from {known_anchor} to {target}");
    let prompt = ctx.build_prompt(PROMPT_FRAGMENT, tools, &query, &history).await;
    let answer = arc_context::run_tool_loop(
        provider,
        vec![arc_core::ChatMessage::system(prompt), arc_core::ChatMessage::user(query)],
        dispatcher,
        tool_loop_max_depth,
    )
    .await?;
    let rationale = extract_field(&answer, "RATIONALE").unwrap_or(answer);

    Ok(HermitOutcome { path: ordered, rationale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_context::VaultToolDispatcher;
    use arc_core::{FrontMatter, Note};
    use arc_links::{DensityFormula, LinkEngine};
    use arc_llm::EchoProvider;
    use arc_vault::NoteStore;
    use std::sync::Arc;

    async fn ctx_with_chain(dir: &tempfile::TempDir) -> ContextManager {
        let store = Arc::new(NoteStore::open(dir.path()).unwrap());
        let links = Arc::new(LinkEngine::new(DensityFormula::default()));
        let mut a = Note::new("a", FrontMatter::default(), "");
        a.outgoing = vec!["b".to_string()];
        let mut b = Note::new("b", FrontMatter::default(), "");
        b.outgoing = vec!["c".to_string()];
        let c = Note::new("c", FrontMatter::default(), "");
        links.rebuild(&[a, b, c]).await;
        ContextManager::new(store, links, Default::default(), "prefix")
    }

    #[tokio::test]
    async fn orders_path_by_distance_from_known_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_with_chain(&dir).await;
        let dispatcher = VaultToolDispatcher::new(Arc::new(LinkEngine::new(DensityFormula::default())));
        let provider = EchoProvider::default();
        let priestess = PriestessOutcome {
            known: vec!["a".to_string()],
            unknown_relevant: vec!["c".to_string()],
            cognitive_load_flags: vec![],
            rationale: String::new(),
        };

        let outcome = run(&provider, &ctx, &dispatcher, &[], 5, &priestess, 12).await.unwrap();
        assert_eq!(outcome.path, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn rejects_backbone_longer_than_max_path_length() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_with_chain(&dir).await;
        let dispatcher = VaultToolDispatcher::new(Arc::new(LinkEngine::new(DensityFormula::default())));
        let provider = EchoProvider::default();
        let priestess = PriestessOutcome {
            known: vec!["a".to_string()],
            unknown_relevant: vec!["c".to_string()],
            cognitive_load_flags: vec![],
            rationale: String::new(),
        };

        let result = run(&provider, &ctx, &dispatcher, &[], 5, &priestess, 1).await;
        assert!(matches!(result, Err(AgentError::PathTooLong { .. })));
    }
}
