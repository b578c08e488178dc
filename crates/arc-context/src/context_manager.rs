//! Ties the static prefix, tool catalogue, tiered notes, user state, and
//! history into the single prompt string handed to a `ChatProvider` — the
//! KV-cache discipline of spec.md §4.5 made concrete.

use std::sync::Arc;

use arc_config::ContextConfig;
use arc_links::LinkEngine;
use arc_vault::NoteStore;

use crate::history::{self, History};
use crate::section::{render_tool_catalogue, PromptSections, ToolDescriptor};
use crate::tiered;

/// Everything a context build needs, shared across an orchestrator's
/// sessions. Cheap to clone (`Arc` all the way down).
#[derive(Clone)]
pub struct ContextManager {
    store: Arc<NoteStore>,
    links: Arc<LinkEngine>,
    config: ContextConfig,
    static_prefix: Arc<str>,
}

impl ContextManager {
    pub fn new(store: Arc<NoteStore>, links: Arc<LinkEngine>, config: ContextConfig, static_prefix: impl Into<Arc<str>>) -> Self {
        Self { store, links, config, static_prefix: static_prefix.into() }
    }

    /// Build the complete prompt for one agent turn.
    ///
    /// `agent_prompt_fragment` is appended to the shared static prefix (it is
    /// itself static per agent kind, so the combined prefix stays
    /// cache-stable across turns); `query` seeds the relevance ranking and
    /// fills the user-state section; `history` is rendered as-is (the caller
    /// is responsible for calling `maybe_compact` first if it may be over
    /// budget).
    pub async fn build_prompt(
        &self,
        agent_prompt_fragment: &str,
        tools: &[ToolDescriptor],
        query: &str,
        history: &History,
    ) -> String {
        let static_prefix = format!("{}\n{}", self.static_prefix, agent_prompt_fragment);
        let tool_catalogue = render_tool_catalogue(tools);

        let matches = self.links.keyword_match(query, 64).await;
        let ranked: Vec<(String, f64)> = matches.into_iter().map(|m| (m.slug, m.score)).collect();
        let tiered_notes = tiered::build(&ranked, &self.store, &self.config, self.store.root()).render();

        let user_state = format!("query: {query}\n");
        let history_text = history::render(history);

        let sections = PromptSections {
            static_prefix,
            tool_catalogue,
            tiered_notes,
            user_state,
            history: history_text,
        };
        sections.render()
    }

    /// Compact `history` against this manager's configured token budget if
    /// it exceeds it; otherwise return it unchanged.
    pub fn maybe_compact(&self, history: &History) -> History {
        history.compact(self.store.root(), self.config.max_tokens)
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn links(&self) -> &LinkEngine {
        &self.links
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_core::FrontMatter;
    use arc_links::DensityFormula;

    async fn manager_with_note(dir: &tempfile::TempDir) -> ContextManager {
        let store = Arc::new(NoteStore::open(dir.path()).unwrap());
        store
            .write(
                "markov_chain",
                FrontMatter { title: Some("Markov Chain".to_string()), ..Default::default() },
                "A stochastic process.",
            )
            .unwrap();
        let links = Arc::new(LinkEngine::new(DensityFormula::default()));
        links.rebuild_from_store(&store).await.unwrap();
        ContextManager::new(store, links, ContextConfig::default(), "You are Arcanum.")
    }

    #[tokio::test]
    async fn build_prompt_includes_all_five_sections_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_note(&dir).await;
        let tools = vec![ToolDescriptor { name: "hermit".to_string(), description: "plans".to_string() }];
        let history = History::new();

        let prompt = manager.build_prompt("High Priestess fragment", &tools, "markov chain", &history).await;

        assert!(prompt.contains("You are Arcanum."));
        assert!(prompt.contains("High Priestess fragment"));
        assert!(prompt.contains("hermit"));
        assert!(prompt.contains("markov chain"));
        let prefix_pos = prompt.find("You are Arcanum.").unwrap();
        let tools_pos = prompt.find("hermit").unwrap();
        let query_pos = prompt.find("query: markov chain").unwrap();
        assert!(prefix_pos < tools_pos);
        assert!(tools_pos < query_pos);
    }

    #[tokio::test]
    async fn cacheable_prefix_is_stable_across_changing_query() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_note(&dir).await;
        let tools = vec![ToolDescriptor { name: "hermit".to_string(), description: "plans".to_string() }];
        let history = History::new();

        let sections_a = PromptSections {
            static_prefix: format!("{}\nfrag", manager.static_prefix),
            tool_catalogue: render_tool_catalogue(&tools),
            tiered_notes: String::new(),
            user_state: "query: a".to_string(),
            history: history::render(&history),
        };
        let sections_b = PromptSections {
            static_prefix: format!("{}\nfrag", manager.static_prefix),
            tool_catalogue: render_tool_catalogue(&tools),
            tiered_notes: String::new(),
            user_state: "query: totally different question".to_string(),
            history: history::render(&history),
        };
        assert_eq!(sections_a.cacheable_prefix(), sections_b.cacheable_prefix());
    }
}
