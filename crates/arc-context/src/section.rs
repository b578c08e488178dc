//! The five fixed prompt sections and the fixed delimiter between them.
//!
//! Sections 1 and 2 (static prefix, tool catalogue) must be byte-identical
//! across turns within a session — the KV-cache discipline spec.md §4.5
//! requires. No timestamps, request IDs, or random tokens may appear in
//! them; callers are responsible for keeping those out, this module only
//! enforces fixed ordering and a fixed separator.

use std::collections::BTreeMap;

/// Chosen to be vanishingly unlikely to appear in note bodies (it embeds an
/// invisible-separator codepoint), so splitting the rendered prompt back
/// into sections is unambiguous if a caller ever needs to.
pub const SECTION_DELIMITER: &str = "\n---\u{2063}---\n";

/// One callable surfaced in the tool catalogue: the five agents plus any
/// auxiliary vault-query tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

/// Render the tool catalogue sorted by name — a `BTreeMap` guarantees the
/// ordering is a pure function of the descriptor set, matching the
/// front-matter stable-key-order rule.
pub fn render_tool_catalogue(tools: &[ToolDescriptor]) -> String {
    let sorted: BTreeMap<&str, &str> =
        tools.iter().map(|t| (t.name.as_str(), t.description.as_str())).collect();
    let mut out = String::new();
    for (name, description) in sorted {
        out.push_str(&format!("- {name}: {description}\n"));
    }
    out
}

/// The five prompt sections, assembled in this fixed order.
pub struct PromptSections {
    pub static_prefix: String,
    pub tool_catalogue: String,
    pub tiered_notes: String,
    pub user_state: String,
    pub history: String,
}

impl PromptSections {
    pub fn render(&self) -> String {
        [
            self.static_prefix.as_str(),
            self.tool_catalogue.as_str(),
            self.tiered_notes.as_str(),
            self.user_state.as_str(),
            self.history.as_str(),
        ]
        .join(SECTION_DELIMITER)
    }

    /// The byte-identical-across-turns portion: sections 1 and 2.
    pub fn cacheable_prefix(&self) -> String {
        [self.static_prefix.as_str(), self.tool_catalogue.as_str()].join(SECTION_DELIMITER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_catalogue_is_sorted_by_name() {
        let tools = vec![
            ToolDescriptor { name: "hermit".to_string(), description: "plans".to_string() },
            ToolDescriptor { name: "empress".to_string(), description: "persists".to_string() },
        ];
        let rendered = render_tool_catalogue(&tools);
        let empress_pos = rendered.find("empress").unwrap();
        let hermit_pos = rendered.find("hermit").unwrap();
        assert!(empress_pos < hermit_pos);
    }

    #[test]
    fn cacheable_prefix_excludes_dynamic_sections() {
        let sections = PromptSections {
            static_prefix: "prefix".to_string(),
            tool_catalogue: "catalogue".to_string(),
            tiered_notes: "notes-that-change".to_string(),
            user_state: "query".to_string(),
            history: "turn-1".to_string(),
        };
        let prefix = sections.cacheable_prefix();
        assert!(prefix.contains("prefix"));
        assert!(prefix.contains("catalogue"));
        assert!(!prefix.contains("notes-that-change"));
    }

    #[test]
    fn same_sections_render_byte_identical_prefix() {
        let build = || PromptSections {
            static_prefix: "same prefix".to_string(),
            tool_catalogue: "same catalogue".to_string(),
            tiered_notes: "differs".to_string(),
            user_state: "differs too".to_string(),
            history: "grows".to_string(),
        };
        assert_eq!(build().cacheable_prefix(), build().cacheable_prefix());
    }
}
