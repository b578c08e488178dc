//! The auxiliary "vault query" tool: exposes `keyword_match`, `neighbors`,
//! and `shortest_path` as callable targets in the tool-call loop, alongside
//! the five agents. Grounded on the teacher's `ToolRegistry` dispatch-by-name
//! shape, specialised to the one tool kind this engine ships out of the box.

use std::sync::Arc;

use arc_links::LinkEngine;

use crate::section::ToolDescriptor;
use crate::tool_loop::{ToolDispatcher, ToolExecutionError};
use arc_core::session::ToolCallFrame;
use async_trait::async_trait;

pub const TOOL_KIND: &str = "vault";

/// The three vault-query tools, for inclusion in a prompt's tool catalogue.
pub fn vault_tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "keyword_match".to_string(),
            description: "Rank notes by tag/title/body overlap with a query; argument `query`.".to_string(),
        },
        ToolDescriptor {
            name: "neighbors".to_string(),
            description: "Breadth-first neighborhood of a slug; arguments `slug`, `radius`.".to_string(),
        },
        ToolDescriptor {
            name: "shortest_path".to_string(),
            description: "Shortest path between two slugs; arguments `from`, `to`, `max_depth`.".to_string(),
        },
    ]
}

pub struct VaultToolDispatcher {
    links: Arc<LinkEngine>,
}

impl VaultToolDispatcher {
    pub fn new(links: Arc<LinkEngine>) -> Self {
        Self { links }
    }
}

#[async_trait]
impl ToolDispatcher for VaultToolDispatcher {
    async fn dispatch(&self, frame: &ToolCallFrame) -> Result<String, ToolExecutionError> {
        if frame.tool_kind != TOOL_KIND {
            return Err(ToolExecutionError(format!("unknown tool kind `{}`", frame.tool_kind)));
        }
        match frame.target_name.as_str() {
            "keyword_match" => {
                let query = frame.arguments.get("query").ok_or_else(|| ToolExecutionError("keyword_match requires `query`".to_string()))?;
                let matches = self.links.keyword_match(query, 10).await;
                Ok(matches.into_iter().map(|m| format!("{} ({:.2})", m.slug, m.score)).collect::<Vec<_>>().join(", "))
            }
            "neighbors" => {
                let slug = frame.arguments.get("slug").ok_or_else(|| ToolExecutionError("neighbors requires `slug`".to_string()))?;
                let radius: usize = frame.arguments.get("radius").and_then(|r| r.parse().ok()).unwrap_or(1);
                let levels = self.links.neighbors(slug, radius).await;
                Ok(levels
                    .into_iter()
                    .map(|(distance, slugs)| format!("d{distance}: {}", slugs.join(", ")))
                    .collect::<Vec<_>>()
                    .join("; "))
            }
            "shortest_path" => {
                let from = frame.arguments.get("from").ok_or_else(|| ToolExecutionError("shortest_path requires `from`".to_string()))?;
                let to = frame.arguments.get("to").ok_or_else(|| ToolExecutionError("shortest_path requires `to`".to_string()))?;
                let max_depth: usize = frame.arguments.get("max_depth").and_then(|d| d.parse().ok()).unwrap_or(12);
                let path = self.links.shortest_path(from, to, max_depth).await;
                if path.is_empty() {
                    Ok("no path found".to_string())
                } else {
                    Ok(path.join(" -> "))
                }
            }
            other => Err(ToolExecutionError(format!("unknown vault tool `{other}`"))),
        }
    }
}
