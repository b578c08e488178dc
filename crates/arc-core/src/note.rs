//! The note domain type and its front-matter.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// YAML front-matter recognised on a note, plus whatever extra keys the
/// author added. Recognised keys are promoted to typed fields; everything
/// else round-trips through `extra` in sorted order so re-serialization is
/// stable (required by the Note Store's "stable key order" write rule).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FrontMatter {
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub complexity: Option<u8>,
    pub mastery_level: Option<u8>,
    pub summary: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl FrontMatter {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.tags.is_empty()
            && self.created.is_none()
            && self.modified.is_none()
            && self.complexity.is_none()
            && self.mastery_level.is_none()
            && self.summary.is_none()
            && self.extra.is_empty()
    }
}

/// A single note in the vault.
///
/// `outgoing`/`incoming` are populated by whoever assembled this value (the
/// parser fills `outgoing` at parse time; the Link Engine fills `incoming`
/// on read) — the Note itself does not own index state. The file body is the
/// source of truth; these fields are a cache for callers that want both a
/// note and its link neighborhood in one value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub slug: String,
    pub front_matter: FrontMatter,
    pub body: String,
    #[serde(default)]
    pub outgoing: Vec<String>,
    #[serde(default)]
    pub incoming: Vec<String>,
}

impl Note {
    pub fn new(slug: impl Into<String>, front_matter: FrontMatter, body: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            front_matter,
            body: body.into(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        self.front_matter.title.as_deref().unwrap_or(&self.slug)
    }

    pub fn tags(&self) -> &[String] {
        &self.front_matter.tags
    }

    pub fn summary(&self) -> Option<&str> {
        self.front_matter.summary.as_deref()
    }
}
