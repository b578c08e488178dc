//! Empress — memory consolidation.
//!
//! Persists the Magician's drafts into the vault through the Note Store and
//! applies the resulting incremental diff to the Link Engine. Per the Open
//! Question resolution in DESIGN.md, each note write is individually atomic
//! but the group is not transactional: a failed write is recorded in
//! `errors` and the remaining drafts are still attempted.

use arc_links::LinkEngine;
use arc_vault::{NoteStore, VaultError};
use serde::{Deserialize, Serialize};

use crate::error::AgentOpResult;
use crate::magician::MagicianOutcome;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmpressOutcome {
    pub created: Vec<String>,
    pub modified: Vec<String>,
    pub new_links: Vec<(String, String)>,
    pub errors: Vec<String>,
}

pub async fn run(store: &NoteStore, links: &LinkEngine, magician: &MagicianOutcome) -> AgentOpResult<EmpressOutcome> {
    let mut outcome = EmpressOutcome {
        created: Vec::new(),
        modified: Vec::new(),
        new_links: Vec::new(),
        errors: Vec::new(),
    };

    for draft in &magician.drafts {
        let existing = match store.read(&draft.slug) {
            Ok(note) => Some(note),
            Err(VaultError::NotFound(_)) => None,
            Err(err) => {
                outcome.errors.push(format!("{}: read failed before write: {err}", draft.slug));
                continue;
            }
        };

        if let Err(err) = store.write(&draft.slug, draft.front_matter.clone(), &draft.body) {
            outcome.errors.push(format!("{}: write failed: {err}", draft.slug));
            continue;
        }

        let new_note = match store.read(&draft.slug) {
            Ok(note) => note,
            Err(err) => {
                outcome.errors.push(format!("{}: read-back failed after write: {err}", draft.slug));
                continue;
            }
        };

        let old_outgoing: Vec<String> = existing.as_ref().map(|n| n.outgoing.clone()).unwrap_or_default();
        for target in &new_note.outgoing {
            if !old_outgoing.contains(target) {
                outcome.new_links.push((draft.slug.clone(), target.clone()));
            }
        }

        links.apply_write(&draft.slug, existing.as_ref(), Some(&new_note)).await;

        if existing.is_some() {
            outcome.modified.push(draft.slug.clone());
        } else {
            outcome.created.push(draft.slug.clone());
        }
    }

    outcome.created.sort();
    outcome.modified.sort();
    Ok(outcome)
}
