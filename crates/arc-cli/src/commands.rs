use std::sync::Arc;

use anyhow::{anyhow, Result};
use arc_config::{Config, DensityFormulaKind};
use arc_core::session::StageName;
use arc_links::{DensityFormula, LinkEngine};
use arc_llm::EchoProvider;
use arc_orchestrator::{Orchestrator, PushEventKind};
use arc_vault::NoteStore;
use uuid::Uuid;

fn density_formula(config: &Config) -> DensityFormula {
    match config.links.density_formula {
        DensityFormulaKind::Unweighted => DensityFormula::Unweighted { k: config.links.density_k },
        DensityFormulaKind::Weighted => DensityFormula::Weighted {
            in_weight: config.links.density_in_weight,
            out_weight: config.links.density_out_weight,
        },
    }
}

/// Build the orchestrator over the configured vault. The CLI always runs
/// against `EchoProvider` — a real deployment substitutes a vendor
/// `ChatProvider` via `arc_llm::RetryingProvider` at this same seam.
async fn build_orchestrator(config: Config) -> Result<Orchestrator> {
    let store = Arc::new(NoteStore::open(&config.vault.vault_root)?);
    let links = Arc::new(LinkEngine::new(density_formula(&config)));
    links.rebuild_from_store(&store).await?;
    Ok(Orchestrator::new(Arc::new(EchoProvider), store, links, config))
}

pub async fn learn(config: Config, query: String) -> Result<()> {
    let orchestrator = build_orchestrator(config).await?;
    let session_id = orchestrator.orchestrate(query).await?;
    println!("session {session_id} started");

    let mut events = orchestrator.subscribe(session_id)?;
    loop {
        match events.recv().await {
            Ok(event) => {
                println!("[{:?}] {}", event.event_type, event.data);
                if event.event_type == PushEventKind::Status && event.data.get("status").and_then(|v| v.as_str()) == Some("completed") {
                    break;
                }
                if event.event_type == PushEventKind::Error {
                    break;
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                eprintln!("warning: missed {skipped} events");
            }
        }
    }

    let session = orchestrator.get(session_id).await?;
    println!("final status: {:?}", session.status);
    Ok(())
}

pub async fn status(config: Config, session_id: Uuid) -> Result<()> {
    let orchestrator = build_orchestrator(config).await?;
    let session = orchestrator.get(session_id).await?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

pub async fn advance(config: Config, session_id: Uuid, stage: String, query: String) -> Result<()> {
    let orchestrator = build_orchestrator(config).await?;
    let stage = parse_stage(&stage)?;
    orchestrator.execute_agent(session_id, stage, &query).await?;
    let session = orchestrator.get(session_id).await?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

pub async fn cancel(config: Config, session_id: Uuid) -> Result<()> {
    let orchestrator = build_orchestrator(config).await?;
    orchestrator.cancel(session_id).await?;
    println!("session {session_id} cancelled");
    Ok(())
}

pub async fn list(config: Config) -> Result<()> {
    let store = NoteStore::open(&config.vault.vault_root)?;
    for slug in store.list()? {
        println!("{slug}");
    }
    Ok(())
}

fn parse_stage(name: &str) -> Result<StageName> {
    match name {
        "high_priestess" | "priestess" => Ok(StageName::HighPriestess),
        "hermit" => Ok(StageName::Hermit),
        "magician" => Ok(StageName::Magician),
        "justice" => Ok(StageName::Justice),
        "empress" => Ok(StageName::Empress),
        other => Err(anyhow!("unknown stage '{other}', expected one of: high_priestess, hermit, magician, justice, empress")),
    }
}
