//! The configuration surface spec.md §6 describes, *consumed* by the core
//! crates. File discovery, profile merging, and env-var overlay are out of
//! scope here (the loader is external, per spec.md §1) — this crate only
//! ships the typed struct tree, its defaults, and a `from_value` convenience
//! for embedding into a host's own config file.
//!
//! Grounded on the teacher's `crucible-config::Config` shape: typed
//! sub-configs, `serde(default)` on every field, a `Default` impl mirroring
//! the documented defaults, and a `schemars` derive for downstream schema
//! generation/validation tooling.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct VaultConfig {
    pub vault_root: PathBuf,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self { vault_root: PathBuf::from("./vault") }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_s: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "echo".to_string(),
            model: "echo-1".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout_s: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    pub max_full_notes: usize,
    pub max_summary_notes: usize,
    pub max_title_notes: usize,
    pub threshold_full: f64,
    pub threshold_summary: f64,
    pub threshold_title: f64,
    pub max_tokens: usize,
    pub compression_ratio: f64,
    /// Per-note byte cap before a full-tier body is externalised.
    pub full_note_byte_cap: usize,
    /// Bounded count of prior turns kept verbatim in history.
    pub max_history_turns: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_full_notes: 3,
            max_summary_notes: 5,
            max_title_notes: 10,
            threshold_full: 0.8,
            threshold_summary: 0.5,
            threshold_title: 0.2,
            max_tokens: 8000,
            compression_ratio: 0.5,
            full_note_byte_cap: 4000,
            max_history_turns: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ToolLoopConfig {
    pub max_depth: u32,
}

impl Default for ToolLoopConfig {
    fn default() -> Self {
        Self { max_depth: 5 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DensityFormulaKind {
    Unweighted,
    Weighted,
}

impl Default for DensityFormulaKind {
    fn default() -> Self {
        DensityFormulaKind::Unweighted
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct LinksConfig {
    pub density_k: f64,
    pub density_formula: DensityFormulaKind,
    pub density_in_weight: f64,
    pub density_out_weight: f64,
    pub max_path_length: usize,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            density_k: 10.0,
            density_formula: DensityFormulaKind::Unweighted,
            density_in_weight: 0.6,
            density_out_weight: 0.4,
            max_path_length: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct SessionsConfig {
    pub max_concurrent: usize,
    pub ttl_min: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self { max_concurrent: 10, ttl_min: 60 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 200 }
    }
}

/// The full configuration surface, assembled from the independently
/// defaultable sub-configs above. A host that owns a loader (file discovery,
/// profile merge, env overlay) builds one of these and hands it to the
/// engine crates; the engine never reads the filesystem for config itself.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub vault: VaultConfig,
    pub llm: LlmConfig,
    pub context: ContextConfig,
    pub tool_loop: ToolLoopConfig,
    pub links: LinksConfig,
    pub sessions: SessionsConfig,
    pub retry: RetryConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config tree from an already-loaded JSON value (the host's
    /// loader is responsible for getting it there from TOML/YAML/env).
    pub fn from_value(value: serde_json::Value) -> ConfigResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
