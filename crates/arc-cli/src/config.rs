//! Loads an `arc_config::Config`, overlaying a TOML file (if given) on the
//! built-in defaults, then applying explicit CLI flag overrides. Mirrors
//! the teacher's `crucible-cli::config` convention of a CLI-local loader
//! sitting in front of the shared config crate.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arc_config::Config;

pub fn load(config_path: Option<&Path>, vault_override: Option<PathBuf>) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(vault) = vault_override {
        config.vault.vault_root = vault;
    }

    Ok(config)
}
