use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use lorebook_core::chunk::ChunkParams;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub adapter: AdapterConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Workspace storage backend. With a `root` directory set, workspaces are
/// directories of `.txt`/`.md` files under it; without one, everything
/// lives in volatile process memory.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Window parameters fed to the chunker. Scoring thresholds are design
/// constants in `lorebook-core`, deliberately not configurable.
#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    #[serde(default = "default_overlap_words")]
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
            overlap_words: default_overlap_words(),
        }
    }
}

fn default_max_words() -> usize {
    400
}
fn default_overlap_words() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdapterConfig {
    /// `"disabled"` or `"http"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL of the model server (required for the `http` provider).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7207".to_string()
}

impl Config {
    /// Defaults for commands that can run without a config file:
    /// in-memory store, disabled adapter, default chunking.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn chunk_params(&self) -> ChunkParams {
        ChunkParams {
            max_words: self.chunking.max_words,
            overlap_words: self.chunking.overlap_words,
        }
    }
}

impl AdapterConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_words == 0 {
        anyhow::bail!("chunking.max_words must be > 0");
    }
    if config.chunking.overlap_words >= config.chunking.max_words {
        anyhow::bail!("chunking.overlap_words must be smaller than chunking.max_words");
    }

    match config.adapter.provider.as_str() {
        "disabled" => {}
        "http" => {
            if config.adapter.base_url.is_none() {
                anyhow::bail!("adapter.base_url must be set when provider is 'http'");
            }
        }
        other => anyhow::bail!(
            "Unknown adapter provider: '{}'. Must be disabled or http.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_defaults() {
        let cfg = Config::minimal();
        assert_eq!(cfg.chunking.max_words, 400);
        assert_eq!(cfg.chunking.overlap_words, 50);
        assert_eq!(cfg.adapter.provider, "disabled");
        assert!(cfg.store.root.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let cfg: Config = toml::from_str(
            r#"
            [store]
            root = "./workspaces"

            [chunking]
            max_words = 200
            overlap_words = 25

            [adapter]
            provider = "http"
            base_url = "http://127.0.0.1:8090"

            [server]
            bind = "0.0.0.0:7207"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.chunking.max_words, 200);
        assert!(cfg.adapter.is_enabled());
        assert_eq!(cfg.server.bind, "0.0.0.0:7207");
    }
}
