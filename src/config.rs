//! TOML configuration parsing and validation.
//!
//! Every section is optional; a missing section falls back to its
//! [`Default`]. Secrets never live in the file: the file-store token is read
//! from the environment variable named by `store.access_token_env`, and the
//! OpenAI key from `OPENAI_API_KEY`.
//!
//! ```toml
//! [store]
//! root_path = "/RAG_Sources"
//! max_bytes_per_file = 4000000
//! exclude_globs = ["archive/**"]
//!
//! [chunking]
//! max_chars = 1200
//! overlap_chars = 200
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [retrieval]
//! top_k = 5
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Placeholder token shipped in sample `.env` files; treated as unset.
const PLACEHOLDER_TOKEN: &str = "your_dropbox_access_token_here";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Remote file store (Dropbox) settings.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Folder the corpus walk starts from.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Files whose payload exceeds this many bytes are skipped.
    #[serde(default = "default_max_bytes_per_file")]
    pub max_bytes_per_file: u64,
    /// Environment variable holding the bearer token.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_content_url")]
    pub content_url: String,
    /// Maximum number of downloads in flight during one build.
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,
    /// Glob patterns matched against the path relative to `root_path`.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            max_bytes_per_file: default_max_bytes_per_file(),
            access_token_env: default_access_token_env(),
            api_url: default_api_url(),
            content_url: default_content_url(),
            download_concurrency: default_download_concurrency(),
            exclude_globs: Vec::new(),
            timeout_secs: default_store_timeout_secs(),
        }
    }
}

impl StoreConfig {
    /// Read the store token from the environment.
    ///
    /// Returns `None` when the variable is unset, blank, or still holds the
    /// sample placeholder. Callers treat that as "store not configured".
    pub fn access_token(&self) -> Option<String> {
        let token = std::env::var(&self.access_token_env).ok()?;
        let token = token.trim();
        if token.is_empty() || token == PLACEHOLDER_TOKEN {
            return None;
        }
        Some(token.to_string())
    }
}

fn default_root_path() -> String {
    "/RAG_Sources".to_string()
}
fn default_max_bytes_per_file() -> u64 {
    4_000_000
}
fn default_access_token_env() -> String {
    "DROPBOX_ACCESS_TOKEN".to_string()
}
fn default_api_url() -> String {
    "https://api.dropboxapi.com".to_string()
}
fn default_content_url() -> String {
    "https://content.dropboxapi.com".to_string()
}
fn default_download_concurrency() -> usize {
    8
}
fn default_store_timeout_secs() -> u64 {
    60
}

/// Sliding-window chunker settings, in characters.
#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    1200
}
fn default_overlap_chars() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (OpenAI-compatible gateway or Ollama host).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    256
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

impl Config {
    /// Check cross-field constraints. Called by [`load_config`].
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chars == 0 {
            bail!("chunking.max_chars must be > 0");
        }
        if self.chunking.overlap_chars == 0 || self.chunking.overlap_chars >= self.chunking.max_chars
        {
            bail!(
                "chunking.overlap_chars must satisfy 0 < overlap_chars < max_chars (got {} with max_chars {})",
                self.chunking.overlap_chars,
                self.chunking.max_chars
            );
        }

        if self.store.max_bytes_per_file == 0 {
            bail!("store.max_bytes_per_file must be > 0");
        }
        if self.store.download_concurrency == 0 {
            bail!("store.download_concurrency must be >= 1");
        }

        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }

        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be >= 1");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" | "local" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
                other
            ),
        }

        if self.embedding.is_enabled() && self.embedding.provider != "local" {
            if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.embedding.provider
                );
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to an all-defaults config.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }
}
