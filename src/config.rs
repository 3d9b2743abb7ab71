//! Configuration parsing and validation.
//!
//! The core is configured via a TOML file (default: `config/juris.toml`), with
//! the four contract environment variables from spec §6 applied as overrides
//! after the file is parsed: `LEGAL_MCP_INGEST_ROOT`, `EMBEDDING_ENDPOINTS`,
//! `VECTOR_STORE_PATH`, `CACHE_CAPACITY` / `CACHE_DEFAULT_TTL_SECONDS`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub ingest_root: IngestRootConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Directory of discovery-snapshot JSON files, one per source, loaded
    /// once at startup (spec §4.4). Not part of spec §6's environment
    /// contract — TOML-only.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { snapshot_dir: None }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestRootConfig {
    /// Absolute path to the allowlisted ingestion root (C1). Overridden by
    /// `LEGAL_MCP_INGEST_ROOT`. Created lazily if missing.
    pub root: PathBuf,
    #[serde(default = "default_max_text_bytes")]
    pub max_text_bytes: u64,
    #[serde(default = "default_max_converted_bytes")]
    pub max_converted_bytes: u64,
    #[serde(default = "default_allowed_suffixes")]
    pub allowed_suffixes: Vec<String>,
}

impl Default for IngestRootConfig {
    fn default() -> Self {
        Self {
            root: std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".agent/tmp"),
            max_text_bytes: default_max_text_bytes(),
            max_converted_bytes: default_max_converted_bytes(),
            allowed_suffixes: default_allowed_suffixes(),
        }
    }
}

fn default_max_text_bytes() -> u64 {
    2_000_000
}
fn default_max_converted_bytes() -> u64 {
    5_000_000
}
fn default_allowed_suffixes() -> Vec<String> {
    vec![".md".to_string(), ".markdown".to_string(), ".pdf".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size_chars")]
    pub chunk_size_chars: usize,
    #[serde(default = "default_chunk_overlap_chars")]
    pub chunk_overlap_chars: usize,
    #[serde(default)]
    pub max_chunks_per_document: Option<usize>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size_chars: default_chunk_size_chars(),
            chunk_overlap_chars: default_chunk_overlap_chars(),
            max_chunks_per_document: None,
        }
    }
}

fn default_chunk_size_chars() -> usize {
    1_200
}
fn default_chunk_overlap_chars() -> usize {
    150
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// Comma-separated HTTP embedding endpoints. Overridden by
    /// `EMBEDDING_ENDPOINTS`. Empty ⇒ in-process fallback (spec §4.2/§9).
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cooldown_secs")]
    pub unhealthy_cooldown_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            unhealthy_cooldown_secs: default_cooldown_secs(),
        }
    }
}

fn default_dims() -> usize {
    384
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_cooldown_secs() -> u64 {
    60
}

impl EmbeddingConfig {
    pub fn has_http_endpoints(&self) -> bool {
        !self.endpoints.is_empty()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    /// Directory for vector-store persistence. Overridden by
    /// `VECTOR_STORE_PATH`.
    pub path: PathBuf,
    #[serde(default = "default_ingest_worker_pool")]
    pub ingest_worker_pool: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/vector-store.sqlite"),
            ingest_worker_pool: default_ingest_worker_pool(),
        }
    }
}

fn default_ingest_worker_pool() -> usize {
    16
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub default_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            default_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_capacity() -> usize {
    1_000
}
fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8099".to_string()
}

/// Load configuration from `path`, then apply the contract environment
/// variables from spec §6 as overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "failed to parse config file")?
    } else {
        toml::from_str("").with_context(|| "failed to build default config")?
    };

    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(root) = std::env::var("LEGAL_MCP_INGEST_ROOT") {
        config.ingest_root.root = PathBuf::from(root);
    }
    if let Ok(endpoints) = std::env::var("EMBEDDING_ENDPOINTS") {
        config.embedding.endpoints = endpoints
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(path) = std::env::var("VECTOR_STORE_PATH") {
        config.vector_store.path = PathBuf::from(path);
    }
    if let Ok(capacity) = std::env::var("CACHE_CAPACITY") {
        if let Ok(v) = capacity.parse() {
            config.cache.capacity = v;
        }
    }
    if let Ok(ttl) = std::env::var("CACHE_DEFAULT_TTL_SECONDS") {
        if let Ok(v) = ttl.parse() {
            config.cache.default_ttl_secs = v;
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size_chars == 0 {
        anyhow::bail!("chunking.chunk_size_chars must be >= 1");
    }
    if config.chunking.chunk_overlap_chars >= config.chunking.chunk_size_chars {
        anyhow::bail!("chunking.chunk_overlap_chars must be < chunk_size_chars");
    }
    if config.cache.capacity == 0 {
        anyhow::bail!("cache.capacity must be >= 1");
    }
    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ingest_root: IngestRootConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            vector_store: VectorStoreConfig::default(),
            cache: CacheConfig::default(),
            catalog: CatalogConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn env_override_applies_embedding_endpoints() {
        std::env::set_var("EMBEDDING_ENDPOINTS", "http://a:9000, http://b:9000");
        let mut config = Config::default();
        apply_env_overrides(&mut config);
        assert_eq!(
            config.embedding.endpoints,
            vec!["http://a:9000".to_string(), "http://b:9000".to_string()]
        );
        std::env::remove_var("EMBEDDING_ENDPOINTS");
    }

    #[test]
    fn rejects_overlap_ge_size() {
        let mut config = Config::default();
        config.chunking.chunk_overlap_chars = config.chunking.chunk_size_chars;
        assert!(validate(&config).is_err());
    }
}
