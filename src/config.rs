//! Configuration for the wealthgraph engine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub enrichment: EnrichmentConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("wealthgraph.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("wealthgraph/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.engine.result_cap == 0 {
            return Err(ConfigError::Invalid("engine.result_cap must be > 0".to_string()).into());
        }

        if !(0.0..=1.0).contains(&self.index.similarity_floor) {
            return Err(ConfigError::Invalid(
                "index.similarity_floor must be in [0.0, 1.0]".to_string(),
            )
            .into());
        }

        if self.embedding.provider == EmbeddingProviderType::Api {
            if self.embedding.api.base_url.is_empty() {
                return Err(ConfigError::MissingField("embedding.api.base_url".to_string()).into());
            }
            if self.embedding.api.model.is_empty() {
                return Err(ConfigError::MissingField("embedding.api.model".to_string()).into());
            }
        }

        if self.embedding.dimension == 0 {
            return Err(
                ConfigError::Invalid("embedding.dimension must be > 0".to_string()).into(),
            );
        }

        Ok(())
    }
}

/// Engine-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of ranked nodes returned per query.
    pub result_cap: usize,
    /// Ranking strategy when the candidate set exceeds the cap.
    pub rank_mode: RankMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            result_cap: 10,
            rank_mode: RankMode::Recency,
        }
    }
}

/// Ranking strategy for over-cap candidate sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RankMode {
    /// Sort by date descending; the "unknown" sentinel sorts oldest.
    #[default]
    Recency,
    /// Sort by 0.7 * semantic score + 0.3 * keyword-hit flag.
    Combined,
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider type: "hashing" (local, deterministic) or "api".
    pub provider: EmbeddingProviderType,
    /// Vector dimension for the hashing provider.
    pub dimension: usize,
    /// API configuration (used when provider = "api").
    pub api: ApiEmbeddingConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Hashing,
            dimension: 384,
            api: ApiEmbeddingConfig::default(),
        }
    }
}

/// Embedding provider type enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    #[default]
    Hashing,
    Api,
}

/// OpenAI-compatible API embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEmbeddingConfig {
    pub base_url: String,
    pub model: String,
    /// API key; falls back to the OPENAI_API_KEY env var when absent.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiEmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Vector index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Minimum cosine similarity for a search hit to be returned.
    pub similarity_floor: f32,
    /// Number of nearest neighbors fetched per semantic search.
    pub search_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            similarity_floor: 0.3,
            search_k: 10,
        }
    }
}

/// Enrichment (geo resolver) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Timeout for the external search-and-extract call, in seconds.
    pub timeout_secs: u64,
    /// Extra preferred-domain hints (location slug -> domains), merged over
    /// the built-in map.
    pub domain_hints: std::collections::HashMap<String, Vec<String>>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            domain_hints: std::collections::HashMap::new(),
        }
    }
}

/// Embedding cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl_secs: 3600,
        }
    }
}
