//! Embedding cache keyed by exact text.
//!
//! The cache is owned by the engine instance and injected where needed, so
//! separate engine instances (e.g. in tests) never share state.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::config::CacheConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, Result};
use crate::metrics::get_metrics;

/// Hash key for the embedding cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmbeddingKey {
    text: String,
    model: String,
}

impl EmbeddingKey {
    /// Create a new embedding key.
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
        }
    }
}

/// Cache for text embeddings, keyed by exact text and model.
#[derive(Clone)]
pub struct EmbeddingCache {
    entries: Cache<EmbeddingKey, Arc<Vec<f32>>>,
    enabled: bool,
}

impl EmbeddingCache {
    /// Create a new cache from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .build();
        Self {
            entries,
            enabled: config.enabled,
        }
    }

    /// Create a disabled cache.
    pub fn disabled() -> Self {
        Self {
            entries: Cache::builder().max_capacity(0).build(),
            enabled: false,
        }
    }

    /// Get a cached embedding.
    pub async fn get(&self, key: &EmbeddingKey) -> Option<Arc<Vec<f32>>> {
        if !self.enabled {
            return None;
        }
        let result = self.entries.get(key).await;
        let metrics = get_metrics();
        if result.is_some() {
            metrics.cache_hits_total.inc();
        } else {
            metrics.cache_misses_total.inc();
        }
        result
    }

    /// Store an embedding.
    pub async fn set(&self, key: EmbeddingKey, embedding: Vec<f32>) {
        if !self.enabled {
            return;
        }
        self.entries.insert(key, Arc::new(embedding)).await;
    }

    /// Number of cached entries.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

/// Wrapper adding exact-text caching to any embedding provider.
pub struct CachedEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
}

impl CachedEmbedder {
    /// Create a new cached embedder.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, cache: EmbeddingCache) -> Self {
        Self { provider, cache }
    }

    /// The embedding dimension of the underlying provider.
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Embed texts, consulting the cache per text.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.provider.model_id().to_string();
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut to_embed: Vec<(usize, String)> = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let key = EmbeddingKey::new(text.clone(), model.clone());
            if let Some(cached) = self.cache.get(&key).await {
                results[i] = Some((*cached).clone());
            } else {
                to_embed.push((i, text.clone()));
            }
        }

        if !to_embed.is_empty() {
            let texts_to_embed: Vec<String> = to_embed.iter().map(|(_, t)| t.clone()).collect();
            let embeddings = self.provider.embed(&texts_to_embed).await?;
            if embeddings.len() != texts_to_embed.len() {
                return Err(EmbeddingError::EmptyResponse.into());
            }
            for ((idx, text), embedding) in to_embed.into_iter().zip(embeddings) {
                let key = EmbeddingKey::new(text, model.clone());
                self.cache.set(key, embedding.clone()).await;
                results[idx] = Some(embedding);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    /// Embed a single text with caching.
    pub async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmptyResponse.into())
    }
}
