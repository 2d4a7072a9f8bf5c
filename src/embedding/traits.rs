//! Embedding trait definitions.

use async_trait::async_trait;

/// Trait for embedding providers.
///
/// Implementations must be deterministic: identical input text yields an
/// identical vector, so exact-text caching is sound.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for text.
    async fn embed(&self, texts: &[String]) -> crate::error::Result<Vec<Vec<f32>>>;

    /// Return the embedding dimension.
    fn dimension(&self) -> usize;

    /// Model identifier, used for cache keys.
    fn model_id(&self) -> &str;
}
