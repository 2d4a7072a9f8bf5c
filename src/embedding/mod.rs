//! Embedding providers for vector representations of node text.
//!
//! Two providers are available:
//!
//! - [`HashingEmbeddingProvider`]: deterministic local feature hashing.
//!   No model download, pure function of the input text. The default.
//! - [`ApiEmbeddingProvider`]: OpenAI-compatible API provider.
//!
//! Both are wrapped in a [`CachedEmbedder`](crate::cache::CachedEmbedder)
//! keyed by exact text before they reach the vector index.

mod api;
mod hashing;
mod traits;

pub use api::ApiEmbeddingProvider;
pub use hashing::HashingEmbeddingProvider;
pub use traits::EmbeddingProvider;

use std::sync::Arc;

use crate::config::{EmbeddingConfig, EmbeddingProviderType};
use crate::error::Result;

/// Create an embedding provider from configuration.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderType::Hashing => {
            Ok(Arc::new(HashingEmbeddingProvider::new(config.dimension)))
        }
        EmbeddingProviderType::Api => {
            let provider = ApiEmbeddingProvider::from_config(&config.api)?;
            Ok(Arc::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_default() {
        let config = EmbeddingConfig::default();
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.dimension(), 384);
    }

    #[test]
    fn test_create_provider_api_missing_key() {
        std::env::remove_var("OPENAI_API_KEY");

        let mut config = EmbeddingConfig::default();
        config.provider = EmbeddingProviderType::Api;
        config.api.api_key = None;

        assert!(create_provider(&config).is_err());
    }
}
