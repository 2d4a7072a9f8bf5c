//! Deterministic local embedding provider based on feature hashing.
//!
//! Tokenizes text into lowercase alphanumeric terms, hashes each term into a
//! fixed-dimension bucket with a sign bit, and L2-normalizes the result.
//! Texts sharing terms land near each other under cosine similarity, which is
//! what the hybrid ranker needs from semantic hits; there is no model to
//! download and the output is a pure function of the input text.

use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use super::EmbeddingProvider;
use crate::error::Result;

/// Feature-hashing embedding provider.
pub struct HashingEmbeddingProvider {
    dimension: usize,
    model_id: String,
}

impl HashingEmbeddingProvider {
    /// Create a provider with the given vector dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_id: format!("feature-hash-{dimension}"),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let h = hash_token(&token);
            let bucket = (h as usize) % self.dimension;
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn hash_token(token: &str) -> u64 {
    // DefaultHasher::new() is unkeyed, so identical text hashes identically
    // within a process; the exact-text cache contract needs no more.
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    token.hash(&mut hasher);
    hasher.finish()
}
