//! In-memory vector index over node embeddings.
//!
//! The index holds the embedded representation of every graph node's
//! canonical text. `rebuild` computes a complete new snapshot and swaps it in
//! atomically: concurrent `search` calls see either the fully-old or
//! fully-new snapshot, never a partial build.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::CachedEmbedder;
use crate::error::Result;
use crate::graph::Node;
use crate::metrics::get_metrics;

/// A node paired with its similarity to the query.
pub type ScoredNode = (Node, f32);

/// Vector similarity index over graph nodes.
pub struct VectorIndex {
    embedder: CachedEmbedder,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    similarity_floor: f32,
}

#[derive(Default)]
struct IndexSnapshot {
    entries: Vec<IndexEntry>,
}

struct IndexEntry {
    node: Node,
    vector: Vec<f32>,
}

impl VectorIndex {
    /// Create an empty index.
    pub fn new(embedder: CachedEmbedder, similarity_floor: f32) -> Self {
        Self {
            embedder,
            snapshot: RwLock::new(Arc::new(IndexSnapshot::default())),
            similarity_floor,
        }
    }

    /// The configured minimum similarity for returned hits.
    pub fn similarity_floor(&self) -> f32 {
        self.similarity_floor
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.snapshot.read().entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.snapshot.read().entries.is_empty()
    }

    /// Embed arbitrary text through the cached provider.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed_single(text).await
    }

    /// Rebuild the index from the given nodes and atomically swap it in.
    pub async fn rebuild(&self, nodes: &[Node]) -> Result<()> {
        let timer = std::time::Instant::now();

        let texts: Vec<String> = nodes.iter().map(Node::embedding_text).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let entries = nodes
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(node, vector)| IndexEntry { node, vector })
            .collect();

        *self.snapshot.write() = Arc::new(IndexSnapshot { entries });

        let metrics = get_metrics();
        metrics.index_rebuilds_total.inc();
        metrics
            .rebuild_duration_seconds
            .observe(timer.elapsed().as_secs_f64());
        debug!(nodes = nodes.len(), "vector index rebuilt");
        Ok(())
    }

    /// Return up to `k` nodes nearest to the query text, descending by
    /// cosine similarity, dropping entries below the similarity floor.
    ///
    /// An index that has never been built returns an empty slice, never an
    /// error.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredNode>> {
        let snapshot = Arc::clone(&self.snapshot.read());
        if snapshot.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_single(query).await?;

        let mut scored: Vec<ScoredNode> = snapshot
            .entries
            .iter()
            .map(|entry| {
                let similarity = cosine_similarity(&query_vector, &entry.vector);
                let mut node = entry.node.clone();
                node.similarity = Some(similarity);
                (node, similarity)
            })
            .filter(|(_, similarity)| *similarity >= self.similarity_floor)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Cosine similarity of two vectors; zero when either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
