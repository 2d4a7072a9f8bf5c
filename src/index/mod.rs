//! Vector similarity index with atomic snapshot rebuilds.

mod vector;

pub use vector::{cosine_similarity, ScoredNode, VectorIndex};
