//! Hybrid keyword + semantic search.

mod ranker;

pub use ranker::HybridRanker;
