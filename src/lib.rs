//! Hybrid retrieval and context assembly for regional wealth questions.
//!
//! The crate turns a natural-language question about wealth or income into
//! a grounded context string by combining:
//!
//! - **Entity extraction**: wealth-percentile, demographic, and geographic
//!   mentions plus a query intent ([`extract`])
//! - **A mutable knowledge graph**: typed evidence nodes with merge-upsert
//!   semantics and keyword indices ([`graph`])
//! - **Semantic search**: an in-memory vector index with atomic snapshot
//!   rebuilds ([`index`], [`embedding`])
//! - **Hybrid ranking**: keyword hits first, semantic fill, deterministic
//!   capping ([`search`])
//! - **On-demand enrichment**: external lookup for locations the graph has
//!   no data for, at most once per session ([`enrich`])
//! - **Context assembly**: deterministic sectioned rendering with optional
//!   trend and policy analysis ([`context`])
//!
//! # Example
//!
//! ```no_run
//! use wealthgraph::engine::RagEngine;
//!
//! # async fn run() -> wealthgraph::error::Result<()> {
//! let engine = RagEngine::builder().build()?;
//! engine.ingest(vec![]).await?;
//! let answer = engine.answer_context("How wealthy is the top 1% in Seattle?").await;
//! println!("{}", answer.context);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod embedding;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod graph;
pub mod index;
pub mod metrics;
pub mod search;
pub mod sources;

pub use config::Config;
pub use engine::{AnswerContext, ContextMetadata, RagEngine, RagEngineBuilder};
pub use error::{Result, WealthGraphError};
pub use graph::{AttrValue, Node, NodeRecord, NodeType};
