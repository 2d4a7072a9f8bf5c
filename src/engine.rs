//! The retrieval engine: extraction, hybrid search, enrichment, assembly.
//!
//! `answer_context` walks a small state machine per query:
//!
//! ```text
//! START -> ENTITIES_EXTRACTED -> SEARCHED -> [ENRICHING -> RE_SEARCHED]
//!       -> ASSEMBLED -> DONE
//! ```
//!
//! Recovery paths never abort the query: an empty extraction falls back to
//! the default entity bundle, an empty search re-runs once with the default
//! bundle, a failed enrichment produces a disclosure note, and an
//! unavailable vector index degrades to keyword-only ranking.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CachedEmbedder, EmbeddingCache};
use crate::config::Config;
use crate::context::{ContextAssembler, EnrichmentOutcome, PolicyRecommender, TrendAnalyzer};
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::enrich::{GeoResolver, Resolution, SearchExtractProvider};
use crate::error::Result;
use crate::extract::{EntityBundle, EntityExtractor, QueryIntent};
use crate::graph::{GraphStore, Node, NodeRecord};
use crate::index::VectorIndex;
use crate::metrics::get_metrics;
use crate::search::HybridRanker;
use crate::sources::BulkSource;

/// Assembled context plus query diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerContext {
    /// The rendered context string, ready to hand to a language model.
    pub context: String,
    pub metadata: ContextMetadata,
}

/// Diagnostics describing how a context was produced.
#[derive(Debug, Clone, Serialize)]
pub struct ContextMetadata {
    pub intent: QueryIntent,
    pub entities: EntityBundle,
    /// Evidence nodes behind the context (national plus local).
    pub node_count: usize,
    pub enriched_locations: Vec<String>,
    pub unresolved_locations: Vec<String>,
    /// False when the vector index was unavailable and ranking was
    /// keyword-only.
    pub semantic_used: bool,
    pub elapsed_ms: u64,
}

/// Builder for [`RagEngine`].
#[derive(Default)]
pub struct RagEngineBuilder {
    config: Config,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    search_provider: Option<Arc<dyn SearchExtractProvider>>,
    trend_analyzer: Option<Arc<dyn TrendAnalyzer>>,
    policy_recommender: Option<Arc<dyn PolicyRecommender>>,
}

impl RagEngineBuilder {
    /// Use the given configuration instead of defaults.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Override the embedding provider built from configuration.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Enable geographic enrichment through the given provider.
    pub fn search_provider(mut self, provider: Arc<dyn SearchExtractProvider>) -> Self {
        self.search_provider = Some(provider);
        self
    }

    /// Enable trend summaries for trend-intent queries.
    pub fn trend_analyzer(mut self, analyzer: Arc<dyn TrendAnalyzer>) -> Self {
        self.trend_analyzer = Some(analyzer);
        self
    }

    /// Enable policy recommendations for policy-intent queries.
    pub fn policy_recommender(mut self, recommender: Arc<dyn PolicyRecommender>) -> Self {
        self.policy_recommender = Some(recommender);
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<RagEngine> {
        let provider = match self.embedding_provider {
            Some(provider) => provider,
            None => create_provider(&self.config.embedding)?,
        };
        let cache = EmbeddingCache::new(&self.config.cache);
        let embedder = CachedEmbedder::new(provider, cache);

        let store = Arc::new(GraphStore::new());
        let index = VectorIndex::new(embedder, self.config.index.similarity_floor);
        let resolver = self.search_provider.map(|provider| {
            GeoResolver::new(Arc::clone(&store), provider, &self.config.enrichment)
        });

        let mut assembler = ContextAssembler::new();
        if let Some(analyzer) = self.trend_analyzer {
            assembler = assembler.with_trend_analyzer(analyzer);
        }
        if let Some(recommender) = self.policy_recommender {
            assembler = assembler.with_policy_recommender(recommender);
        }

        Ok(RagEngine {
            ranker: HybridRanker::from_config(&self.config.engine),
            search_k: self.config.index.search_k,
            store,
            index,
            extractor: EntityExtractor::new(),
            assembler,
            resolver,
        })
    }
}

/// Hybrid retrieval engine over the wealth knowledge graph.
pub struct RagEngine {
    store: Arc<GraphStore>,
    index: VectorIndex,
    extractor: EntityExtractor,
    ranker: HybridRanker,
    assembler: ContextAssembler,
    resolver: Option<GeoResolver>,
    search_k: usize,
}

impl RagEngine {
    /// Start building an engine.
    pub fn builder() -> RagEngineBuilder {
        RagEngineBuilder::default()
    }

    /// Ingest bulk records and rebuild the vector index once.
    pub async fn ingest(&self, records: Vec<NodeRecord>) -> Result<usize> {
        let count = records.len();
        for record in records {
            self.store.upsert(Node::from(record));
        }
        self.index.rebuild(&self.store.all()).await?;
        info!(records = count, nodes = self.store.len(), "bulk ingest complete");
        Ok(count)
    }

    /// Ingest every record a bulk source holds.
    pub async fn ingest_from(&self, source: &dyn BulkSource) -> Result<usize> {
        let records = source.load().await?;
        self.ingest(records).await
    }

    /// Number of nodes currently in the graph.
    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    /// Direct access to the underlying graph store.
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Answer a query with assembled context.
    ///
    /// Never fails: every internal error degrades to a poorer context, down
    /// to the no-data sentinel.
    pub async fn answer_context(&self, query: &str) -> AnswerContext {
        let timer = Instant::now();
        get_metrics().queries_total.inc();

        let bundle = self.extractor.extract(query);
        debug!(state = "entities_extracted", intent = %bundle.intent,
               tags = ?bundle.flat, "query entities");

        let (mut ranked, mut semantic_used) = self.search(query, &bundle).await;
        debug!(state = "searched", hits = ranked.len(), "initial search");

        let enrichment = self.enrich(&bundle).await;
        if !enrichment.local_nodes.is_empty() {
            // Index mutation during enrichment warrants one re-search so the
            // fresh nodes can rank.
            debug!(state = "re_searched", "re-ranking after enrichment");
            let (retry, retry_semantic) = self.search(query, &bundle).await;
            ranked = retry;
            semantic_used = retry_semantic;
        }

        // Local nodes render in their own block; keep the national block
        // free of duplicates.
        let local_ids: HashSet<&String> =
            enrichment.local_nodes.iter().map(|n| &n.id).collect();
        ranked.retain(|node| !local_ids.contains(&node.id));

        // A national miss on specific entities gets one retry with the
        // default bundle so broad evidence still surfaces. Checked after the
        // enrichment re-search: a geographic-only query whose only hits are
        // local nodes still gets national fallback data alongside them.
        if ranked.is_empty() && bundle.flat != EntityBundle::default_bundle().flat {
            debug!(state = "search_empty", "re-searching with default bundle");
            let (retry, retry_semantic) =
                self.search(query, &EntityBundle::default_bundle()).await;
            ranked = retry;
            semantic_used = retry_semantic;
            ranked.retain(|node| !local_ids.contains(&node.id));
        }

        let context = self.assembler.assemble(&ranked, &bundle, &enrichment);
        debug!(state = "assembled", length = context.len(), "context ready");

        let elapsed = timer.elapsed();
        get_metrics()
            .query_duration_seconds
            .observe(elapsed.as_secs_f64());

        AnswerContext {
            context,
            metadata: ContextMetadata {
                intent: bundle.intent,
                node_count: ranked.len() + enrichment.local_nodes.len(),
                enriched_locations: enrichment
                    .local_nodes
                    .iter()
                    .filter_map(|n| n.location_name().map(str::to_string))
                    .collect(),
                unresolved_locations: enrichment.unresolved.clone(),
                entities: bundle,
                semantic_used,
                elapsed_ms: elapsed.as_millis() as u64,
            },
        }
    }

    /// One hybrid search pass. Index failures degrade to keyword-only.
    async fn search(&self, query: &str, bundle: &EntityBundle) -> (Vec<Node>, bool) {
        let keyword = self.ranker.keyword_candidates(&self.store, bundle);
        let (semantic, semantic_used) = match self.index.search(query, self.search_k).await {
            Ok(hits) => (hits, true),
            Err(err) => {
                warn!(state = "index_unavailable", error = %err,
                      "vector search failed, keyword-only ranking");
                (Vec::new(), false)
            }
        };
        (self.ranker.rank(keyword, semantic), semantic_used)
    }

    /// Resolve every geographic mention, rebuilding the index once when any
    /// resolution mutated the graph.
    async fn enrich(&self, bundle: &EntityBundle) -> EnrichmentOutcome {
        let mut outcome = EnrichmentOutcome::default();
        if bundle.geographic.is_empty() {
            return outcome;
        }

        let Some(resolver) = &self.resolver else {
            outcome.unresolved = bundle.geographic.clone();
            return outcome;
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut mutated = false;
        for location in &bundle.geographic {
            debug!(state = "enriching", location, "resolving location");
            match resolver.resolve(location).await {
                Resolution::Cached(nodes) => {
                    for node in nodes {
                        if seen.insert(node.id.clone()) {
                            outcome.local_nodes.push(node);
                        }
                    }
                }
                Resolution::Enriched(node) => {
                    mutated = true;
                    if seen.insert(node.id.clone()) {
                        outcome.local_nodes.push(node);
                    }
                }
                Resolution::Unavailable => {
                    debug!(state = "enrichment_failed", location, "no data available");
                    outcome.unresolved.push(location.clone());
                }
            }
        }

        if mutated {
            if let Err(err) = self.index.rebuild(&self.store.all()).await {
                warn!(error = %err, "post-enrichment index rebuild failed");
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NO_DATA_SENTINEL;
    use crate::graph::NodeType;

    fn record(node_type: NodeType, date: &str, category: &str, value: f64) -> NodeRecord {
        let node = Node::bulk(node_type, date, category).with_attr("Net worth", value);
        NodeRecord {
            node_type,
            date: node.date,
            category: node.category,
            attributes: node.attributes,
        }
    }

    #[tokio::test]
    async fn test_ingest_and_count() {
        let engine = RagEngine::builder().build().unwrap();
        let count = engine
            .ingest(vec![
                record(NodeType::Networth, "2020:Q1", "TopPt1", 15000.0),
                record(NodeType::Networth, "2020:Q1", "Bottom50", 1500.0),
            ])
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(engine.node_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_engine_returns_sentinel() {
        let engine = RagEngine::builder().build().unwrap();
        let answer = engine.answer_context("top 1% wealth").await;
        assert_eq!(answer.context, NO_DATA_SENTINEL);
        assert_eq!(answer.metadata.node_count, 0);
    }

    #[tokio::test]
    async fn test_keyword_hit_in_context() {
        let engine = RagEngine::builder().build().unwrap();
        engine
            .ingest(vec![record(NodeType::Networth, "2020:Q1", "TopPt1", 15000.0)])
            .await
            .unwrap();

        let answer = engine.answer_context("What is the top 1% net worth?").await;
        assert!(answer.context.contains("Net worth: $15.0b"));
        assert!(answer.metadata.node_count >= 1);
        assert!(answer.metadata.semantic_used);
    }

    #[tokio::test]
    async fn test_unresolved_location_without_resolver() {
        let engine = RagEngine::builder().build().unwrap();
        engine
            .ingest(vec![record(NodeType::Networth, "2020:Q1", "TopPt1", 15000.0)])
            .await
            .unwrap();

        let answer = engine.answer_context("top 1% wealth in Seattle").await;
        assert_eq!(answer.metadata.unresolved_locations, vec!["Seattle"]);
        assert!(answer.context.contains("no regional data is available for Seattle"));
    }
}
