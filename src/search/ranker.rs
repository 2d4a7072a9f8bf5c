//! Hybrid ranking of keyword and semantic search results.
//!
//! Keyword hits are exact evidence (a tag or id literally matched the query
//! entities) and always rank ahead of semantic hits. Semantic hits fill in
//! when the keyword branch finds nothing or when the merged set stays under
//! the cap. Ranking is deterministic: the same candidate sets always produce
//! the same output order.

use std::collections::HashSet;

use tracing::debug;

use crate::config::{EngineConfig, RankMode};
use crate::extract::EntityBundle;
use crate::graph::{GraphStore, Node};
use crate::index::ScoredNode;

/// Merges keyword and semantic candidates into a capped, ordered result set.
#[derive(Debug, Clone)]
pub struct HybridRanker {
    result_cap: usize,
    rank_mode: RankMode,
}

impl HybridRanker {
    /// Create a ranker with an explicit cap and mode.
    pub fn new(result_cap: usize, rank_mode: RankMode) -> Self {
        Self {
            result_cap,
            rank_mode,
        }
    }

    /// Create a ranker from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.result_cap, config.rank_mode)
    }

    /// The configured result cap.
    pub fn result_cap(&self) -> usize {
        self.result_cap
    }

    /// Keyword branch: graph lookups for every entity tag in the bundle.
    ///
    /// Each tag is matched against the tag index and the id substring index;
    /// geographic mentions are additionally matched against stored location
    /// names. Results are deduplicated by id in first-hit order.
    pub fn keyword_candidates(&self, store: &GraphStore, bundle: &EntityBundle) -> Vec<Node> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates: Vec<Node> = Vec::new();

        for tag in &bundle.flat {
            for node in store.by_tag(tag).into_iter().chain(store.by_id_substring(tag)) {
                if seen.insert(node.id.clone()) {
                    candidates.push(node);
                }
            }
        }
        for location in &bundle.geographic {
            for node in store.by_geo_slug(location) {
                if seen.insert(node.id.clone()) {
                    candidates.push(node);
                }
            }
        }

        debug!(
            tags = bundle.flat.len(),
            hits = candidates.len(),
            "keyword search complete"
        );
        candidates
    }

    /// Merge keyword and semantic candidates into the final ranked set.
    ///
    /// Keyword hits come first; semantic hits that are not already present
    /// follow in similarity order. When the merged set exceeds the cap the
    /// configured rank mode decides which candidates survive.
    pub fn rank(&self, keyword: Vec<Node>, semantic: Vec<ScoredNode>) -> Vec<Node> {
        let keyword_ids: HashSet<String> = keyword.iter().map(|n| n.id.clone()).collect();

        let mut merged = keyword;
        for (node, _) in semantic {
            if !keyword_ids.contains(&node.id) {
                merged.push(node);
            }
        }

        if merged.len() > self.result_cap {
            match self.rank_mode {
                RankMode::Recency => {
                    merged.sort_by(|a, b| {
                        b.date_sort_key()
                            .cmp(a.date_sort_key())
                            .then_with(|| a.id.cmp(&b.id))
                    });
                }
                RankMode::Combined => {
                    merged.sort_by(|a, b| {
                        let score_a = combined_score(a, &keyword_ids);
                        let score_b = combined_score(b, &keyword_ids);
                        score_b
                            .partial_cmp(&score_a)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then_with(|| a.id.cmp(&b.id))
                    });
                }
            }
            merged.truncate(self.result_cap);
        }

        merged
    }
}

/// Weighted blend of semantic similarity and a keyword-hit flag.
fn combined_score(node: &Node, keyword_ids: &HashSet<String>) -> f32 {
    let semantic = node.similarity.unwrap_or(0.0);
    let keyword = if keyword_ids.contains(&node.id) { 1.0 } else { 0.0 };
    0.7 * semantic + 0.3 * keyword
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::EntityExtractor;
    use crate::graph::NodeType;

    fn node(date: &str, category: &str) -> Node {
        Node::bulk(NodeType::Networth, date, category)
    }

    fn seeded_store() -> GraphStore {
        let store = GraphStore::new();
        store.upsert(node("2020:Q1", "TopPt1").with_attr("Net worth", 15000.0));
        store.upsert(node("2019:Q4", "TopPt1"));
        store.upsert(node("2020:Q1", "Bottom50"));
        store.upsert(Node::bulk(NodeType::Income, "2020:Q1", "TopPt1"));
        store.upsert(Node::local("Seattle").with_attr("Population", 750_000.0));
        store
    }

    #[test]
    fn test_keyword_candidates_by_tag() {
        let ranker = HybridRanker::new(10, RankMode::Recency);
        let store = seeded_store();
        let bundle = EntityExtractor::new().extract("top 1% wealth");

        let hits = ranker.keyword_candidates(&store, &bundle);
        let ids: Vec<&str> = hits.iter().map(|n| n.id.as_str()).collect();
        assert!(ids.contains(&"networth_2020:Q1_TopPt1"));
        assert!(ids.contains(&"income_2020:Q1_TopPt1"));
        // Deduplicated even though TopPt1 matches both tag and id substring
        let unique: HashSet<&&str> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_keyword_candidates_geo() {
        let ranker = HybridRanker::new(10, RankMode::Recency);
        let store = seeded_store();
        let bundle = EntityExtractor::new().extract("wealth in Seattle");

        let hits = ranker.keyword_candidates(&store, &bundle);
        assert!(hits.iter().any(|n| n.id == "local_seattle"));
    }

    #[test]
    fn test_keyword_hits_rank_first() {
        let ranker = HybridRanker::new(10, RankMode::Recency);
        let keyword = vec![node("2019:Q4", "TopPt1")];
        let semantic = vec![(node("2021:Q1", "Next9"), 0.9)];

        let ranked = ranker.rank(keyword, semantic);
        assert_eq!(ranked[0].id, "networth_2019:Q4_TopPt1");
        assert_eq!(ranked[1].id, "networth_2021:Q1_Next9");
    }

    #[test]
    fn test_semantic_only_when_keyword_empty() {
        let ranker = HybridRanker::new(10, RankMode::Recency);
        let semantic = vec![
            (node("2020:Q1", "TopPt1"), 0.8),
            (node("2019:Q4", "Bottom50"), 0.5),
        ];

        let ranked = ranker.rank(Vec::new(), semantic);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "networth_2020:Q1_TopPt1");
    }

    #[test]
    fn test_dedupe_by_id() {
        let ranker = HybridRanker::new(10, RankMode::Recency);
        let keyword = vec![node("2020:Q1", "TopPt1")];
        let semantic = vec![(node("2020:Q1", "TopPt1"), 0.99)];

        let ranked = ranker.rank(keyword, semantic);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_over_cap_truncates_by_recency() {
        let ranker = HybridRanker::new(3, RankMode::Recency);
        let keyword = vec![
            node("unknown", "A"),
            node("2018:Q1", "B"),
            node("2021:Q3", "C"),
            node("2020:Q2", "D"),
        ];

        let ranked = ranker.rank(keyword, Vec::new());
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].date, "2021:Q3");
        assert_eq!(ranked[1].date, "2020:Q2");
        assert_eq!(ranked[2].date, "2018:Q1");
        // The unknown sentinel sorts oldest and is dropped first
        assert!(!ranked.iter().any(|n| n.date == "unknown"));
    }

    #[test]
    fn test_under_cap_preserves_order() {
        let ranker = HybridRanker::new(10, RankMode::Recency);
        let keyword = vec![node("2018:Q1", "Old"), node("2021:Q3", "New")];

        // No re-sort under the cap: keyword order is evidence order
        let ranked = ranker.rank(keyword, Vec::new());
        assert_eq!(ranked[0].date, "2018:Q1");
        assert_eq!(ranked[1].date, "2021:Q3");
    }

    #[test]
    fn test_rank_idempotent() {
        let ranker = HybridRanker::new(2, RankMode::Recency);
        let keyword = vec![node("2020:Q1", "A"), node("2020:Q1", "B"), node("2021:Q1", "C")];

        let first = ranker.rank(keyword.clone(), Vec::new());
        let second = ranker.rank(keyword, Vec::new());
        let first_ids: Vec<&String> = first.iter().map(|n| &n.id).collect();
        let second_ids: Vec<&String> = second.iter().map(|n| &n.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_combined_mode_prefers_keyword_and_similarity() {
        let ranker = HybridRanker::new(2, RankMode::Combined);
        let mut kw = node("2018:Q1", "KW");
        kw.similarity = Some(0.4);
        let mut high = node("2020:Q1", "High");
        high.similarity = Some(0.9);
        let mut low = node("2021:Q1", "Low");
        low.similarity = Some(0.1);

        let ranked = ranker.rank(vec![kw], vec![(high, 0.9), (low, 0.1)]);
        assert_eq!(ranked.len(), 2);
        // 0.9*0.7=0.63 beats keyword 0.4*0.7+0.3=0.58 beats 0.1*0.7=0.07
        assert_eq!(ranked[0].category, "High");
        assert_eq!(ranked[1].category, "KW");
    }
}
