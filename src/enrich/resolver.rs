//! On-demand geographic enrichment.
//!
//! When a query mentions a location the graph has no data for, the resolver
//! asks an external search-and-extract provider for regional figures and
//! inserts the result as a `local_{slug}` node. Three rules keep this cheap
//! and bounded:
//!
//! - graph first: if any node already matches the location slug, no network
//!   call is made at all
//! - at most once per session: every attempted slug is memoized, including
//!   failures, so a location is never fetched twice
//! - bounded: the external call runs under a timeout and its payload must
//!   carry at least one substantive attribute to be accepted

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::traits::{ExtractedRecord, SearchExtractProvider};
use crate::config::EnrichmentConfig;
use crate::error::EnrichmentError;
use crate::graph::{slugify, GraphStore, Node, LOCATION_NAME_KEY, SOURCE_KEY};
use crate::metrics::get_metrics;

/// Attribute key recording when an enriched node was fetched.
pub const RETRIEVED_KEY: &str = "Retrieved";

/// Outcome of a location resolution.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Matching nodes were already in the graph; no external call was made.
    Cached(Vec<Node>),
    /// A fresh node was fetched, validated, and inserted into the graph.
    Enriched(Node),
    /// No data could be obtained. The negative outcome is memoized for the
    /// session, so the location will not be retried.
    Unavailable,
}

/// Resolves location mentions into graph nodes, enriching on demand.
pub struct GeoResolver {
    store: Arc<GraphStore>,
    provider: Arc<dyn SearchExtractProvider>,
    timeout: Duration,
    domain_hints: HashMap<String, Vec<String>>,
    /// Slugs attempted this session, successes and failures alike. The lock
    /// is held across the external call so concurrent queries for the same
    /// location coalesce into a single fetch.
    attempts: Mutex<HashSet<String>>,
}

impl GeoResolver {
    /// Create a resolver over the given graph and provider.
    pub fn new(
        store: Arc<GraphStore>,
        provider: Arc<dyn SearchExtractProvider>,
        config: &EnrichmentConfig,
    ) -> Self {
        let mut domain_hints = builtin_domain_hints();
        for (slug, domains) in &config.domain_hints {
            domain_hints.insert(slugify(slug), domains.clone());
        }
        Self {
            store,
            provider,
            timeout: Duration::from_secs(config.timeout_secs),
            domain_hints,
            attempts: Mutex::new(HashSet::new()),
        }
    }

    /// Resolve a location mention.
    ///
    /// Checks the graph first, then the session memo, and only then goes to
    /// the external provider. Never returns an error: failures become
    /// [`Resolution::Unavailable`].
    pub async fn resolve(&self, location: &str) -> Resolution {
        let slug = slugify(location);
        if slug.is_empty() {
            return Resolution::Unavailable;
        }

        let existing = self.store.by_geo_slug(location);
        if !existing.is_empty() {
            debug!(location, hits = existing.len(), "location already in graph");
            return Resolution::Cached(existing);
        }

        let mut attempts = self.attempts.lock().await;
        if attempts.contains(&slug) {
            debug!(location, "enrichment already attempted this session");
            return Resolution::Unavailable;
        }
        // A concurrent resolve for the same slug may have filled the graph
        // while we waited on the lock.
        let existing = self.store.by_geo_slug(location);
        if !existing.is_empty() {
            return Resolution::Cached(existing);
        }
        attempts.insert(slug.clone());

        match self.fetch(location, &slug).await {
            Ok(node) => Resolution::Enriched(node),
            Err(err) => {
                get_metrics().enrichment_failures_total.inc();
                warn!(location, error = %err, "enrichment failed");
                Resolution::Unavailable
            }
        }
    }

    async fn fetch(
        &self,
        location: &str,
        slug: &str,
    ) -> std::result::Result<Node, EnrichmentError> {
        let domains = self.domain_hints.get(slug).cloned().unwrap_or_default();

        // A hinted search that comes back empty gets one unrestricted retry.
        let record = match self.fetch_once(location, &domains).await {
            Ok(record) => record,
            Err(err) if !domains.is_empty() => {
                debug!(location, error = %err, "hinted search empty, retrying unrestricted");
                self.fetch_once(location, &[]).await?
            }
            Err(err) => return Err(err),
        };

        let mut node = Node::local(location);
        for (key, value) in record.attributes {
            if key != LOCATION_NAME_KEY && !value.is_empty() {
                node.attributes.insert(key, value);
            }
        }
        if let Some(source) = record.source {
            node.attributes.insert(SOURCE_KEY.to_string(), source.into());
        }
        node.attributes.insert(
            RETRIEVED_KEY.to_string(),
            chrono::Utc::now().format("%Y-%m-%d").to_string().into(),
        );

        self.store.upsert(node.clone());
        debug!(location, id = %node.id, "enriched node inserted");
        Ok(node)
    }

    /// One timed call to the external provider, validated for usefulness.
    async fn fetch_once(
        &self,
        location: &str,
        domains: &[String],
    ) -> std::result::Result<ExtractedRecord, EnrichmentError> {
        get_metrics().enrichment_requests_total.inc();
        let record = tokio::time::timeout(
            self.timeout,
            self.provider.search_extract(location, domains),
        )
        .await
        .map_err(|_| EnrichmentError::Timeout(self.timeout.as_secs()))?
        .map_err(|e| EnrichmentError::Provider(e.to_string()))?;

        if !is_useful(&record) {
            return Err(EnrichmentError::NotUseful(location.to_string()));
        }
        Ok(record)
    }
}

/// A payload is useful when it carries at least one substantive attribute
/// beyond the location's own name and source attribution.
fn is_useful(record: &ExtractedRecord) -> bool {
    record
        .attributes
        .iter()
        .any(|(key, value)| key != LOCATION_NAME_KEY && key != SOURCE_KEY && !value.is_empty())
}

fn builtin_domain_hints() -> HashMap<String, Vec<String>> {
    let entries: [(&str, &[&str]); 4] = [
        ("seattle", &["seattle.gov", "kingcounty.gov"]),
        ("san_francisco", &["sfgov.org", "sf.gov"]),
        ("new_york", &["ny.gov", "nyc.gov"]),
        ("king_county", &["kingcounty.gov"]),
    ];
    entries
        .into_iter()
        .map(|(slug, domains)| {
            (
                slug.to_string(),
                domains.iter().map(|d| d.to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::graph::AttrValue;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        record: ExtractedRecord,
        domains_seen: parking_lot::Mutex<Vec<String>>,
    }

    impl CountingProvider {
        fn new(record: ExtractedRecord) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                record,
                domains_seen: parking_lot::Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchExtractProvider for CountingProvider {
        async fn search_extract(
            &self,
            _location: &str,
            preferred_domains: &[String],
        ) -> Result<ExtractedRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.domains_seen.lock().extend(preferred_domains.iter().cloned());
            Ok(self.record.clone())
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl SearchExtractProvider for SlowProvider {
        async fn search_extract(&self, _: &str, _: &[String]) -> Result<ExtractedRecord> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ExtractedRecord::default())
        }
    }

    fn useful_record() -> ExtractedRecord {
        ExtractedRecord::default()
            .with_attr("Median Household Income", 110_000.0)
            .with_source("seattle.gov")
    }

    fn resolver_with(
        store: Arc<GraphStore>,
        provider: Arc<CountingProvider>,
    ) -> GeoResolver {
        GeoResolver::new(store, provider, &EnrichmentConfig::default())
    }

    #[tokio::test]
    async fn test_graph_first_skips_network() {
        let store = Arc::new(GraphStore::new());
        store.upsert(Node::local("Seattle").with_attr("Population", 750_000.0));
        let provider = Arc::new(CountingProvider::new(useful_record()));
        let resolver = resolver_with(Arc::clone(&store), Arc::clone(&provider));

        let outcome = resolver.resolve("Seattle").await;
        assert!(matches!(outcome, Resolution::Cached(nodes) if nodes.len() == 1));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_enrichment_inserts_node() {
        let store = Arc::new(GraphStore::new());
        let provider = Arc::new(CountingProvider::new(useful_record()));
        let resolver = resolver_with(Arc::clone(&store), Arc::clone(&provider));

        let outcome = resolver.resolve("Seattle").await;
        let node = match outcome {
            Resolution::Enriched(node) => node,
            other => panic!("expected enrichment, got {other:?}"),
        };
        assert_eq!(node.id, "local_seattle");
        assert_eq!(node.location_name(), Some("Seattle"));
        assert_eq!(
            node.attributes.get("Median Household Income"),
            Some(&AttrValue::Number(110_000.0))
        );
        assert_eq!(
            node.attributes.get(SOURCE_KEY).and_then(AttrValue::as_text),
            Some("seattle.gov")
        );
        assert!(node.attributes.contains_key(RETRIEVED_KEY));
        assert_eq!(store.by_geo_slug("Seattle").len(), 1);
    }

    #[tokio::test]
    async fn test_at_most_once_per_session() {
        let store = Arc::new(GraphStore::new());
        let provider = Arc::new(CountingProvider::new(useful_record()));
        let resolver = resolver_with(Arc::clone(&store), Arc::clone(&provider));

        resolver.resolve("Seattle").await;
        // Second resolve hits the graph, not the provider
        let outcome = resolver.resolve("Seattle").await;
        assert!(matches!(outcome, Resolution::Cached(_)));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_attempt_not_retried() {
        let store = Arc::new(GraphStore::new());
        // Record with no substantive attributes fails validation
        let provider = Arc::new(CountingProvider::new(
            ExtractedRecord::default().with_source("nowhere.gov"),
        ));
        let resolver = resolver_with(Arc::clone(&store), Arc::clone(&provider));

        assert!(matches!(resolver.resolve("Nowhere").await, Resolution::Unavailable));
        assert!(matches!(resolver.resolve("Nowhere").await, Resolution::Unavailable));
        assert_eq!(provider.call_count(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_maps_to_unavailable() {
        let store = Arc::new(GraphStore::new());
        let config = EnrichmentConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        let resolver = GeoResolver::new(store, Arc::new(SlowProvider), &config);

        assert!(matches!(resolver.resolve("Seattle").await, Resolution::Unavailable));
    }

    #[tokio::test]
    async fn test_preferred_domains_passed() {
        let store = Arc::new(GraphStore::new());
        let provider = Arc::new(CountingProvider::new(useful_record()));
        let resolver = resolver_with(store, Arc::clone(&provider));

        resolver.resolve("San Francisco").await;
        let domains = provider.domains_seen.lock().clone();
        assert!(domains.contains(&"sfgov.org".to_string()));
        assert!(domains.contains(&"sf.gov".to_string()));
    }

    struct HintedFailsProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SearchExtractProvider for HintedFailsProvider {
        async fn search_extract(
            &self,
            _location: &str,
            preferred_domains: &[String],
        ) -> Result<ExtractedRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if preferred_domains.is_empty() {
                Ok(useful_record())
            } else {
                Ok(ExtractedRecord::default())
            }
        }
    }

    #[tokio::test]
    async fn test_unrestricted_fallback_after_empty_hinted_search() {
        let store = Arc::new(GraphStore::new());
        let provider = Arc::new(HintedFailsProvider {
            calls: AtomicUsize::new(0),
        });
        let resolver = GeoResolver::new(
            Arc::clone(&store),
            Arc::clone(&provider) as Arc<dyn SearchExtractProvider>,
            &EnrichmentConfig::default(),
        );

        let outcome = resolver.resolve("Seattle").await;
        assert!(matches!(outcome, Resolution::Enriched(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.by_geo_slug("Seattle").len(), 1);
    }

    #[tokio::test]
    async fn test_config_hints_override_builtin() {
        let store = Arc::new(GraphStore::new());
        let provider = Arc::new(CountingProvider::new(useful_record()));
        let mut config = EnrichmentConfig::default();
        config
            .domain_hints
            .insert("Seattle".to_string(), vec!["data.seattle.gov".to_string()]);
        let resolver =
            GeoResolver::new(store, Arc::clone(&provider) as Arc<dyn SearchExtractProvider>, &config);

        resolver.resolve("Seattle").await;
        let domains = provider.domains_seen.lock().clone();
        assert_eq!(domains, vec!["data.seattle.gov".to_string()]);
    }
}
