//! Prometheus-compatible metrics for the wealthgraph engine.

use std::sync::Arc;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get or initialize the global metrics instance.
pub fn get_metrics() -> Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new())).clone()
}

/// Default histogram buckets for latency tracking (in seconds).
fn default_latency_buckets() -> Vec<f64> {
    vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
}

/// All metrics for the engine.
pub struct Metrics {
    /// Prometheus registry for all metrics.
    pub registry: Registry,

    /// Total number of context queries handled.
    pub queries_total: IntCounter,
    /// Total number of enrichment network calls attempted.
    pub enrichment_requests_total: IntCounter,
    /// Total number of enrichment attempts that produced no usable record.
    pub enrichment_failures_total: IntCounter,
    /// Total number of vector index rebuilds.
    pub index_rebuilds_total: IntCounter,
    /// Total number of embedding cache hits.
    pub cache_hits_total: IntCounter,
    /// Total number of embedding cache misses.
    pub cache_misses_total: IntCounter,

    /// Current number of nodes in the knowledge graph.
    pub graph_nodes: IntGauge,

    /// End-to-end context query duration in seconds.
    pub query_duration_seconds: Histogram,
    /// Vector index rebuild duration in seconds.
    pub rebuild_duration_seconds: Histogram,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with all metrics registered.
    pub fn new() -> Self {
        let registry = Registry::new();

        let queries_total = IntCounter::new(
            "wealthgraph_queries_total",
            "Total number of context queries handled",
        )
        .expect("failed to create counter");

        let enrichment_requests_total = IntCounter::new(
            "wealthgraph_enrichment_requests_total",
            "Total number of enrichment network calls attempted",
        )
        .expect("failed to create counter");

        let enrichment_failures_total = IntCounter::new(
            "wealthgraph_enrichment_failures_total",
            "Total number of enrichment attempts with no usable record",
        )
        .expect("failed to create counter");

        let index_rebuilds_total = IntCounter::new(
            "wealthgraph_index_rebuilds_total",
            "Total number of vector index rebuilds",
        )
        .expect("failed to create counter");

        let cache_hits_total = IntCounter::new(
            "wealthgraph_cache_hits_total",
            "Total number of embedding cache hits",
        )
        .expect("failed to create counter");

        let cache_misses_total = IntCounter::new(
            "wealthgraph_cache_misses_total",
            "Total number of embedding cache misses",
        )
        .expect("failed to create counter");

        let graph_nodes = IntGauge::new(
            "wealthgraph_graph_nodes",
            "Current number of nodes in the knowledge graph",
        )
        .expect("failed to create gauge");

        let query_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "wealthgraph_query_duration_seconds",
                "End-to-end context query duration in seconds",
            )
            .buckets(default_latency_buckets()),
        )
        .expect("failed to create histogram");

        let rebuild_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "wealthgraph_rebuild_duration_seconds",
                "Vector index rebuild duration in seconds",
            )
            .buckets(default_latency_buckets()),
        )
        .expect("failed to create histogram");

        registry
            .register(Box::new(queries_total.clone()))
            .expect("failed to register");
        registry
            .register(Box::new(enrichment_requests_total.clone()))
            .expect("failed to register");
        registry
            .register(Box::new(enrichment_failures_total.clone()))
            .expect("failed to register");
        registry
            .register(Box::new(index_rebuilds_total.clone()))
            .expect("failed to register");
        registry
            .register(Box::new(cache_hits_total.clone()))
            .expect("failed to register");
        registry
            .register(Box::new(cache_misses_total.clone()))
            .expect("failed to register");
        registry
            .register(Box::new(graph_nodes.clone()))
            .expect("failed to register");
        registry
            .register(Box::new(query_duration_seconds.clone()))
            .expect("failed to register");
        registry
            .register(Box::new(rebuild_duration_seconds.clone()))
            .expect("failed to register");

        Self {
            registry,
            queries_total,
            enrichment_requests_total,
            enrichment_failures_total,
            index_rebuilds_total,
            cache_hits_total,
            cache_misses_total,
            graph_nodes,
            query_duration_seconds,
            rebuild_duration_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        metrics.queries_total.inc();
        assert_eq!(metrics.queries_total.get(), 1);
    }

    #[test]
    fn test_global_metrics() {
        let m1 = get_metrics();
        let m2 = get_metrics();
        assert!(Arc::ptr_eq(&m1, &m2));
    }
}
