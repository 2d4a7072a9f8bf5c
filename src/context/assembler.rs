//! Deterministic assembly of retrieved evidence into answer context.
//!
//! Output is plain text with fixed section order: national evidence, trend
//! summary, policy recommendations, local data, disclosure note. Sections
//! with nothing to say are omitted entirely. Assembly never fails; a
//! collaborator error drops its section and nothing else.

use std::sync::Arc;

use tracing::debug;

use super::collaborators::{PolicyRecommender, RegionMetrics, TrendAnalyzer};
use crate::extract::{EntityBundle, QueryIntent};
use crate::graph::{AttrValue, Node, LOCATION_NAME_KEY};

/// The exact text returned when no evidence of any kind was found.
pub const NO_DATA_SENTINEL: &str =
    "No specific data found for the wealth groups or time periods in the question.";

/// Maximum policy recommendations rendered into context.
const MAX_RECOMMENDATIONS: usize = 3;

/// Enrichment results handed to the assembler.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentOutcome {
    /// Local nodes available for the query's locations.
    pub local_nodes: Vec<Node>,
    /// Locations that were requested but could not be resolved.
    pub unresolved: Vec<String>,
}

/// Builds the final context string from ranked evidence.
#[derive(Default)]
pub struct ContextAssembler {
    trend: Option<Arc<dyn TrendAnalyzer>>,
    policy: Option<Arc<dyn PolicyRecommender>>,
}

impl ContextAssembler {
    /// Create an assembler with no analysis collaborators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a trend analyzer.
    pub fn with_trend_analyzer(mut self, analyzer: Arc<dyn TrendAnalyzer>) -> Self {
        self.trend = Some(analyzer);
        self
    }

    /// Attach a policy recommender.
    pub fn with_policy_recommender(mut self, recommender: Arc<dyn PolicyRecommender>) -> Self {
        self.policy = Some(recommender);
        self
    }

    /// Assemble context from ranked national nodes and enrichment results.
    ///
    /// Never returns an error. When both the ranked set and the enrichment
    /// set are empty the exact no-data sentinel is returned, regardless of
    /// any unresolved locations.
    pub fn assemble(
        &self,
        ranked: &[Node],
        bundle: &EntityBundle,
        enrichment: &EnrichmentOutcome,
    ) -> String {
        if ranked.is_empty() && enrichment.local_nodes.is_empty() {
            return NO_DATA_SENTINEL.to_string();
        }

        let mut sections: Vec<String> = Vec::new();

        if !ranked.is_empty() {
            sections.push(render_national(ranked));
        }

        if bundle.intent == QueryIntent::Trend {
            if let Some(analyzer) = &self.trend {
                match analyzer.analyze(ranked) {
                    Ok(summary) => sections.push(format!(
                        "=== Trend analysis ===\n{} (direction: {}, {:+.1}%)",
                        summary.description, summary.direction, summary.growth_rate_pct
                    )),
                    Err(err) => debug!(error = %err, "trend analysis unavailable, section omitted"),
                }
            }
        }

        if bundle.intent == QueryIntent::Policy {
            if let Some(recommender) = &self.policy {
                let metrics = RegionMetrics::from_nodes(
                    ranked,
                    &enrichment.local_nodes,
                    bundle.geographic.first().map(String::as_str),
                );
                match recommender.recommend(&metrics) {
                    Ok(recs) if !recs.is_empty() => {
                        let mut lines = vec!["=== Policy recommendations ===".to_string()];
                        for rec in recs.iter().take(MAX_RECOMMENDATIONS) {
                            lines.push(format!(
                                "- {} (priority {:.1}): {}",
                                rec.title, rec.priority_score, rec.description
                            ));
                        }
                        sections.push(lines.join("\n"));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        debug!(error = %err, "policy recommendation unavailable, section omitted")
                    }
                }
            }
        }

        for node in &enrichment.local_nodes {
            sections.push(render_local(node));
        }

        if !enrichment.unresolved.is_empty() {
            sections.push(format!(
                "Note: no regional data is available for {}; the figures above reflect \
                 national statistics.",
                enrichment.unresolved.join(", ")
            ));
        }

        sections.join("\n\n")
    }
}

fn render_national(ranked: &[Node]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for node in ranked {
        lines.push(format!(
            "Type: {}, Category: {}, Date: {}",
            node.node_type, node.category, node.date
        ));
        for (key, value) in &node.attributes {
            if value.is_url() {
                continue;
            }
            lines.push(format!("{key}: {}", render_value(value)));
        }
    }
    lines.join("\n")
}

fn render_local(node: &Node) -> String {
    let name = node.location_name().unwrap_or(&node.category);
    let mut lines = vec![format!("=== Local data for {name} ===")];
    for (key, value) in &node.attributes {
        if key == LOCATION_NAME_KEY || value.is_url() {
            continue;
        }
        lines.push(format!("{key}: {}", render_value(value)));
    }
    lines.join("\n")
}

fn render_value(value: &AttrValue) -> String {
    match value {
        AttrValue::Number(n) => format_currency(*n),
        AttrValue::Text(s) => s.clone(),
    }
}

/// Render a numeric figure as currency. Values are stored in thousands of
/// dollars: magnitude >= 1,000 renders in billions with one decimal, smaller
/// values as thousands-separated dollars.
fn format_currency(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("${:.1}b", value / 1000.0)
    } else {
        format!("${}", group_thousands(value.round() as i64))
    }
}

fn group_thousands(value: i64) -> String {
    let negative = value < 0;
    let digits = value.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}
