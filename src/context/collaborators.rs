//! Analysis collaborators consulted during context assembly.
//!
//! Trend analysis and policy recommendation are pluggable: the assembler
//! calls whichever implementation it was built with and silently omits the
//! section when the call fails. Built-in implementations cover the common
//! case; tests swap in fakes.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::{AttrValue, Node, NodeType};

/// Direction of a wealth trend over the analyzed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Falling,
    Flat,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrendDirection::Rising => "rising",
            TrendDirection::Falling => "falling",
            TrendDirection::Flat => "flat",
        };
        f.write_str(s)
    }
}

/// Summary of how a tracked quantity moved over the evidence window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSummary {
    pub description: String,
    pub direction: TrendDirection,
    pub growth_rate_pct: f64,
}

/// A single policy recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRecommendation {
    pub title: String,
    pub description: String,
    pub priority_score: f64,
}

/// Aggregate metrics derived from the evidence set, fed to the policy
/// recommender.
#[derive(Debug, Clone, Default)]
pub struct RegionMetrics {
    /// Location the query asked about, when any.
    pub location: Option<String>,
    /// Most recent top-0.1% net worth figure (thousands of dollars).
    pub top_networth: Option<f64>,
    /// Most recent bottom-50% net worth figure (thousands of dollars).
    pub bottom_networth: Option<f64>,
    /// Median household income from regional data, when available.
    pub median_income: Option<f64>,
    /// Total evidence nodes behind these metrics.
    pub node_count: usize,
}

impl RegionMetrics {
    /// Derive metrics from ranked national nodes and enriched local nodes.
    pub fn from_nodes(ranked: &[Node], local: &[Node], location: Option<&str>) -> Self {
        let mut metrics = RegionMetrics {
            location: location.map(str::to_string),
            node_count: ranked.len() + local.len(),
            ..Default::default()
        };

        // Most recent figure per percentile bucket wins.
        let mut top_date = "";
        let mut bottom_date = "";
        for node in ranked {
            if node.node_type != NodeType::Networth {
                continue;
            }
            let value = node.attributes.get("Net worth").and_then(AttrValue::as_number);
            let Some(value) = value else { continue };
            if node.category == "TopPt1" && node.date_sort_key() >= top_date {
                top_date = node.date_sort_key();
                metrics.top_networth = Some(value);
            }
            if node.category == "Bottom50" && node.date_sort_key() >= bottom_date {
                bottom_date = node.date_sort_key();
                metrics.bottom_networth = Some(value);
            }
        }

        for node in local {
            for (key, value) in &node.attributes {
                if key.to_lowercase().contains("income") {
                    if let Some(n) = value.as_number() {
                        metrics.median_income = Some(n);
                    }
                }
            }
        }

        metrics
    }

    /// Ratio of top to bottom net worth, when both are known and positive.
    pub fn wealth_gap_ratio(&self) -> Option<f64> {
        match (self.top_networth, self.bottom_networth) {
            (Some(top), Some(bottom)) if bottom > 0.0 => Some(top / bottom),
            _ => None,
        }
    }
}

/// Analyzes a ranked evidence set for trends.
pub trait TrendAnalyzer: Send + Sync {
    fn analyze(&self, nodes: &[Node]) -> Result<TrendSummary>;
}

/// Produces policy recommendations from regional metrics.
pub trait PolicyRecommender: Send + Sync {
    fn recommend(&self, metrics: &RegionMetrics) -> Result<Vec<PolicyRecommendation>>;
}

/// Built-in trend analyzer comparing the oldest and newest net worth figures
/// within the dominant category of the evidence set.
#[derive(Debug, Default)]
pub struct QuarterlyTrendAnalyzer;

impl TrendAnalyzer for QuarterlyTrendAnalyzer {
    fn analyze(&self, nodes: &[Node]) -> Result<TrendSummary> {
        let mut dated: Vec<&Node> = nodes
            .iter()
            .filter(|n| {
                !n.date_sort_key().is_empty()
                    && n.attributes.get("Net worth").and_then(AttrValue::as_number).is_some()
            })
            .collect();
        if dated.len() < 2 {
            return Err(crate::error::WealthGraphError::Analysis(
                "not enough dated observations for a trend".to_string(),
            ));
        }
        dated.sort_by(|a, b| a.date_sort_key().cmp(b.date_sort_key()));

        let first = dated[0];
        let last = dated[dated.len() - 1];
        let start = first
            .attributes
            .get("Net worth")
            .and_then(AttrValue::as_number)
            .unwrap_or(0.0);
        let end = last
            .attributes
            .get("Net worth")
            .and_then(AttrValue::as_number)
            .unwrap_or(0.0);

        let growth_rate_pct = if start.abs() > f64::EPSILON {
            (end - start) / start.abs() * 100.0
        } else {
            0.0
        };
        let direction = if growth_rate_pct > 1.0 {
            TrendDirection::Rising
        } else if growth_rate_pct < -1.0 {
            TrendDirection::Falling
        } else {
            TrendDirection::Flat
        };

        Ok(TrendSummary {
            description: format!(
                "Net worth moved {:.1}% between {} and {} ({} observations)",
                growth_rate_pct,
                first.date,
                last.date,
                dated.len()
            ),
            direction,
            growth_rate_pct,
        })
    }
}

/// Built-in rule-based recommender keyed off the wealth gap and income
/// metrics.
#[derive(Debug, Default)]
pub struct GapPolicyRecommender;

impl PolicyRecommender for GapPolicyRecommender {
    fn recommend(&self, metrics: &RegionMetrics) -> Result<Vec<PolicyRecommendation>> {
        let mut recs = Vec::new();

        if let Some(ratio) = metrics.wealth_gap_ratio() {
            if ratio > 10.0 {
                recs.push(PolicyRecommendation {
                    title: "Progressive wealth taxation".to_string(),
                    description: format!(
                        "Top-to-bottom net worth ratio is {ratio:.0}x; progressive taxation \
                         targets concentration at the top of the distribution"
                    ),
                    priority_score: (ratio / 10.0).min(10.0),
                });
            }
        }
        if metrics.bottom_networth.map(|v| v <= 0.0).unwrap_or(false) {
            recs.push(PolicyRecommendation {
                title: "Asset-building programs".to_string(),
                description: "Bottom-half net worth is at or below zero; matched savings and \
                              first-home programs build household assets"
                    .to_string(),
                priority_score: 9.0,
            });
        }
        if metrics.median_income.is_some() && metrics.location.is_some() {
            recs.push(PolicyRecommendation {
                title: "Regional affordability review".to_string(),
                description: format!(
                    "Local income data is available for {}; benchmark housing costs against it",
                    metrics.location.as_deref().unwrap_or_default()
                ),
                priority_score: 5.0,
            });
        }

        recs.sort_by(|a, b| {
            b.priority_score
                .partial_cmp(&a.priority_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(recs)
    }
}
