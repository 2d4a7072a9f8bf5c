//! Entity extraction from natural-language wealth queries.
//!
//! Turns a free-text question into a typed entity bundle: geographic
//! mentions, wealth-percentile tags, demographic tags, and a query intent.
//! Extraction is pure string work (phrase maps, a metro gazetteer, and a
//! location heuristic) — cheap enough to run on every query, no network or
//! model calls.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Intent of a query, classified in fixed precedence order
/// trend > policy > comparison > general.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    #[default]
    General,
    Trend,
    Policy,
    Comparison,
}

impl std::fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueryIntent::General => "general",
            QueryIntent::Trend => "trend",
            QueryIntent::Policy => "policy",
            QueryIntent::Comparison => "comparison",
        };
        f.write_str(s)
    }
}

/// Structured extraction result for a query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityBundle {
    /// Geographic mentions, canonical casing.
    pub geographic: Vec<String>,
    /// Wealth-percentile tags (TopPt1, Next9, Next40, Bottom50, ...).
    pub wealth_groups: Vec<String>,
    /// Demographic/category tags (networth, income, race, ...).
    pub demographics: Vec<String>,
    /// Classified query intent.
    pub intent: QueryIntent,
    /// Union of all tags; never empty after extraction.
    pub flat: Vec<String>,
}

impl EntityBundle {
    /// The fixed fallback bundle used when a query yields no entity at all.
    pub fn default_bundle() -> Self {
        let wealth_groups = vec!["TopPt1".to_string(), "Bottom50".to_string()];
        Self {
            geographic: Vec::new(),
            flat: wealth_groups.clone(),
            wealth_groups,
            demographics: Vec::new(),
            intent: QueryIntent::General,
        }
    }

    /// Non-geographic search tags (wealth groups plus demographics).
    pub fn keyword_tags(&self) -> Vec<&str> {
        self.wealth_groups
            .iter()
            .chain(self.demographics.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Extracts typed entities from natural-language queries.
#[derive(Debug, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract a typed entity bundle from a query.
    ///
    /// Never returns an empty bundle: when no entity term is recognized the
    /// fixed default bundle is substituted so the pipeline always has
    /// search keys.
    pub fn extract(&self, query: &str) -> EntityBundle {
        let query_lower = query.to_lowercase();

        let mut wealth_groups = Vec::new();
        for (phrase, tag) in WEALTH_PHRASES {
            if phrase_matches(&query_lower, phrase) {
                push_unique(&mut wealth_groups, tag);
            }
        }

        let mut demographics = Vec::new();
        for (phrase, tag) in DEMOGRAPHIC_PHRASES {
            if phrase_matches(&query_lower, phrase) {
                push_unique(&mut demographics, tag);
            }
        }

        let geographic = self.extract_locations(query, &query_lower);
        let intent = classify_intent(&query_lower);

        let mut flat: Vec<String> = Vec::new();
        for tag in wealth_groups.iter().chain(&demographics).chain(&geographic) {
            push_unique(&mut flat, tag);
        }

        if flat.is_empty() {
            tracing::debug!(query, "no entities recognized, substituting default bundle");
            return EntityBundle::default_bundle();
        }

        EntityBundle {
            geographic,
            wealth_groups,
            demographics,
            intent,
            flat,
        }
    }

    /// Geographic mentions: gazetteer substring matches unioned with a
    /// capitalized-phrase heuristic after location prepositions.
    fn extract_locations(&self, query: &str, query_lower: &str) -> Vec<String> {
        let mut locations: Vec<String> = Vec::new();

        for metro in METRO_GAZETTEER {
            if query_lower.contains(&metro.to_lowercase()) {
                push_unique(&mut locations, metro);
            }
        }

        for caps in LOCATION_PATTERN.captures_iter(query) {
            if let Some(candidate) = caps.get(1) {
                let candidate = candidate.as_str().trim();
                if is_plausible_location(candidate)
                    && !locations
                        .iter()
                        .any(|known| known.eq_ignore_ascii_case(candidate))
                {
                    locations.push(candidate.to_string());
                }
            }
        }

        locations
    }
}

/// Match a phrase against the lowercased query. Single alphabetic words are
/// matched on word boundaries ("age" must not fire inside "mortgage");
/// multi-word or symbol-bearing phrases match as substrings.
fn phrase_matches(query_lower: &str, phrase: &str) -> bool {
    if phrase.chars().all(|c| c.is_ascii_alphabetic()) && !phrase.contains(' ') {
        query_lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word == phrase)
    } else {
        query_lower.contains(phrase)
    }
}

fn classify_intent(query_lower: &str) -> QueryIntent {
    // Fixed precedence: trend > policy > comparison > general.
    if TREND_KEYWORDS.iter().any(|k| phrase_matches(query_lower, k)) {
        QueryIntent::Trend
    } else if POLICY_KEYWORDS.iter().any(|k| phrase_matches(query_lower, k)) {
        QueryIntent::Policy
    } else if COMPARISON_KEYWORDS.iter().any(|k| phrase_matches(query_lower, k)) {
        QueryIntent::Comparison
    } else {
        QueryIntent::General
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}

fn is_plausible_location(candidate: &str) -> bool {
    if candidate.len() < 3 {
        return false;
    }
    let lower = candidate.to_lowercase();
    !NON_LOCATION_WORDS.iter().any(|w| *w == lower)
        && !WEALTH_PHRASES.iter().any(|(p, _)| *p == lower)
        && !DEMOGRAPHIC_PHRASES.iter().any(|(p, _)| *p == lower)
}

// ============================================================================
// Static phrase maps
// ============================================================================

/// Wealth-percentile phrases -> percentile tags.
static WEALTH_PHRASES: &[(&str, &str)] = &[
    ("top 0.1%", "TopPt1"),
    ("top 1%", "TopPt1"),
    ("top one percent", "TopPt1"),
    ("richest", "TopPt1"),
    ("wealthy", "TopPt1"),
    ("next 9", "Next9"),
    ("next 40", "Next40"),
    ("middle class", "Next40"),
    ("bottom 50", "Bottom50"),
    ("bottom half", "Bottom50"),
    ("poorest", "Bottom50"),
    ("remaining top 1", "RemainingTop1"),
];

/// Demographic/category phrases -> node type tags.
static DEMOGRAPHIC_PHRASES: &[(&str, &str)] = &[
    ("net worth", "networth"),
    ("wealth", "networth"),
    ("assets", "networth"),
    ("income", "income"),
    ("race", "race"),
    ("racial", "race"),
    ("age", "age"),
    ("education", "education"),
    ("generation", "generation"),
];

/// Curated metro names matched case-insensitively by substring, catching
/// mentions the capitalization heuristic misses.
static METRO_GAZETTEER: &[&str] = &[
    "Silicon Valley",
    "Bay Area",
    "Seattle",
    "San Francisco",
    "Austin",
    "Boston",
    "New York",
    "Los Angeles",
    "Denver",
    "Portland",
    "King County",
];

static TREND_KEYWORDS: &[&str] = &[
    "trend",
    "trends",
    "over time",
    "history",
    "historical",
    "historically",
    "change",
    "changed",
    "changing",
    "growth",
    "grown",
    "evolution",
    "evolved",
    "since",
];

static POLICY_KEYWORDS: &[&str] = &[
    "policy",
    "policies",
    "recommend",
    "recommendation",
    "recommendations",
    "intervention",
    "interventions",
    "solution",
    "solutions",
    "what should",
    "what can be done",
    "address",
    "reduce inequality",
];

static COMPARISON_KEYWORDS: &[&str] = &[
    "compare",
    "compared",
    "comparison",
    "versus",
    "vs",
    "difference",
    "between",
    "gap",
    "disparity",
];

/// Capitalized phrase following a location preposition.
static LOCATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:in|near|around|about|across|from|for)\s+([A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+){0,2})")
        .expect("Invalid regex")
});

/// Capitalized words that the location heuristic must not treat as places.
static NON_LOCATION_WORDS: &[&str] = &[
    "the", "what", "how", "why", "when", "who", "which", "top", "bottom", "net", "worth",
    "wealth", "income", "america", "q1", "q2", "q3", "q4",
];

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wealth_group_extraction() {
        let extractor = EntityExtractor::new();
        let bundle = extractor.extract("What is the top 1% wealth in 2020?");
        assert_eq!(bundle.wealth_groups, vec!["TopPt1"]);
        assert!(bundle.demographics.contains(&"networth".to_string()));
        assert_eq!(bundle.intent, QueryIntent::General);
    }

    #[test]
    fn test_multiple_groups() {
        let extractor = EntityExtractor::new();
        let bundle =
            extractor.extract("How do the richest compare to the bottom half on income?");
        assert!(bundle.wealth_groups.contains(&"TopPt1".to_string()));
        assert!(bundle.wealth_groups.contains(&"Bottom50".to_string()));
        assert!(bundle.demographics.contains(&"income".to_string()));
        assert_eq!(bundle.intent, QueryIntent::Comparison);
    }

    #[test]
    fn test_default_bundle_on_unrecognized_query() {
        let extractor = EntityExtractor::new();
        let bundle = extractor.extract("hello there, nice weather today");
        assert_eq!(bundle.wealth_groups, vec!["TopPt1", "Bottom50"]);
        assert!(bundle.demographics.is_empty());
        assert!(bundle.geographic.is_empty());
        assert_eq!(bundle.intent, QueryIntent::General);
        assert_eq!(bundle.flat, vec!["TopPt1", "Bottom50"]);
    }

    #[test]
    fn test_gazetteer_location() {
        let extractor = EntityExtractor::new();
        let bundle = extractor.extract("Tell me about Seattle");
        assert_eq!(bundle.geographic, vec!["Seattle"]);
        assert!(bundle.flat.contains(&"Seattle".to_string()));
    }

    #[test]
    fn test_gazetteer_case_insensitive() {
        let extractor = EntityExtractor::new();
        let bundle = extractor.extract("wealth in silicon valley and the bay area");
        assert!(bundle.geographic.contains(&"Silicon Valley".to_string()));
        assert!(bundle.geographic.contains(&"Bay Area".to_string()));
    }

    #[test]
    fn test_heuristic_location_outside_gazetteer() {
        let extractor = EntityExtractor::new();
        let bundle = extractor.extract("What is median income in Tacoma?");
        assert!(bundle.geographic.contains(&"Tacoma".to_string()));
    }

    #[test]
    fn test_heuristic_rejects_common_words() {
        let extractor = EntityExtractor::new();
        let bundle = extractor.extract("Tell me about Wealth in The country");
        assert!(bundle.geographic.is_empty());
    }

    #[test]
    fn test_intent_precedence_trend_over_comparison() {
        let extractor = EntityExtractor::new();
        // "gap" alone would classify as comparison; "over time" wins.
        let bundle = extractor.extract("How has the wealth gap changed over time?");
        assert_eq!(bundle.intent, QueryIntent::Trend);
    }

    #[test]
    fn test_intent_policy() {
        let extractor = EntityExtractor::new();
        let bundle = extractor.extract("What policies could help the bottom 50%?");
        assert_eq!(bundle.intent, QueryIntent::Policy);
    }

    #[test]
    fn test_intent_comparison() {
        let extractor = EntityExtractor::new();
        let bundle = extractor.extract("Compare income for the top 1% and middle class");
        assert_eq!(bundle.intent, QueryIntent::Comparison);
    }

    #[test]
    fn test_word_boundary_matching() {
        let extractor = EntityExtractor::new();
        // "age" must not fire inside "mortgage", "wage", or "average"
        let bundle = extractor.extract("average mortgage wage data for the top 1%");
        assert!(!bundle.demographics.contains(&"age".to_string()));
    }

    #[test]
    fn test_tags_deduplicated() {
        let extractor = EntityExtractor::new();
        let bundle = extractor.extract("the richest and wealthy top 1%");
        assert_eq!(
            bundle.wealth_groups.iter().filter(|t| *t == "TopPt1").count(),
            1
        );
    }

    #[test]
    fn test_keyword_tags_excludes_geo() {
        let extractor = EntityExtractor::new();
        let bundle = extractor.extract("top 1% wealth in Seattle");
        let tags = bundle.keyword_tags();
        assert!(tags.contains(&"TopPt1"));
        assert!(!tags.contains(&"Seattle"));
    }
}
