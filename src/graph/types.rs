//! Node types for the knowledge graph.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Attribute key carrying the human-readable location name on enriched nodes.
pub const LOCATION_NAME_KEY: &str = "Location Name";

/// Attribute key carrying the source attribution on enriched nodes.
pub const SOURCE_KEY: &str = "Source";

/// Date sentinel used when a record carries no date.
pub const UNKNOWN_DATE: &str = "unknown";

/// Type of an evidence node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Networth,
    Income,
    Race,
    Age,
    Education,
    Generation,
    /// Enriched regional data fetched on demand.
    Local,
}

impl NodeType {
    /// The lowercase string form used in node ids and rendered context.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Networth => "networth",
            NodeType::Income => "income",
            NodeType::Race => "race",
            NodeType::Age => "age",
            NodeType::Education => "education",
            NodeType::Generation => "generation",
            NodeType::Local => "local",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "networth" | "net worth" => Ok(NodeType::Networth),
            "income" => Ok(NodeType::Income),
            "race" => Ok(NodeType::Race),
            "age" => Ok(NodeType::Age),
            "education" => Ok(NodeType::Education),
            "generation" => Ok(NodeType::Generation),
            "local" => Ok(NodeType::Local),
            other => Err(format!("unknown node type: {other}")),
        }
    }
}

/// A scalar attribute value.
///
/// Attribute maps are open per source but values are a closed variant, never
/// arbitrary JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Number(f64),
    Text(String),
}

impl AttrValue {
    /// Numeric view of the value, if it is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Text(_) => None,
        }
    }

    /// Text view of the value, if it is a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Number(_) => None,
        }
    }

    /// Whether the value carries no information (empty or whitespace text).
    pub fn is_empty(&self) -> bool {
        match self {
            AttrValue::Number(_) => false,
            AttrValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Whether the value looks like a URL. URL-valued attributes are skipped
    /// in canonical text and rendered context.
    pub fn is_url(&self) -> bool {
        match self {
            AttrValue::Text(s) => {
                let s = s.trim_start();
                s.starts_with("http://") || s.starts_with("https://") || s.starts_with("www.")
            }
            AttrValue::Number(_) => false,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Render whole numbers without a trailing ".0"
            AttrValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            AttrValue::Number(n) => write!(f, "{n}"),
            AttrValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Number(n as f64)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

/// An atomic evidence record in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable id: `{type}_{date}_{category}` for bulk records,
    /// `local_{slug}` for enriched records.
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// `"YYYY:Qn"` or the `"unknown"` sentinel.
    pub date: String,
    /// Grouping label: a wealth-percentile bucket, demographic bucket, or
    /// location slug.
    pub category: String,
    /// Open per-source field map. Numeric financial fields are stored in
    /// thousands-of-dollars units unless otherwise labeled.
    pub attributes: BTreeMap<String, AttrValue>,
    /// Transient similarity score set during a vector-search pass. Never
    /// persisted or merged.
    #[serde(skip)]
    pub similarity: Option<f32>,
}

impl Node {
    /// Create a bulk node with the canonical `{type}_{date}_{category}` id.
    pub fn bulk(node_type: NodeType, date: impl Into<String>, category: impl Into<String>) -> Self {
        let date = date.into();
        let category = category.into();
        Self {
            id: format!("{}_{}_{}", node_type.as_str(), date, category),
            node_type,
            date,
            category,
            attributes: BTreeMap::new(),
            similarity: None,
        }
    }

    /// Create a local (enriched) node with the canonical `local_{slug}` id.
    pub fn local(location_name: impl Into<String>) -> Self {
        let name = location_name.into();
        let slug = slugify(&name);
        let mut attributes = BTreeMap::new();
        attributes.insert(LOCATION_NAME_KEY.to_string(), AttrValue::Text(name));
        Self {
            id: format!("local_{slug}"),
            node_type: NodeType::Local,
            date: UNKNOWN_DATE.to_string(),
            category: slug,
            attributes,
            similarity: None,
        }
    }

    /// Set an attribute, builder-style.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// The location name attribute, if present.
    pub fn location_name(&self) -> Option<&str> {
        self.attributes.get(LOCATION_NAME_KEY).and_then(AttrValue::as_text)
    }

    /// Merge another node's fields into this one.
    ///
    /// Incoming non-empty fields overwrite; fields absent from the incoming
    /// payload are preserved. Attribute maps merge key-wise. The transient
    /// similarity score is never merged.
    pub fn merge_from(&mut self, incoming: &Node) {
        self.node_type = incoming.node_type;
        if !incoming.date.trim().is_empty() && incoming.date != UNKNOWN_DATE {
            self.date = incoming.date.clone();
        }
        if !incoming.category.trim().is_empty() {
            self.category = incoming.category.clone();
        }
        for (key, value) in &incoming.attributes {
            if !value.is_empty() {
                self.attributes.insert(key.clone(), value.clone());
            }
        }
    }

    /// Canonical text rendering used for embedding: required fields followed
    /// by every non-URL attribute, in deterministic order.
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![
            format!("type: {}", self.node_type),
            format!("category: {}", self.category),
            format!("date: {}", self.date),
        ];
        for (key, value) in &self.attributes {
            if value.is_url() {
                continue;
            }
            parts.push(format!("{key}: {value}"));
        }
        parts.join(" ")
    }

    /// Sort key for date-recency ranking: the unknown sentinel sorts as the
    /// oldest possible value.
    pub fn date_sort_key(&self) -> &str {
        if self.date == UNKNOWN_DATE || self.date.trim().is_empty() {
            ""
        } else {
            &self.date
        }
    }
}

/// A raw record supplied by a bulk ingestion source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub date: String,
    pub category: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        let mut node = Node::bulk(record.node_type, record.date, record.category);
        node.attributes = record.attributes;
        node
    }
}

/// Normalize a location name into a stable slug: trimmed, lowercased,
/// whitespace runs collapsed to a single underscore.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_id_derivation() {
        let node = Node::bulk(NodeType::Networth, "2020:Q1", "TopPt1");
        assert_eq!(node.id, "networth_2020:Q1_TopPt1");
    }

    #[test]
    fn test_local_id_derivation() {
        let node = Node::local("King County");
        assert_eq!(node.id, "local_king_county");
        assert_eq!(node.node_type, NodeType::Local);
        assert_eq!(node.location_name(), Some("King County"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  San   Francisco "), "san_francisco");
        assert_eq!(slugify("Seattle"), "seattle");
    }

    #[test]
    fn test_merge_preserves_absent_fields() {
        let mut existing = Node::bulk(NodeType::Networth, "2020:Q1", "TopPt1")
            .with_attr("Net worth", 15000.0);
        let incoming =
            Node::bulk(NodeType::Networth, "2020:Q1", "TopPt1").with_attr("Assets", 20000.0);
        existing.merge_from(&incoming);
        assert_eq!(
            existing.attributes.get("Net worth"),
            Some(&AttrValue::Number(15000.0))
        );
        assert_eq!(
            existing.attributes.get("Assets"),
            Some(&AttrValue::Number(20000.0))
        );
    }

    #[test]
    fn test_merge_nonempty_overwrites() {
        let mut existing =
            Node::bulk(NodeType::Networth, "2020:Q1", "TopPt1").with_attr("Net worth", 1.0);
        let incoming =
            Node::bulk(NodeType::Networth, "2020:Q1", "TopPt1").with_attr("Net worth", 3.0);
        existing.merge_from(&incoming);
        assert_eq!(
            existing.attributes.get("Net worth"),
            Some(&AttrValue::Number(3.0))
        );
    }

    #[test]
    fn test_merge_skips_empty_text() {
        let mut existing =
            Node::bulk(NodeType::Local, "2020:Q1", "seattle").with_attr("Source", "seattle.gov");
        let incoming = Node::bulk(NodeType::Local, "2020:Q1", "seattle").with_attr("Source", "  ");
        existing.merge_from(&incoming);
        assert_eq!(
            existing.attributes.get("Source").and_then(AttrValue::as_text),
            Some("seattle.gov")
        );
    }

    #[test]
    fn test_embedding_text_skips_urls() {
        let node = Node::local("Seattle")
            .with_attr("Population", 750_000.0)
            .with_attr("Report", "https://seattle.gov/report.pdf");
        let text = node.embedding_text();
        assert!(text.contains("Population: 750000"));
        assert!(text.contains("category: seattle"));
        assert!(!text.contains("https://"));
    }

    #[test]
    fn test_date_sort_key_sentinel() {
        let known = Node::bulk(NodeType::Networth, "2020:Q1", "TopPt1");
        let unknown = Node::bulk(NodeType::Networth, UNKNOWN_DATE, "TopPt1");
        assert!(known.date_sort_key() > unknown.date_sort_key());
    }

    #[test]
    fn test_attr_value_display() {
        assert_eq!(AttrValue::Number(750000.0).to_string(), "750000");
        assert_eq!(AttrValue::Number(12.5).to_string(), "12.5");
        assert_eq!(AttrValue::Text("hi".into()).to_string(), "hi");
    }

    #[test]
    fn test_node_type_roundtrip() {
        for t in [
            NodeType::Networth,
            NodeType::Income,
            NodeType::Race,
            NodeType::Age,
            NodeType::Education,
            NodeType::Generation,
            NodeType::Local,
        ] {
            assert_eq!(t.as_str().parse::<NodeType>().unwrap(), t);
        }
    }
}
