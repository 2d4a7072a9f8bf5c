//! In-memory knowledge graph store.
//!
//! Holds typed evidence nodes keyed by stable id with merge-upsert semantics
//! and secondary indices for keyword lookup:
//! - a hash index over type and category tags
//! - a trigram posting-list index over node ids for substring queries
//!
//! All operations are safe under concurrent readers and occasional writers;
//! an upsert is atomic with respect to other writes on the same id because
//! the merge happens under a single write lock.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use super::types::{slugify, Node};
use crate::metrics::get_metrics;

/// The mutable collection of evidence nodes.
#[derive(Default)]
pub struct GraphStore {
    inner: RwLock<GraphInner>,
}

#[derive(Default)]
struct GraphInner {
    nodes: HashMap<String, Node>,
    /// Lowercased type/category tag -> node ids.
    by_tag: HashMap<String, HashSet<String>>,
    /// Lowercased id trigram -> node ids containing it.
    trigrams: HashMap<String, HashSet<String>>,
}

impl GraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge a node.
    ///
    /// If a node with the same id exists, incoming non-empty fields overwrite
    /// and absent fields are preserved (field-level merge). Returns true when
    /// a new node was created.
    pub fn upsert(&self, node: Node) -> bool {
        let mut inner = self.inner.write();
        let created = match inner.nodes.get_mut(&node.id) {
            Some(existing) => {
                let old_tags = tags_of(existing);
                existing.merge_from(&node);
                let new_tags = tags_of(existing);
                let id = node.id.clone();
                for tag in old_tags.difference(&new_tags) {
                    if let Some(ids) = inner.by_tag.get_mut(tag) {
                        ids.remove(&id);
                    }
                }
                for tag in new_tags {
                    inner.by_tag.entry(tag).or_default().insert(id.clone());
                }
                false
            }
            None => {
                let id = node.id.clone();
                for tag in tags_of(&node) {
                    inner.by_tag.entry(tag).or_default().insert(id.clone());
                }
                for tri in trigrams_of(&id.to_lowercase()) {
                    inner.trigrams.entry(tri).or_default().insert(id.clone());
                }
                inner.nodes.insert(id, node);
                true
            }
        };
        get_metrics().graph_nodes.set(inner.nodes.len() as i64);
        created
    }

    /// Get a node by exact id.
    pub fn get(&self, id: &str) -> Option<Node> {
        self.inner.read().nodes.get(id).cloned()
    }

    /// Nodes whose type or category equals the tag (case-insensitive).
    pub fn by_tag(&self, tag: &str) -> Vec<Node> {
        let inner = self.inner.read();
        inner
            .by_tag
            .get(&tag.to_lowercase())
            .map(|ids| {
                let mut nodes: Vec<Node> =
                    ids.iter().filter_map(|id| inner.nodes.get(id).cloned()).collect();
                nodes.sort_by(|a, b| a.id.cmp(&b.id));
                nodes
            })
            .unwrap_or_default()
    }

    /// Nodes whose id contains the fragment (case-insensitive).
    ///
    /// Fragments of three or more characters use the trigram index; shorter
    /// fragments fall back to a key scan.
    pub fn by_id_substring(&self, fragment: &str) -> Vec<Node> {
        let fragment = fragment.to_lowercase();
        if fragment.is_empty() {
            return Vec::new();
        }
        let inner = self.inner.read();

        let mut matches: Vec<Node> = if fragment.chars().count() >= 3 {
            let mut candidate_ids: Option<HashSet<&String>> = None;
            for tri in trigrams_of(&fragment) {
                let posting = match inner.trigrams.get(&tri) {
                    Some(ids) => ids.iter().collect::<HashSet<_>>(),
                    None => return Vec::new(),
                };
                candidate_ids = Some(match candidate_ids {
                    Some(acc) => acc.intersection(&posting).copied().collect(),
                    None => posting,
                });
            }
            candidate_ids
                .unwrap_or_default()
                .into_iter()
                // Trigram intersection can produce false positives; verify.
                .filter(|id| id.to_lowercase().contains(&fragment))
                .filter_map(|id| inner.nodes.get(id).cloned())
                .collect()
        } else {
            inner
                .nodes
                .iter()
                .filter(|(id, _)| id.to_lowercase().contains(&fragment))
                .map(|(_, node)| node.clone())
                .collect()
        };

        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches
    }

    /// Nodes whose location-name attribute matches the slug exactly or by
    /// substring (case-insensitive, slug-normalized).
    pub fn by_geo_slug(&self, slug: &str) -> Vec<Node> {
        let wanted = slugify(slug);
        if wanted.is_empty() {
            return Vec::new();
        }
        let inner = self.inner.read();
        let mut matches: Vec<Node> = inner
            .nodes
            .values()
            .filter(|node| {
                node.location_name()
                    .map(|name| {
                        let stored = slugify(name);
                        stored == wanted || stored.contains(&wanted) || wanted.contains(&stored)
                    })
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches
    }

    /// Snapshot of every node in the graph.
    pub fn all(&self) -> Vec<Node> {
        self.inner.read().nodes.values().cloned().collect()
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Whether the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.inner.read().nodes.is_empty()
    }
}

fn tags_of(node: &Node) -> HashSet<String> {
    let mut tags = HashSet::with_capacity(2);
    tags.insert(node.node_type.as_str().to_string());
    if !node.category.trim().is_empty() {
        tags.insert(node.category.to_lowercase());
    }
    tags
}

fn trigrams_of(text: &str) -> HashSet<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < 3 {
        return HashSet::new();
    }
    chars.windows(3).map(|w| w.iter().collect()).collect()
}
