//! Knowledge graph: typed evidence nodes with merge-upsert and keyword lookup.

mod store;
mod types;

pub use store::GraphStore;
pub use types::{
    slugify, AttrValue, Node, NodeRecord, NodeType, LOCATION_NAME_KEY, SOURCE_KEY, UNKNOWN_DATE,
};
