//! On-demand geographic enrichment of the knowledge graph.

mod resolver;
mod traits;

pub use resolver::{GeoResolver, Resolution, RETRIEVED_KEY};
pub use traits::{ExtractedRecord, SearchExtractProvider};
