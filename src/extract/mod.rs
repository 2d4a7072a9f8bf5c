//! Query entity extraction.

mod extractor;

pub use extractor::{EntityBundle, EntityExtractor, QueryIntent};
