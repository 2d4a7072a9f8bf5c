//! Collaborator trait for external regional-data lookup.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::graph::AttrValue;

/// A structured payload extracted from an external source for one location.
#[derive(Debug, Clone, Default)]
pub struct ExtractedRecord {
    /// Attribute map for the location (median income, home price, ...).
    pub attributes: BTreeMap<String, AttrValue>,
    /// Attribution for where the data came from.
    pub source: Option<String>,
}

impl ExtractedRecord {
    /// Add an attribute, builder-style.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the source attribution, builder-style.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Searches an external corpus for regional data and extracts a structured
/// record from it.
///
/// Implementations own the actual transport (web search API, scraper, test
/// fixture). The resolver handles graph-first short-circuiting, timeouts,
/// validation, and session memoization, so implementations stay simple.
#[async_trait]
pub trait SearchExtractProvider: Send + Sync {
    /// Fetch regional data for a location, preferring the given domains.
    async fn search_extract(
        &self,
        location: &str,
        preferred_domains: &[String],
    ) -> Result<ExtractedRecord>;
}
