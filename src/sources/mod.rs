//! Bulk ingestion sources for the knowledge graph.
//!
//! A source is read once at engine startup; everything after that flows
//! through upserts and enrichment.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::graph::NodeRecord;

/// Supplies the initial batch of evidence records.
#[async_trait]
pub trait BulkSource: Send + Sync {
    /// Load every record the source holds.
    async fn load(&self) -> Result<Vec<NodeRecord>>;
}

/// In-memory source, mainly for tests and embedding callers that already
/// hold their records.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<NodeRecord>,
}

impl MemorySource {
    /// Create a source over the given records.
    pub fn new(records: Vec<NodeRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl BulkSource for MemorySource {
    async fn load(&self) -> Result<Vec<NodeRecord>> {
        Ok(self.records.clone())
    }
}

/// Source reading a JSON array of records from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Create a source over a JSON file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl BulkSource for JsonFileSource {
    async fn load(&self) -> Result<Vec<NodeRecord>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let records: Vec<NodeRecord> = serde_json::from_str(&content)?;
        Ok(records)
    }
}
