//! Error types for the wealthgraph engine.

use thiserror::Error;

/// Main error type for wealthgraph operations.
///
/// Errors in this crate are caught at collaborator boundaries and converted
/// to empty/absent results; nothing propagates out of
/// [`RagEngine::answer_context`](crate::engine::RagEngine::answer_context).
#[derive(Error, Debug)]
pub enum WealthGraphError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] EnrichmentError),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Embedding-related errors.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Empty response from provider")]
    EmptyResponse,
}

/// Vector index errors.
///
/// An unavailable index is non-fatal: the engine degrades to keyword-only
/// ranking when `search` fails.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Index rebuild failed: {0}")]
    Rebuild(String),

    #[error("Index unavailable: {0}")]
    Unavailable(String),
}

/// Enrichment errors.
///
/// All of these resolve to an absent record at the resolver boundary; the
/// negative outcome is cached for the session.
#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("Search provider error: {0}")]
    Provider(String),

    #[error("Timeout after {0}s")]
    Timeout(u64),

    #[error("Payload has no useful attributes for {0}")]
    NotUseful(String),
}

/// Result type alias for wealthgraph operations.
pub type Result<T> = std::result::Result<T, WealthGraphError>;
