//! Context assembly and analysis collaborators.

mod assembler;
mod collaborators;

pub use assembler::{ContextAssembler, EnrichmentOutcome, NO_DATA_SENTINEL};
pub use collaborators::{
    GapPolicyRecommender, PolicyRecommendation, PolicyRecommender, QuarterlyTrendAnalyzer,
    RegionMetrics, TrendAnalyzer, TrendDirection, TrendSummary,
};
