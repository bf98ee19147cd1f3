//! # Surveyor Core
//!
//! Comparison core for research-survey documents.
//! Provides hybrid similarity scoring, content-based item matching,
//! corpus-wide reference matching, and structured version diffs.

pub mod compare;
pub mod config;
pub mod diff;
pub mod document;
pub mod engine;
pub mod error;
pub mod lexical;
pub mod matching;
pub mod render;

// Re-export commonly used types at the crate root.
pub use compare::{SimilarityComponents, SimilarityResult};
pub use config::{CompareConfig, SimilarityWeights, load_config};
pub use diff::{
    ComparisonType, DiffResult, DiffStatus, DiffSummary, ItemDiff, ItemField, Lineage,
    SectionDiff, StatusCounts,
};
pub use document::{Item, Layout, Section, SurveyDocument, SurveyMetadata};
pub use engine::{
    RankedReference, SurveyComparator, diff, match_across_references, match_items,
    rank_references, similarity, similarity_detailed,
};
pub use error::{ConfigError, Result, SurveyorError};
pub use lexical::{LexicalBackend, LexicalScorer, TextCapabilities};
pub use matching::{
    CorpusMatchResult, ItemMatcher, MatchResult, MatchedPair, ReferenceSource, ReferenceUsage,
};
pub use render::{RenderCache, render};
